//! Чтение сессионных файлов: заголовок + последовательный поток записей.
//!
//! Для версии 1 записью считается одна ECG выборка; для версии 2 —
//! чередующаяся пара ECG + IMU (одна пара на тик захвата).

use std::io::{ErrorKind, Read};

use holter_types::{
    EcgSample, FileHeader, FormatError, FormatResult, ImuSample, ECG_SAMPLE_SIZE,
    HOLTER_HEADER_SIZE, IMU_SAMPLE_SIZE,
};

/// Одна логическая запись сессионного файла.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRecord {
    /// Версия 1: одиночная ECG выборка
    Ecg(EcgSample),
    /// Версия 2: пара выборок одного тика
    Interleaved { ecg: EcgSample, imu: ImuSample },
}

/// Счётчики чтения.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadStats {
    pub ecg_read: u64,
    pub imu_read: u64,
    pub bytes_processed: u64,
}

/// Последовательный читатель сессионного файла.
pub struct SessionReader<R: Read> {
    inner: R,
    header: FileHeader,
    stats: ReadStats,
}

impl<R: Read> SessionReader<R> {
    /// Читает и валидирует заголовок, оставляя поток на первой записи.
    pub fn new(mut inner: R) -> FormatResult<Self> {
        let mut buf = [0u8; HOLTER_HEADER_SIZE];

        if let Err(e) = inner.read_exact(&mut buf) {
            if e.kind() == ErrorKind::UnexpectedEof {
                return Err(FormatError::TruncatedHeader {
                    len: 0,
                    need: HOLTER_HEADER_SIZE,
                });
            }
            return Err(e.into());
        }

        let header = FileHeader::deserialize(&buf)?;

        Ok(Self {
            inner,
            header,
            stats: ReadStats {
                bytes_processed: HOLTER_HEADER_SIZE as u64,
                ..ReadStats::default()
            },
        })
    }

    /// Заголовок файла.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Счётчики чтения.
    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Следующая запись; `None` при чистом конце файла. Обрыв посреди
    /// записи — ошибка формата, а не конец потока.
    pub fn next_record(&mut self) -> Option<FormatResult<SessionRecord>> {
        let ecg = match self.read_ecg() {
            Ok(Some(s)) => s,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };

        if !self.header.has_imu() {
            return Some(Ok(SessionRecord::Ecg(ecg)));
        }

        // Версия 2: за каждой ECG выборкой обязана следовать IMU
        let imu = match self.read_imu() {
            Ok(s) => s,
            Err(e) => return Some(Err(e)),
        };

        Some(Ok(SessionRecord::Interleaved { ecg, imu }))
    }

    /// Сверяет фактически прочитанные записи со счётчиками заголовка.
    pub fn validate_totals(&self) -> FormatResult<()> {
        if self.stats.ecg_read != self.header.num_ecg_samples as u64 {
            return Err(FormatError::FormatViolation(format!(
                "ECG count mismatch: header {} vs read {}",
                self.header.num_ecg_samples, self.stats.ecg_read
            )));
        }
        if self.stats.imu_read != self.header.num_imu_samples as u64 {
            return Err(FormatError::FormatViolation(format!(
                "IMU count mismatch: header {} vs read {}",
                self.header.num_imu_samples, self.stats.imu_read
            )));
        }
        Ok(())
    }

    fn read_ecg(&mut self) -> FormatResult<Option<EcgSample>> {
        let mut buf = [0u8; ECG_SAMPLE_SIZE];
        let mut filled = 0;

        // Чистый EOF допустим только на границе записи
        while filled < ECG_SAMPLE_SIZE {
            let n = self.inner.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(FormatError::FormatViolation(format!(
                    "truncated ECG record: {filled}/{ECG_SAMPLE_SIZE} bytes"
                )));
            }
            filled += n;
        }

        self.stats.ecg_read += 1;
        self.stats.bytes_processed += ECG_SAMPLE_SIZE as u64;
        Ok(Some(EcgSample::from_bytes(&buf)))
    }

    fn read_imu(&mut self) -> FormatResult<ImuSample> {
        let mut buf = [0u8; IMU_SAMPLE_SIZE];

        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                FormatError::FormatViolation("truncated IMU record after ECG sample".into())
            } else {
                FormatError::Io(e)
            }
        })?;

        self.stats.imu_read += 1;
        self.stats.bytes_processed += IMU_SAMPLE_SIZE as u64;
        Ok(ImuSample::from_bytes(&buf))
    }
}

impl<R: Read> Iterator for SessionReader<R> {
    type Item = FormatResult<SessionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

//! Запись сессионного файла: предварительный заголовок, буферизированные
//! выборки, финализация счётчиков.
//!
//! Жизненный цикл файла трёхфазный: при создании пишется заголовок с нулевыми
//! счётчиками, затем выборки идут через буфер, и только `finish()` вписывает
//! итоговые счётчики поверх заголовка. Файл без финализации распознаётся по
//! нулям в счётчиках и считается обрывком сессии.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, info};

use holter_types::{
    EcgSample, FileHeader, FormatError, FormatResult, ImuSample, OFFSET_NUM_ECG, OFFSET_NUM_IMU,
};

use crate::buffer::{BufferedWriter, FlushStatus, WriteStats};

/// Писатель одной сессии поверх произвольного `Write + Seek` хранилища.
pub struct SessionWriter<W: Write + Seek> {
    buffer: BufferedWriter<W>,
    header: FileHeader,
    ecg_count: u32,
    imu_count: u32,
}

impl<W: Write + Seek> SessionWriter<W> {
    /// Открывает новую сессию: пишет предварительный заголовок (счётчики в
    /// нуле) напрямую в хранилище и оборачивает его в буфер ёмкостью
    /// `buffer_capacity` байт.
    pub fn new(
        mut inner: W,
        header: FileHeader,
        buffer_capacity: usize,
    ) -> FormatResult<Self> {
        debug_assert_eq!(header.num_ecg_samples, 0, "provisional header");
        debug_assert_eq!(header.num_imu_samples, 0, "provisional header");

        // Заголовок минует буфер: он должен лечь на диск до первой выборки,
        // чтобы обрыв питания оставил распознаваемый файл
        inner.write_all(&header.serialize())?;
        inner.flush()?;

        debug!(
            "Session {} opened: v{}, ECG {} Hz, IMU {} Hz",
            header.session_id, header.version, header.ecg_sample_rate, header.imu_sample_rate
        );

        Ok(Self {
            buffer: BufferedWriter::new(inner, buffer_capacity),
            header,
            ecg_count: 0,
            imu_count: 0,
        })
    }

    /// Добавляет одну ECG запись.
    pub fn write_ecg(
        &mut self,
        sample: &EcgSample,
    ) -> FormatResult<()> {
        self.buffer.append(&sample.to_bytes());
        self.ecg_count = self
            .ecg_count
            .checked_add(1)
            .ok_or_else(|| FormatError::FormatViolation("ECG sample count overflow".into()))?;
        Ok(())
    }

    /// Добавляет одну IMU запись (только для версии 2).
    pub fn write_imu(
        &mut self,
        sample: &ImuSample,
    ) -> FormatResult<()> {
        if !self.header.has_imu() {
            return Err(FormatError::FormatViolation(
                "IMU samples are not allowed in an ECG-only file".into(),
            ));
        }

        self.buffer.append(&sample.to_bytes());
        self.imu_count = self
            .imu_count
            .checked_add(1)
            .ok_or_else(|| FormatError::FormatViolation("IMU sample count overflow".into()))?;
        Ok(())
    }

    /// Принудительный сброс буфера (периодический flush из цикла захвата).
    pub fn flush(&mut self) -> FlushStatus {
        self.buffer.flush()
    }

    /// Количество записанных ECG выборок.
    pub fn ecg_count(&self) -> u32 {
        self.ecg_count
    }

    /// Количество записанных IMU выборок.
    pub fn imu_count(&self) -> u32 {
        self.imu_count
    }

    /// Счётчики буферизированной записи.
    pub fn write_stats(&self) -> WriteStats {
        self.buffer.stats()
    }

    /// Финализация: сброс остатка буфера, точечная перезапись счётчиков по
    /// фиксированным смещениям и возврат итогового заголовка вместе с
    /// хранилищем.
    ///
    /// После успешного `finish()` счётчики заголовка авторитетны; файл с
    /// нулями в счётчиках и ненулевым телом — обрыв сессии.
    pub fn finish(self) -> FormatResult<(FileHeader, W)> {
        let ecg_count = self.ecg_count;
        let imu_count = self.imu_count;
        let mut header = self.header;

        let (mut inner, stats) = self.buffer.into_inner();

        inner.seek(SeekFrom::Start(OFFSET_NUM_ECG))?;
        inner.write_u32::<LittleEndian>(ecg_count)?;
        inner.seek(SeekFrom::Start(OFFSET_NUM_IMU))?;
        inner.write_u32::<LittleEndian>(imu_count)?;
        inner.flush()?;

        header.num_ecg_samples = ecg_count;
        header.num_imu_samples = imu_count;

        info!(
            "Session {} finalized: {} ECG, {} IMU, {} bytes, {} flushes ({} short, {} failed)",
            header.session_id,
            ecg_count,
            imu_count,
            header.expected_file_size(),
            stats.flushes,
            stats.short_writes,
            stats.failed_writes,
        );

        Ok((header, inner))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use holter_types::{ECG_SAMPLE_SIZE, HOLTER_HEADER_SIZE};

    use super::*;

    fn ecg(n: i16) -> EcgSample {
        EcgSample {
            lead_i: n,
            lead_ii: n * 2,
            lead_iii: n,
        }
    }

    #[test]
    fn test_empty_session_is_header_only() {
        let header = FileHeader::new(1, 100, 100, 250, 0);
        let writer = SessionWriter::new(Cursor::new(Vec::new()), header, 8192).unwrap();

        let (final_header, cursor) = writer.finish().unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(bytes.len(), HOLTER_HEADER_SIZE);
        assert_eq!(final_header.num_ecg_samples, 0);
        assert_eq!(&bytes[0..4], &[0x44, 0x47, 0x43, 0x45], "magic on disk");
    }

    #[test]
    fn test_counts_patched_on_finish() {
        let header = FileHeader::new(1, 42, 42, 250, 0);
        let mut writer = SessionWriter::new(Cursor::new(Vec::new()), header, 8192).unwrap();

        for i in 0..5 {
            writer.write_ecg(&ecg(i)).unwrap();
        }

        let (final_header, cursor) = writer.finish().unwrap();
        assert_eq!(final_header.num_ecg_samples, 5);
        assert_eq!(final_header.num_imu_samples, 0);

        let bytes = cursor.into_inner();
        assert_eq!(
            bytes.len(),
            HOLTER_HEADER_SIZE + 5 * ECG_SAMPLE_SIZE,
            "размер = 32 + 5·6"
        );

        // Счётчики на диске совпадают с возвращённым заголовком
        let patched = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!(patched, 5);

        let on_disk =
            FileHeader::deserialize(bytes[..HOLTER_HEADER_SIZE].try_into().unwrap()).unwrap();
        assert_eq!(on_disk, final_header);
    }

    #[test]
    fn test_header_on_disk_is_provisional_before_finish() {
        let mut storage = Vec::new();

        {
            let header = FileHeader::new(1, 7, 7, 250, 0);
            let mut writer =
                SessionWriter::new(Cursor::new(&mut storage), header, 16).unwrap();

            for i in 0..10 {
                writer.write_ecg(&ecg(i)).unwrap();
            }
            writer.flush();
            // Сессия обрывается без finish()
        }

        // Тело есть, но счётчики на диске остаются нулевыми — признак обрывка
        assert!(storage.len() > HOLTER_HEADER_SIZE);
        assert_eq!(&storage[20..24], &[0, 0, 0, 0]);
        assert_eq!(&storage[24..28], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_imu_rejected_in_ecg_only_file() {
        let header = FileHeader::new(1, 1, 1, 250, 0);
        let mut writer = SessionWriter::new(Cursor::new(Vec::new()), header, 64).unwrap();

        let result = writer.write_imu(&ImuSample::default());
        assert!(matches!(result, Err(FormatError::FormatViolation(_))));
    }

    #[test]
    fn test_interleaved_session() {
        let header = FileHeader::new(3, 9, 9, 100, 100);
        let mut writer = SessionWriter::new(Cursor::new(Vec::new()), header, 8192).unwrap();

        for i in 0..10 {
            writer.write_ecg(&ecg(i)).unwrap();
            writer.write_imu(&ImuSample::default()).unwrap();
        }

        let (final_header, cursor) = writer.finish().unwrap();
        assert_eq!(final_header.num_ecg_samples, 10);
        assert_eq!(final_header.num_imu_samples, 10);
        assert_eq!(
            cursor.into_inner().len() as u64,
            final_header.expected_file_size()
        );
    }

    #[test]
    fn test_body_follows_header_after_buffering() {
        let header = FileHeader::new(1, 5, 5, 250, 0);
        // Крошечный буфер: каждая выборка вызывает авто-flush
        let mut writer = SessionWriter::new(Cursor::new(Vec::new()), header, 6).unwrap();

        let s = ecg(0x0102);
        writer.write_ecg(&s).unwrap();

        let (_, cursor) = writer.finish().unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&bytes[HOLTER_HEADER_SIZE..], &s.to_bytes());
    }
}

//! Спецификация формата сессионных файлов Holter, версия 1/2
//!
//! Бинарное представление `.bin` файлов, создаваемых устройством на SD-карте.
//! Все многобайтовые числа хранятся в порядке little-endian (так их читает
//! облачный обработчик).

use crate::error::{FormatError, FormatResult};
use crate::sample::{ECG_SAMPLE_SIZE, IMU_SAMPLE_SIZE};

/// Магическое число для идентификации файлов: b"ECGD" как u32 LE
pub const HOLTER_MAGIC: u32 = 0x4543_4744;

/// Версия формата: только ECG-записи по 6 байт
pub const VERSION_ECG_ONLY: u16 = 1;

/// Версия формата: чередующиеся пары ECG (6 байт) + IMU (12 байт)
pub const VERSION_INTERLEAVED: u16 = 2;

/// Размер фиксированного заголовка (32 байта)
pub const HOLTER_HEADER_SIZE: usize = 32;

/// Смещение поля `num_ecg_samples` в заголовке
pub const OFFSET_NUM_ECG: u64 = 20;

/// Смещение поля `num_imu_samples` в заголовке
pub const OFFSET_NUM_IMU: u64 = 24;

/// Заголовок сессионного файла (фиксированный размер 32 байта).
///
/// Счётчики `num_ecg_samples`/`num_imu_samples` авторитетны только после
/// финализации: при создании файл получает заголовок с нулями, и финальные
/// значения вписываются поверх по смещениям [`OFFSET_NUM_ECG`] и
/// [`OFFSET_NUM_IMU`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Версия формата записей
    pub version: u16,
    /// Идентификатор устройства
    pub device_id: u16,
    /// Идентификатор сессии (unix-секунды старта)
    pub session_id: u32,
    /// Время начала записи (unix timestamp, секунды)
    pub timestamp_start: u32,
    /// Настроенная частота ECG (Гц)
    pub ecg_sample_rate: u16,
    /// Настроенная частота IMU (Гц, 0 = отключено)
    pub imu_sample_rate: u16,
    /// Итоговое количество ECG записей
    pub num_ecg_samples: u32,
    /// Итоговое количество IMU записей
    pub num_imu_samples: u32,
}

impl FileHeader {
    /// Создаёт заголовок новой сессии со счётчиками в нуле.
    ///
    /// Версия выбирается по `imu_sample_rate`: 0 Гц — ECG-only (версия 1),
    /// иначе чередующиеся пары (версия 2).
    pub fn new(
        device_id: u16,
        session_id: u32,
        timestamp_start: u32,
        ecg_sample_rate: u16,
        imu_sample_rate: u16,
    ) -> Self {
        let version = if imu_sample_rate == 0 {
            VERSION_ECG_ONLY
        } else {
            VERSION_INTERLEAVED
        };

        FileHeader {
            version,
            device_id,
            session_id,
            timestamp_start,
            ecg_sample_rate,
            imu_sample_rate,
            num_ecg_samples: 0,
            num_imu_samples: 0,
        }
    }

    /// Сериализация заголовка в 32 байта (little-endian).
    pub fn serialize(&self) -> [u8; HOLTER_HEADER_SIZE] {
        let mut buf = [0u8; HOLTER_HEADER_SIZE];
        let mut off = 0;

        write_u32(&mut buf, &mut off, HOLTER_MAGIC);
        write_u16(&mut buf, &mut off, self.version);
        write_u16(&mut buf, &mut off, self.device_id);
        write_u32(&mut buf, &mut off, self.session_id);
        write_u32(&mut buf, &mut off, self.timestamp_start);
        write_u16(&mut buf, &mut off, self.ecg_sample_rate);
        write_u16(&mut buf, &mut off, self.imu_sample_rate);
        write_u32(&mut buf, &mut off, self.num_ecg_samples);
        write_u32(&mut buf, &mut off, self.num_imu_samples);

        // [28..32) — reserved, уже нули
        buf
    }

    /// Десериализация заголовка из 32 байт с валидацией magic/version.
    pub fn deserialize(buf: &[u8; HOLTER_HEADER_SIZE]) -> FormatResult<Self> {
        let mut off = 0;

        let magic = read_u32(buf, &mut off);
        if magic != HOLTER_MAGIC {
            return Err(FormatError::InvalidMagic {
                found: magic,
                expected: HOLTER_MAGIC,
            });
        }

        let version = read_u16(buf, &mut off);
        if version != VERSION_ECG_ONLY && version != VERSION_INTERLEAVED {
            return Err(FormatError::UnsupportedVersion { found: version });
        }

        let device_id = read_u16(buf, &mut off);
        let session_id = read_u32(buf, &mut off);
        let timestamp_start = read_u32(buf, &mut off);
        let ecg_sample_rate = read_u16(buf, &mut off);
        let imu_sample_rate = read_u16(buf, &mut off);
        let num_ecg_samples = read_u32(buf, &mut off);
        let num_imu_samples = read_u32(buf, &mut off);

        Ok(FileHeader {
            version,
            device_id,
            session_id,
            timestamp_start,
            ecg_sample_rate,
            imu_sample_rate,
            num_ecg_samples,
            num_imu_samples,
        })
    }

    /// Ожидаемый размер файла по счётчикам заголовка:
    /// `32 + num_ecg·6 + num_imu·12`.
    pub fn expected_file_size(&self) -> u64 {
        HOLTER_HEADER_SIZE as u64
            + self.num_ecg_samples as u64 * ECG_SAMPLE_SIZE as u64
            + self.num_imu_samples as u64 * IMU_SAMPLE_SIZE as u64
    }

    /// IMU-записи присутствуют в файле (версия 2)?
    pub fn has_imu(&self) -> bool {
        self.version == VERSION_INTERLEAVED
    }
}

fn write_u16(
    buf: &mut [u8; HOLTER_HEADER_SIZE],
    off: &mut usize,
    val: u16,
) {
    buf[*off..*off + 2].copy_from_slice(&val.to_le_bytes());
    *off += 2;
}

fn write_u32(
    buf: &mut [u8; HOLTER_HEADER_SIZE],
    off: &mut usize,
    val: u32,
) {
    buf[*off..*off + 4].copy_from_slice(&val.to_le_bytes());
    *off += 4;
}

fn read_u16(
    buf: &[u8; HOLTER_HEADER_SIZE],
    off: &mut usize,
) -> u16 {
    let b = [buf[*off], buf[*off + 1]];
    *off += 2;
    u16::from_le_bytes(b)
}

fn read_u32(
    buf: &[u8; HOLTER_HEADER_SIZE],
    off: &mut usize,
) -> u32 {
    let b = [buf[*off], buf[*off + 1], buf[*off + 2], buf[*off + 3]];
    *off += 4;
    u32::from_le_bytes(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut header = FileHeader::new(1, 1_704_067_200, 1_704_067_200, 250, 0);

        header.num_ecg_samples = 3_750;

        let bytes = header.serialize();
        let parsed = FileHeader::deserialize(&bytes).unwrap();

        assert_eq!(parsed, header);
        assert_eq!(parsed.version, VERSION_ECG_ONLY);
        assert_eq!(parsed.num_ecg_samples, 3_750);
        assert_eq!(parsed.num_imu_samples, 0);
    }

    #[test]
    fn test_header_byte_layout() {
        let mut header = FileHeader::new(7, 0x1122_3344, 0x5566_7788, 250, 50);
        header.num_ecg_samples = 0x0000_0100;
        header.num_imu_samples = 0x0000_0020;

        let bytes = header.serialize();

        // magic "ECGD" = 0x45434744 LE
        assert_eq!(&bytes[0..4], &[0x44, 0x47, 0x43, 0x45], "magic LE");
        assert_eq!(&bytes[4..6], &[0x02, 0x00], "version = interleaved");
        assert_eq!(&bytes[6..8], &[0x07, 0x00], "device_id");
        assert_eq!(&bytes[8..12], &[0x44, 0x33, 0x22, 0x11], "session_id LE");
        assert_eq!(&bytes[12..16], &[0x88, 0x77, 0x66, 0x55], "timestamp LE");
        assert_eq!(&bytes[16..18], &[0xFA, 0x00], "ecg_rate = 250");
        assert_eq!(&bytes[18..20], &[0x32, 0x00], "imu_rate = 50");
        assert_eq!(&bytes[20..24], &[0x00, 0x01, 0x00, 0x00], "num_ecg");
        assert_eq!(&bytes[24..28], &[0x20, 0x00, 0x00, 0x00], "num_imu");
        assert_eq!(&bytes[28..32], &[0, 0, 0, 0], "reserved");
    }

    #[test]
    fn test_header_invalid_magic() {
        let header = FileHeader::new(1, 1, 1, 250, 0);
        let mut bytes = header.serialize();
        bytes[0] ^= 0xFF;

        let result = FileHeader::deserialize(&bytes);
        assert!(matches!(result, Err(FormatError::InvalidMagic { .. })));
    }

    #[test]
    fn test_header_unsupported_version() {
        let header = FileHeader::new(1, 1, 1, 250, 0);
        let mut bytes = header.serialize();
        bytes[4] = 9;

        let result = FileHeader::deserialize(&bytes);
        assert!(matches!(
            result,
            Err(FormatError::UnsupportedVersion { found: 9 })
        ));
    }

    #[test]
    fn test_version_selected_by_imu_rate() {
        assert_eq!(FileHeader::new(1, 0, 0, 250, 0).version, VERSION_ECG_ONLY);
        assert_eq!(
            FileHeader::new(1, 0, 0, 250, 50).version,
            VERSION_INTERLEAVED
        );
    }

    #[test]
    fn test_expected_file_size() {
        let mut header = FileHeader::new(1, 0, 0, 100, 0);
        header.num_ecg_samples = 100;
        // Инвариант размера: 32 + 100·6 = 632
        assert_eq!(header.expected_file_size(), 632);

        let mut header = FileHeader::new(1, 0, 0, 100, 100);
        header.num_ecg_samples = 10;
        header.num_imu_samples = 10;
        assert_eq!(header.expected_file_size(), 32 + 60 + 120);
    }

    #[test]
    fn test_count_field_offsets() {
        // Смещения используются при финализации для точечной перезаписи
        let mut header = FileHeader::new(1, 0, 0, 250, 0);
        header.num_ecg_samples = 0xAABB_CCDD;
        header.num_imu_samples = 0x1122_3344;

        let bytes = header.serialize();
        let ecg_off = OFFSET_NUM_ECG as usize;
        let imu_off = OFFSET_NUM_IMU as usize;

        assert_eq!(
            u32::from_le_bytes(bytes[ecg_off..ecg_off + 4].try_into().unwrap()),
            0xAABB_CCDD
        );
        assert_eq!(
            u32::from_le_bytes(bytes[imu_off..imu_off + 4].try_into().unwrap()),
            0x1122_3344
        );
    }
}

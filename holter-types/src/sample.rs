//! Записи выборок: ECG (3 отведения) и IMU (акселерометр + резерв гироскопа).

/// Размер одной ECG записи: 3 × i16
pub const ECG_SAMPLE_SIZE: usize = 6;

/// Размер одной IMU записи: 6 × i16 (3 оси акселерометра + 3 резервных)
pub const IMU_SAMPLE_SIZE: usize = 12;

/// Коэффициент квантования ECG: 32768 единиц на 5 мВ полной шкалы
pub const ECG_SCALE: f32 = 6553.6;

/// Коэффициент квантования акселерометра: 2048 единиц на 1 g (±16 g шкала)
pub const ACCEL_SCALE: f32 = 2048.0;

/// Одна ECG запись: три отведения, квантованные в i16.
///
/// Отведение III всегда производное (II − I до квантования) и никогда не
/// измеряется напрямую.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EcgSample {
    pub lead_i: i16,
    pub lead_ii: i16,
    pub lead_iii: i16,
}

/// Одна IMU запись: три оси ускорения плюс три резервных поля гироскопа.
///
/// Гироскоп на текущей ревизии платы отсутствует — поля пишутся нулями.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImuSample {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,
}

impl EcgSample {
    /// Сериализация в 6 байт (little-endian).
    pub fn to_bytes(&self) -> [u8; ECG_SAMPLE_SIZE] {
        let mut buf = [0u8; ECG_SAMPLE_SIZE];
        buf[0..2].copy_from_slice(&self.lead_i.to_le_bytes());
        buf[2..4].copy_from_slice(&self.lead_ii.to_le_bytes());
        buf[4..6].copy_from_slice(&self.lead_iii.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; ECG_SAMPLE_SIZE]) -> Self {
        EcgSample {
            lead_i: i16::from_le_bytes([buf[0], buf[1]]),
            lead_ii: i16::from_le_bytes([buf[2], buf[3]]),
            lead_iii: i16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

impl ImuSample {
    /// Сериализация в 12 байт (little-endian).
    pub fn to_bytes(&self) -> [u8; IMU_SAMPLE_SIZE] {
        let mut buf = [0u8; IMU_SAMPLE_SIZE];
        buf[0..2].copy_from_slice(&self.accel_x.to_le_bytes());
        buf[2..4].copy_from_slice(&self.accel_y.to_le_bytes());
        buf[4..6].copy_from_slice(&self.accel_z.to_le_bytes());
        buf[6..8].copy_from_slice(&self.gyro_x.to_le_bytes());
        buf[8..10].copy_from_slice(&self.gyro_y.to_le_bytes());
        buf[10..12].copy_from_slice(&self.gyro_z.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; IMU_SAMPLE_SIZE]) -> Self {
        ImuSample {
            accel_x: i16::from_le_bytes([buf[0], buf[1]]),
            accel_y: i16::from_le_bytes([buf[2], buf[3]]),
            accel_z: i16::from_le_bytes([buf[4], buf[5]]),
            gyro_x: i16::from_le_bytes([buf[6], buf[7]]),
            gyro_y: i16::from_le_bytes([buf[8], buf[9]]),
            gyro_z: i16::from_le_bytes([buf[10], buf[11]]),
        }
    }
}

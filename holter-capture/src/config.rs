use std::path::PathBuf;

use crate::sensor::SensorKind;

/// Полная конфигурация сессии захвата.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Тип сенсорного фронтенда
    pub sensor: SensorKind,
    /// Идентификатор устройства (попадает в заголовок файла)
    pub device_id: u16,
    /// Частота дискретизации ECG (Гц)
    pub ecg_rate_hz: u16,
    /// Частота дискретизации IMU (Гц, 0 = отключено)
    pub imu_rate_hz: u16,
    /// Длительность окна захвата (секунды)
    pub capture_window_secs: u64,
    /// Каталог для сессионных файлов
    pub output_dir: PathBuf,
    /// Ёмкость буфера записи (байты)
    pub buffer_capacity: usize,
    /// Интервал принудительного flush (секунды)
    pub flush_interval_secs: u64,
    /// Максимум тиков наверстывания за один опрос планировщика
    pub max_catchup_ticks: u32,
    /// Интервал вывода прогресса (секунды)
    pub progress_interval_secs: u64,
}

impl CaptureConfig {
    /// Проверяет согласованность параметров до старта сессии.
    pub fn validate(&self) -> Result<(), String> {
        if self.ecg_rate_hz == 0 {
            return Err("ECG sample rate must be non-zero".to_string());
        }
        if 1_000_000 % self.ecg_rate_hz as u64 != 0 {
            return Err(format!(
                "ECG rate {} Hz does not divide 1 MHz evenly",
                self.ecg_rate_hz
            ));
        }
        if self.imu_rate_hz != 0 && self.imu_rate_hz != self.ecg_rate_hz {
            // Чередующийся формат пишет пару выборок на тик
            return Err(format!(
                "IMU rate must be 0 or equal to ECG rate, got {} vs {}",
                self.imu_rate_hz, self.ecg_rate_hz
            ));
        }
        if self.capture_window_secs == 0 {
            return Err("Capture window must be non-zero".to_string());
        }
        if self.buffer_capacity == 0 {
            return Err("Write buffer capacity must be non-zero".to_string());
        }
        if self.max_catchup_ticks == 0 {
            return Err("Catch-up bound must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sensor: SensorKind::Simulated,
            device_id: 1,
            ecg_rate_hz: 250,
            imu_rate_hz: 0,
            capture_window_secs: 15,
            output_dir: PathBuf::from("."),
            buffer_capacity: 8_192,
            flush_interval_secs: 2,
            max_catchup_ticks: 32,
            progress_interval_secs: 5,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

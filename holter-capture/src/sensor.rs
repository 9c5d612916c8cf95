// Симулятор выдаёт синтетический кардиосигнал с шумом, так что конвейер
// калибровки и квантования видит данные почти как с настоящего фронтенда.
// Реальное железо (AD8232) подключается через тот же трейт.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{CaptureConfig, CaptureError, CaptureResult};

/// Отведение, измеряемое напрямую (III всегда производное).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    I,
    II,
}

/// Информация о фронтенде (для логирования).
#[derive(Debug, Clone)]
pub struct SensorInfo {
    pub name: String,
    pub serial: Option<String>,
    pub has_imu: bool,
}

/// Абстракция сенсорного фронтенда.
// Реализации: [`SimulatedSensor`], и в будущем интерфейс аналоговой платы
// `Ad8232Sensor`.
pub trait SensorPort: Send {
    /// Информация о фронтенде
    fn info(&self) -> SensorInfo;

    /// Напряжение на выходе усилителя отведения (вольты).
    /// `None` — канал недоступен; вызывающая сторона подставляет ноль.
    fn read_lead(
        &mut self,
        lead: Lead,
    ) -> Option<f32>;

    /// Ускорение по осям (в единицах g). `None` — IMU отсутствует.
    fn read_accel(&mut self) -> Option<(f32, f32, f32)>;
}

/// Тип сенсорного фронтенда (выбор при старте).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorKind {
    /// Встроенный симулятор (не требует железа).
    Simulated,
    /// Аналоговый фронтенд AD8232 (future).
    Ad8232,
}

impl std::fmt::Display for SensorKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SensorKind::Simulated => write!(f, "sim"),
            SensorKind::Ad8232 => write!(f, "ad8232"),
        }
    }
}

impl std::str::FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" | "simulated" => Ok(SensorKind::Simulated),
            "ad8232" => Ok(SensorKind::Ad8232),
            _ => Err(format!("Unknown sensor type: '{s}'. Use: sim, ad8232")),
        }
    }
}

/// Генерация синтетического кардиосигнала (QRS-пички + шум) для тестов.
pub struct SimulatedSensor {
    pub rate_hz: u16,
    pub heart_rate_bpm: f32,
    pub noise_mv: f32,
    tick: u64,
    rng: StdRng,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SimulatedSensor {
    pub fn new(rate_hz: u16) -> Self {
        Self {
            rate_hz,
            heart_rate_bpm: 72.0,
            noise_mv: 0.02,
            tick: 0,
            rng: StdRng::seed_from_u64(0x4543_4744),
        }
    }

    /// Фаза сердечного цикла [0, 1) для текущего тика.
    fn beat_phase(&self) -> f32 {
        let t = self.tick as f32 / self.rate_hz as f32;
        let period = 60.0 / self.heart_rate_bpm;
        (t / period).fract()
    }

    /// Упрощённый шаблон одного цикла в милливольтах: P-волна, QRS-комплекс,
    /// T-волна на изолинии.
    fn template_mv(phase: f32) -> f32 {
        if (0.10..0.16).contains(&phase) {
            // P
            0.15 * hump((phase - 0.10) / 0.06)
        } else if (0.20..0.23).contains(&phase) {
            // Q
            -0.2 * hump((phase - 0.20) / 0.03)
        } else if (0.23..0.27).contains(&phase) {
            // R
            1.2 * hump((phase - 0.23) / 0.04)
        } else if (0.27..0.30).contains(&phase) {
            // S
            -0.3 * hump((phase - 0.27) / 0.03)
        } else if (0.40..0.52).contains(&phase) {
            // T
            0.3 * hump((phase - 0.40) / 0.12)
        } else {
            0.0
        }
    }
}

/// Полуволна sin на [0, 1] — гладкий «горб» амплитудой 1.
fn hump(x: f32) -> f32 {
    (x * std::f32::consts::PI).sin()
}

impl SensorPort for SimulatedSensor {
    fn info(&self) -> SensorInfo {
        SensorInfo {
            name: "Simulated ECG front-end".to_string(),
            serial: Some("SIM-0001".to_string()),
            has_imu: true,
        }
    }

    fn read_lead(
        &mut self,
        lead: Lead,
    ) -> Option<f32> {
        // Тик продвигается по отведению II — оно читается последним
        let phase = self.beat_phase();
        let base_mv = Self::template_mv(phase);

        let noise = if self.noise_mv > 0.0 {
            self.rng.gen_range(-self.noise_mv..self.noise_mv)
        } else {
            0.0
        };

        let mv = match lead {
            Lead::I => base_mv * 0.6,
            Lead::II => {
                self.tick += 1;
                base_mv
            }
        } + noise;

        // Обратное преобразование в вольты на выходе усилителя
        Some(crate::acquisition::DC_OFFSET_V + mv / 1_000.0 * crate::acquisition::FRONTEND_GAIN)
    }

    fn read_accel(&mut self) -> Option<(f32, f32, f32)> {
        let jitter = self.rng.gen_range(-0.01..0.01f32);
        // Покой: гравитация по оси Z
        Some((jitter, -jitter, 1.0 + jitter))
    }
}

/// Создаёт нужный фронтенд по конфигурации.
pub fn create_sensor(config: &CaptureConfig) -> CaptureResult<Box<dyn SensorPort>> {
    match config.sensor {
        SensorKind::Simulated => Ok(Box::new(SimulatedSensor::new(config.ecg_rate_hz))),
        SensorKind::Ad8232 => Err(CaptureError::SensorNotFound(
            "AD8232 front-end support not yet implemented".to_string(),
        )),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

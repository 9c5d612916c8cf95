//! Конвейер калибровки и квантования.
//!
//! Сырое напряжение с выхода усилителя приводится к милливольтам на входе
//! (вычесть DC-смещение, разделить на аналоговое усиление), третье отведение
//! вычисляется как II − I до квантования, затем каждое значение квантуется в
//! i16 с насыщением на краях шкалы. Физиологический выброс за пределами
//! ±5 мВ прижимается к краю, а не заворачивается.

use holter_types::{EcgSample, ImuSample, ACCEL_SCALE, ECG_SCALE};

use crate::sensor::{Lead, SensorPort};

/// DC-смещение на выходе фронтенда (вольты, половина питания 3.3 В)
pub const DC_OFFSET_V: f32 = 1.65;

/// Аналоговое усиление инструментального усилителя AD8232
pub const FRONTEND_GAIN: f32 = 1_100.0;

/// Преобразует сырые чтения фронтенда в квантованные записи.
pub struct AcquisitionPipeline {
    sensor: Box<dyn SensorPort>,
}

impl AcquisitionPipeline {
    pub fn new(sensor: Box<dyn SensorPort>) -> Self {
        Self { sensor }
    }

    /// Доступ к фронтенду (для логирования информации об устройстве).
    pub fn sensor(&self) -> &dyn SensorPort {
        self.sensor.as_ref()
    }

    /// Одна ECG запись: чтение отведений I и II, производное III,
    /// квантование. Недоступный канал читается как ноль милливольт.
    pub fn sample_ecg(&mut self) -> EcgSample {
        let mv_i = self
            .sensor
            .read_lead(Lead::I)
            .map(calibrate_mv)
            .unwrap_or(0.0);
        let mv_ii = self
            .sensor
            .read_lead(Lead::II)
            .map(calibrate_mv)
            .unwrap_or(0.0);

        // III производится до квантования, чтобы не накапливать ошибку
        // округления двух независимых квантований
        let mv_iii = mv_ii - mv_i;

        EcgSample {
            lead_i: quantize_mv(mv_i),
            lead_ii: quantize_mv(mv_ii),
            lead_iii: quantize_mv(mv_iii),
        }
    }

    /// Одна IMU запись: масштабирование осей ускорения, нули в полях
    /// гироскопа. Отсутствующий IMU читается как нулевое ускорение.
    pub fn sample_imu(&mut self) -> ImuSample {
        let (x, y, z) = self.sensor.read_accel().unwrap_or((0.0, 0.0, 0.0));

        ImuSample {
            accel_x: quantize_g(x),
            accel_y: quantize_g(y),
            accel_z: quantize_g(z),
            ..ImuSample::default()
        }
    }
}

/// Калибровка: вольты на выходе усилителя → милливольты на входе.
pub fn calibrate_mv(raw_v: f32) -> f32 {
    (raw_v - DC_OFFSET_V) / FRONTEND_GAIN * 1_000.0
}

/// Квантование милливольт в i16 с насыщением (`as` насыщает на краях).
pub fn quantize_mv(mv: f32) -> i16 {
    (mv * ECG_SCALE) as i16
}

/// Квантование ускорения (g) в i16 с насыщением.
pub fn quantize_g(g: f32) -> i16 {
    (g * ACCEL_SCALE) as i16
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::sensor::SensorInfo;

    use super::*;

    /// Фронтенд с константными калиброванными значениями отведений (мВ).
    struct ConstSensor {
        mv_i: f32,
        mv_ii: f32,
        imu: Option<(f32, f32, f32)>,
    }

    impl SensorPort for ConstSensor {
        fn info(&self) -> SensorInfo {
            SensorInfo {
                name: "const".to_string(),
                serial: None,
                has_imu: self.imu.is_some(),
            }
        }

        fn read_lead(
            &mut self,
            lead: Lead,
        ) -> Option<f32> {
            let mv = match lead {
                Lead::I => self.mv_i,
                Lead::II => self.mv_ii,
            };
            Some(DC_OFFSET_V + mv / 1_000.0 * FRONTEND_GAIN)
        }

        fn read_accel(&mut self) -> Option<(f32, f32, f32)> {
            self.imu
        }
    }

    struct DeadSensor;

    impl SensorPort for DeadSensor {
        fn info(&self) -> SensorInfo {
            SensorInfo {
                name: "dead".to_string(),
                serial: None,
                has_imu: false,
            }
        }

        fn read_lead(
            &mut self,
            _lead: Lead,
        ) -> Option<f32> {
            None
        }

        fn read_accel(&mut self) -> Option<(f32, f32, f32)> {
            None
        }
    }

    #[test]
    fn test_calibration_round_trip() {
        // 1 мВ на входе → 1.65 + 1.1 В на выходе → обратно 1 мВ
        let raw = DC_OFFSET_V + 1.0 / 1_000.0 * FRONTEND_GAIN;
        assert!((calibrate_mv(raw) - 1.0).abs() < 1e-4);
        assert_eq!(calibrate_mv(DC_OFFSET_V), 0.0);
    }

    #[test]
    fn test_quantization_at_full_scale() {
        // Ровно +5.000 мВ: 5.0 × 6553.6 = 32768.0 — насыщение до i16::MAX
        assert_eq!(quantize_mv(5.0), i16::MAX);
        // За пределами шкалы значение прижимается, не заворачивается
        assert_eq!(quantize_mv(7.5), i16::MAX);
        assert_eq!(quantize_mv(-7.5), i16::MIN);
        // Внутри шкалы — усечение к нулю
        assert_eq!(quantize_mv(1.0), 6_553);
        assert_eq!(quantize_mv(-1.0), -6_553);
        assert_eq!(quantize_mv(0.0), 0);
    }

    #[test]
    fn test_derived_third_lead() {
        let sensor = ConstSensor {
            mv_i: 1.0,
            mv_ii: 2.0,
            imu: None,
        };
        let mut pipeline = AcquisitionPipeline::new(Box::new(sensor));

        let s = pipeline.sample_ecg();
        // III = II − I = 1.0 мВ, вычислено до квантования
        assert_eq!(s.lead_iii, quantize_mv(1.0));
        assert!((s.lead_i - 6_553).abs() <= 1, "lead I ≈ 6553, got {}", s.lead_i);
        assert!((s.lead_ii - 13_107).abs() <= 1, "lead II ≈ 13107");
    }

    #[test]
    fn test_unavailable_sensor_reads_zero() {
        let mut pipeline = AcquisitionPipeline::new(Box::new(DeadSensor));

        assert_eq!(pipeline.sample_ecg(), EcgSample::default());
        assert_eq!(pipeline.sample_imu(), ImuSample::default());
    }

    #[test]
    fn test_imu_gyro_fields_zero() {
        let sensor = ConstSensor {
            mv_i: 0.0,
            mv_ii: 0.0,
            imu: Some((0.0, 0.0, 1.0)),
        };
        let mut pipeline = AcquisitionPipeline::new(Box::new(sensor));

        let s = pipeline.sample_imu();
        assert_eq!(s.accel_z, 2_048, "1 g × 2048");
        assert_eq!((s.gyro_x, s.gyro_y, s.gyro_z), (0, 0, 0));
    }
}

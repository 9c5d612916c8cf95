use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Метрики захвата, обновляемые lock-free.
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    pub ticks_processed: AtomicU64,
    pub ecg_samples: AtomicU64,
    pub imu_samples: AtomicU64,
    pub catchup_bursts: AtomicU64,
    pub storage_flushes: AtomicU64,
    pub storage_errors: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub duration_secs: f64,
    pub ticks_processed: u64,
    pub ecg_samples: u64,
    pub imu_samples: u64,
    pub catchup_bursts: u64,
    pub storage_flushes: u64,
    pub storage_errors: u64,
    pub effective_rate_hz: f64,
}

impl CaptureMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Фактическая частота дискретизации за прошедшее время.
    pub fn effective_rate_hz(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.ecg_samples.load(Ordering::Relaxed) as f64 / secs
    }

    /// Итоговая сводка для вывода в конце сессии.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> CaptureSummary {
        CaptureSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            ecg_samples: self.ecg_samples.load(Ordering::Relaxed),
            imu_samples: self.imu_samples.load(Ordering::Relaxed),
            catchup_bursts: self.catchup_bursts.load(Ordering::Relaxed),
            storage_flushes: self.storage_flushes.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
            effective_rate_hz: self.effective_rate_hz(elapsed),
        }
    }
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration       : {:.1}s", self.duration_secs)?;
        writeln!(f, "  ECG samples    : {}", self.ecg_samples)?;
        writeln!(f, "  IMU samples    : {}", self.imu_samples)?;
        writeln!(f, "  Catch-up bursts: {}", self.catchup_bursts)?;
        writeln!(f, "  Flushes        : {}", self.storage_flushes)?;
        writeln!(f, "  Storage errors : {}", self.storage_errors)?;
        write!(f, "  Effective rate : {:.1} Hz", self.effective_rate_hz)?;
        writeln!(f)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_initial_metrics_zero() {
        let metrics = CaptureMetrics::new();
        let start = Instant::now();
        let summary = metrics.summary(&start);

        assert_eq!(summary.ecg_samples, 0);
        assert_eq!(summary.imu_samples, 0);
        assert_eq!(summary.catchup_bursts, 0);
        assert_eq!(summary.storage_errors, 0);
        assert_eq!(summary.effective_rate_hz, 0.0);
    }

    #[test]
    fn test_effective_rate() {
        let metrics = CaptureMetrics::new();
        metrics.ecg_samples.store(500, Ordering::Relaxed);

        let start = Instant::now() - Duration::from_secs(2);
        let summary = metrics.summary(&start);

        // 500 выборок / 2 с ≈ 250 Гц
        assert!((summary.effective_rate_hz - 250.0).abs() < 5.0);
    }

    #[test]
    fn test_summary_snapshot_consistency() {
        let metrics = CaptureMetrics::new();
        metrics.ticks_processed.store(100, Ordering::Relaxed);
        metrics.ecg_samples.store(100, Ordering::Relaxed);
        metrics.imu_samples.store(100, Ordering::Relaxed);
        metrics.catchup_bursts.store(2, Ordering::Relaxed);
        metrics.storage_flushes.store(7, Ordering::Relaxed);
        metrics.storage_errors.store(1, Ordering::Relaxed);

        let start = Instant::now() - Duration::from_secs(1);
        let summary = metrics.summary(&start);

        assert_eq!(summary.ticks_processed, 100);
        assert_eq!(summary.ecg_samples, 100);
        assert_eq!(summary.imu_samples, 100);
        assert_eq!(summary.catchup_bursts, 2);
        assert_eq!(summary.storage_flushes, 7);
        assert_eq!(summary.storage_errors, 1);
    }
}

//! Жизненный цикл сессии захвата.
//!
//! Один владелец всего изменяемого состояния (счётчики, писатель, файл):
//! рекордер живёт в единственном кооперативном потоке, блокировки не нужны.
//! Недоступность носителя при старте не фатальна — сессия продолжается в
//! деградированном симулированном режиме с детерминированными счётчиками,
//! чтобы цепочка выгрузки оставалась проверяемой без железа.

use std::{
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::{info, warn};

use holter_core::{verify_file, FlushStatus, SessionWriter};
use holter_types::FileHeader;

use crate::{
    AcquisitionPipeline, CaptureConfig, CaptureError, CaptureMetrics, CaptureResult, SampleClock,
};

/// Фиксированный счётчик деградированного (симулированного) захвата.
pub const DEGRADED_SAMPLE_COUNT: u32 = 100;

/// Состояние рекордера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Initializing,
    Recording,
    Finalizing,
    Closed,
    Failed,
}

impl RecorderState {
    pub fn name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Initializing => "initializing",
            RecorderState::Recording => "recording",
            RecorderState::Finalizing => "finalizing",
            RecorderState::Closed => "closed",
            RecorderState::Failed => "failed",
        }
    }
}

/// Итог завершённой сессии — вход для координатора выгрузки.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: u32,
    /// Путь к файлу; `None` — деградированный режим без носителя
    pub path: Option<PathBuf>,
    pub ecg_count: u32,
    pub imu_count: u32,
    pub file_size: u64,
    pub degraded: bool,
    /// Верификация переоткрытием прошла без расхождений
    pub integrity_clean: bool,
}

struct ActiveSession {
    writer: SessionWriter<File>,
    path: PathBuf,
}

/// Рекордер одной сессии захвата.
pub struct SessionRecorder {
    config: CaptureConfig,
    pipeline: AcquisitionPipeline,
    metrics: Arc<CaptureMetrics>,
    stop_flag: Arc<AtomicBool>,
    state: RecorderState,
    active: Option<ActiveSession>,
    session_id: u32,
    degraded: bool,
}

impl SessionRecorder {
    /// Создаёт рекордер. Возвращает также shared-ссылку на метрики.
    pub fn new(
        config: CaptureConfig,
        pipeline: AcquisitionPipeline,
    ) -> CaptureResult<(Self, Arc<CaptureMetrics>)> {
        config.validate().map_err(CaptureError::Config)?;

        let metrics = CaptureMetrics::new();
        let recorder = Self {
            config,
            pipeline,
            metrics: metrics.clone(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            state: RecorderState::Idle,
            active: None,
            session_id: 0,
            degraded: false,
        };

        Ok((recorder, metrics))
    }

    /// Текущее состояние.
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Флаг остановки. Устанавливается в `true` для graceful shutdown.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Подменяет флаг остановки на внешний (общий для всего устройства).
    pub fn set_stop_flag(
        &mut self,
        flag: Arc<AtomicBool>,
    ) {
        self.stop_flag = flag;
    }

    /// Открывает новую сессию: id из wall-clock секунд, файл с
    /// предварительным заголовком. Недоступный носитель переводит сессию в
    /// деградированный режим вместо отказа.
    pub fn start(
        &mut self,
        now_unix_secs: u32,
    ) -> CaptureResult<()> {
        if !matches!(self.state, RecorderState::Idle | RecorderState::Closed) {
            return Err(CaptureError::InvalidState {
                op: "start",
                state: self.state.name(),
            });
        }

        self.state = RecorderState::Initializing;
        self.session_id = now_unix_secs;
        self.degraded = false;
        self.active = None;

        let path = self
            .config
            .output_dir
            .join(format!("session_{}.bin", self.session_id));

        let header = FileHeader::new(
            self.config.device_id,
            self.session_id,
            now_unix_secs,
            self.config.ecg_rate_hz,
            self.config.imu_rate_hz,
        );

        match self.open_writer(&path, header) {
            Ok(writer) => {
                info!(
                    "Session {} started: {} @ {} Hz{}",
                    self.session_id,
                    path.display(),
                    self.config.ecg_rate_hz,
                    if self.config.imu_rate_hz > 0 {
                        " + IMU"
                    } else {
                        ""
                    },
                );
                self.active = Some(ActiveSession { writer, path });
            }
            Err(e) => {
                warn!(
                    "Storage unavailable ({e}). Session {} continues in simulated mode",
                    self.session_id
                );
                self.degraded = true;
            }
        }

        self.state = RecorderState::Recording;
        Ok(())
    }

    fn open_writer(
        &self,
        path: &PathBuf,
        header: FileHeader,
    ) -> CaptureResult<SessionWriter<File>> {
        let file = File::create(path)?;
        Ok(SessionWriter::new(
            file,
            header,
            self.config.buffer_capacity,
        )?)
    }

    /// Один тик захвата: чтение, калибровка, запись, счётчики.
    pub fn capture_tick(&mut self) -> CaptureResult<()> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState {
                op: "capture_tick",
                state: self.state.name(),
            });
        }

        self.metrics.ticks_processed.fetch_add(1, Ordering::Relaxed);

        let ecg = self.pipeline.sample_ecg();
        let imu = (self.config.imu_rate_hz > 0).then(|| self.pipeline.sample_imu());

        if let Some(active) = self.active.as_mut() {
            if let Err(e) = active.writer.write_ecg(&ecg) {
                self.state = RecorderState::Failed;
                return Err(e.into());
            }
            self.metrics.ecg_samples.fetch_add(1, Ordering::Relaxed);

            if let Some(imu) = imu {
                if let Err(e) = active.writer.write_imu(&imu) {
                    self.state = RecorderState::Failed;
                    return Err(e.into());
                }
                self.metrics.imu_samples.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    /// Принудительный сброс буфера (периодическая политика по времени).
    pub fn flush(&mut self) {
        if let Some(active) = self.active.as_mut() {
            match active.writer.flush() {
                FlushStatus::Clean | FlushStatus::Empty => {}
                FlushStatus::Short { .. } | FlushStatus::Failed => {
                    self.metrics.storage_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
            self.metrics.storage_flushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Финализация: сброс буфера, патч счётчиков заголовка, верификация
    /// переоткрытием. Расхождения верификации — предупреждения, файл всё
    /// равно передаётся на выгрузку.
    pub fn finalize(&mut self) -> CaptureResult<SessionOutcome> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState {
                op: "finalize",
                state: self.state.name(),
            });
        }

        self.state = RecorderState::Finalizing;

        let Some(active) = self.active.take() else {
            // Деградированный режим: файла нет, счётчики детерминированы
            let imu_count = if self.config.imu_rate_hz > 0 {
                DEGRADED_SAMPLE_COUNT
            } else {
                0
            };
            let outcome = SessionOutcome {
                session_id: self.session_id,
                path: None,
                ecg_count: DEGRADED_SAMPLE_COUNT,
                imu_count,
                file_size: 32 + DEGRADED_SAMPLE_COUNT as u64 * 6 + imu_count as u64 * 12,
                degraded: true,
                integrity_clean: false,
            };

            info!(
                "Session {} finalized in simulated mode: {} samples reported",
                self.session_id, DEGRADED_SAMPLE_COUNT
            );
            self.state = RecorderState::Closed;
            return Ok(outcome);
        };

        let path = active.path;
        let (header, file) = match active.writer.finish() {
            Ok(done) => done,
            Err(e) => {
                self.state = RecorderState::Failed;
                return Err(e.into());
            }
        };
        drop(file);

        // Верификация переоткрытием: любые расхождения — только warn
        let integrity_clean = match verify_file(&path, header.num_ecg_samples, header.num_imu_samples)
        {
            Ok(report) => report.is_clean(),
            Err(e) => {
                warn!("Post-finalize verification failed to reopen file: {e}");
                false
            }
        };

        let outcome = SessionOutcome {
            session_id: self.session_id,
            path: Some(path),
            ecg_count: header.num_ecg_samples,
            imu_count: header.num_imu_samples,
            file_size: header.expected_file_size(),
            degraded: false,
            integrity_clean,
        };

        self.state = RecorderState::Closed;
        Ok(outcome)
    }

    /// Захват полного окна по wall-clock: дрейф-свободные тики, периодический
    /// flush, прогресс в лог. Блокируется до истечения окна или stop_flag.
    pub fn run_window(
        &mut self,
        start_unix_secs: u32,
    ) -> CaptureResult<SessionOutcome> {
        self.start(start_unix_secs)?;

        let t0 = Instant::now();
        let mut clock = SampleClock::new(self.config.ecg_rate_hz, 0);
        let window_us = self.config.capture_window_secs * 1_000_000;
        let flush_interval = Duration::from_secs(self.config.flush_interval_secs);
        let progress_interval = Duration::from_secs(self.config.progress_interval_secs);

        let mut last_flush = Instant::now();
        let mut last_progress = Instant::now();

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                info!("Stop signal received. Finalizing...");
                break;
            }

            let now_us = t0.elapsed().as_micros() as u64;
            if now_us >= window_us {
                info!(
                    "Capture window elapsed ({}s). Finalizing...",
                    self.config.capture_window_secs
                );
                break;
            }

            let due = clock.ticks_due(now_us, self.config.max_catchup_ticks);
            if due.capped {
                self.metrics.catchup_bursts.fetch_add(1, Ordering::Relaxed);
            }

            for _ in 0..due.ticks {
                self.capture_tick()?;
            }

            if last_flush.elapsed() >= flush_interval {
                self.flush();
                last_flush = Instant::now();
            }

            if last_progress.elapsed() >= progress_interval {
                self.log_progress(&t0);
                last_progress = Instant::now();
            }

            // pacing — сон до ближайшего дедлайна
            let now_us = t0.elapsed().as_micros() as u64;
            let next = clock.next_deadline_us();
            if next > now_us {
                thread::sleep(Duration::from_micros(next - now_us));
            }
        }

        self.finalize()
    }

    fn log_progress(
        &self,
        start: &Instant,
    ) {
        let m = &self.metrics;

        info!(
            "[ {:.0}s ] samples={} rate={:.1}Hz bursts={} flushes={} errors={}",
            start.elapsed().as_secs_f64(),
            m.ecg_samples.load(Ordering::Relaxed),
            m.effective_rate_hz(start),
            m.catchup_bursts.load(Ordering::Relaxed),
            m.storage_flushes.load(Ordering::Relaxed),
            m.storage_errors.load(Ordering::Relaxed),
        );
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use log::{error, info, warn};

use holter_capture::{
    create_sensor, AcquisitionPipeline, CaptureConfig, SensorKind, SessionRecorder,
};
use holter_uplink::{
    FinishedSession, HttpTransfer, MqttChannel, UplinkConfig, UploadCoordinator,
};

#[derive(Parser, Debug)]
#[command(
    name = "holter-device",
    version = env!("CARGO_PKG_VERSION"),
    about = "Capture ECG sessions and upload them to remote storage",
    long_about = None,
)]
struct Cli {
    /// Сенсорный фронтенд: sim, ad8232
    #[arg(short, long, default_value = "sim")]
    sensor: String,
    /// Идентификатор устройства
    #[arg(short, long, default_value = "1")]
    device_id: u16,
    /// Частота дискретизации ECG, Гц
    #[arg(short = 'r', long, default_value = "250")]
    rate: u16,
    /// Частота IMU, Гц (0 = отключено)
    #[arg(long, default_value = "0")]
    imu_rate: u16,
    /// Окно захвата, секунды
    #[arg(short, long, default_value = "15")]
    window: u64,
    /// Каталог для сессионных файлов
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Хост брокера сообщений
    #[arg(long, default_value = "localhost")]
    broker: String,
    /// Порт брокера
    #[arg(long, default_value = "1883")]
    broker_port: u16,
    /// Таймаут ожидания URL, секунды
    #[arg(long, default_value = "60")]
    request_timeout: u64,
    /// Таймаут bulk-передачи, секунды
    #[arg(long, default_value = "30")]
    transfer_timeout: u64,
    /// Cool-down после успешного цикла, секунды
    #[arg(long, default_value = "5")]
    cooldown: u64,
    /// Cool-down после сбоя (перед полным сбросом), секунды
    #[arg(long, default_value = "30")]
    error_cooldown: u64,
    /// Ограничение числа циклов. По умолчанию: до Ctrl+C
    #[arg(short, long)]
    cycles: Option<u64>,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn now_unix_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Прерываемый cool-down: спит короткими шагами, проверяя stop_flag.
fn cooldown_sleep(
    secs: u64,
    stop: &AtomicBool,
) {
    let deadline = Instant::now() + Duration::from_secs(secs);
    while Instant::now() < deadline && !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap())
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let sensor_kind: SensorKind = match cli.sensor.parse() {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let capture_config = CaptureConfig {
        sensor: sensor_kind,
        device_id: cli.device_id,
        ecg_rate_hz: cli.rate,
        imu_rate_hz: cli.imu_rate,
        capture_window_secs: cli.window,
        output_dir: cli.output_dir.clone(),
        ..CaptureConfig::default()
    };

    if let Err(e) = capture_config.validate() {
        error!("Invalid capture config: {e}");
        std::process::exit(1);
    }

    let uplink_config = UplinkConfig {
        device_id: cli.device_id,
        broker_host: cli.broker.clone(),
        broker_port: cli.broker_port,
        request_timeout_secs: cli.request_timeout,
        transfer_timeout_secs: cli.transfer_timeout,
        ..UplinkConfig::default()
    };

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Второй Ctrl+C — принудительный выход
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received — finalizing current session...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Sensor        : {}", cli.sensor);
    info!("  Device id     : {}", cli.device_id);
    info!(
        "  ECG rate      : {} Hz{}",
        cli.rate,
        if cli.imu_rate > 0 { " + IMU" } else { "" }
    );
    info!("  Window        : {} s", cli.window);
    info!("  Output dir    : {:?}", cli.output_dir);
    info!("  Broker        : {}:{}", cli.broker, cli.broker_port);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut cycles_done = 0u64;

    // Внешний цикл — эквивалент рестарта процесса: каждый вход заново
    // собирает рекордер и координатор с чистым состоянием
    'reset: loop {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }

        let sensor = match create_sensor(&capture_config) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to open sensor: {e}");
                std::process::exit(1);
            }
        };

        let pipeline = AcquisitionPipeline::new(sensor);
        let (mut recorder, metrics) =
            match SessionRecorder::new(capture_config.clone(), pipeline) {
                Ok(r) => r,
                Err(e) => {
                    error!("Failed to create recorder: {e}");
                    std::process::exit(1);
                }
            };
        recorder.set_stop_flag(stop_flag.clone());

        let channel = MqttChannel::new(uplink_config.clone());
        let mut coordinator = UploadCoordinator::new(
            uplink_config.clone(),
            Box::new(channel),
            Box::new(HttpTransfer),
        );

        // Внутренний цикл: успешные сессии идут подряд без сброса
        loop {
            if stop_flag.load(Ordering::Relaxed) {
                break 'reset;
            }

            coordinator.capture_started();

            let session_start = Instant::now();
            let outcome = match recorder.run_window(now_unix_secs()) {
                Ok(o) => o,
                Err(e) => {
                    error!("Capture failed: {e}");
                    cooldown_sleep(cli.error_cooldown, &stop_flag);
                    continue 'reset;
                }
            };

            info!("\n{}", metrics.summary(&session_start));
            if outcome.degraded {
                warn!("Session captured in simulated mode (no storage)");
            }
            if !outcome.degraded && !outcome.integrity_clean {
                warn!("Integrity warnings on session {}", outcome.session_id);
            }

            let session = FinishedSession {
                session_id: outcome.session_id,
                timestamp: now_unix_secs(),
                file_size: outcome.file_size,
                path: outcome.path.clone(),
            };

            let upload_result = coordinator.run(&session);
            cycles_done += 1;

            if let Some(limit) = cli.cycles {
                if cycles_done >= limit {
                    info!("Cycle limit reached ({limit})");
                    break 'reset;
                }
            }

            match upload_result {
                Ok(()) => {
                    info!(
                        "✓ Cycle {} complete. Cool-down {} s",
                        cycles_done, cli.cooldown
                    );
                    cooldown_sleep(cli.cooldown, &stop_flag);
                    coordinator.cooldown_elapsed();
                }
                Err(_) => {
                    // Ошибка уже в логе; длинный cool-down и полный сброс
                    warn!(
                        "Cycle {} failed. Cool-down {} s, then full reset",
                        cycles_done, cli.error_cooldown
                    );
                    cooldown_sleep(cli.error_cooldown, &stop_flag);
                    continue 'reset;
                }
            }
        }
    }

    info!("✓ Done: {cycles_done} cycle(s)");
}

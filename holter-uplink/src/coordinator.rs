//! Машина состояний цикла выгрузки.
//!
//! Переходы описаны чистой функцией [`transition`] и потому тестируются без
//! сети; координатор лишь применяет события по мере выполнения шагов
//! протокола. Любой сбой любого шага ведёт в Error, откуда выход только
//! через полный сброс цикла после длинного cool-down, без частичных ретраев.

use std::{
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};

use log::{info, warn};

use crate::{
    BulkTransfer, MessageChannel, ResponseVerdict, UplinkConfig, UplinkError, UplinkResult,
    UploadRequest, UploadResponse,
};

/// Фаза цикла устройства.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkPhase {
    Init,
    Capturing,
    RequestingUpload,
    Uploading,
    Complete,
    Error,
}

/// Событие, продвигающее цикл.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkEvent {
    Started,
    CaptureFinished,
    UrlReceived,
    RequestFailed,
    TransferSucceeded,
    TransferFailed,
    CooldownElapsed,
}

impl std::fmt::Display for UplinkPhase {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            UplinkPhase::Init => "init",
            UplinkPhase::Capturing => "capturing",
            UplinkPhase::RequestingUpload => "requesting-upload",
            UplinkPhase::Uploading => "uploading",
            UplinkPhase::Complete => "complete",
            UplinkPhase::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Чистая функция переходов `(фаза, событие) -> фаза`.
///
/// Недопустимая пара оставляет фазу без изменения: пропуск фазы
/// (например Capturing сразу в Uploading) невозможен по построению.
pub fn transition(
    phase: UplinkPhase,
    event: UplinkEvent,
) -> UplinkPhase {
    use UplinkEvent::*;
    use UplinkPhase::*;

    match (phase, event) {
        (Init, Started) => Capturing,
        (Capturing, CaptureFinished) => RequestingUpload,
        (RequestingUpload, UrlReceived) => Uploading,
        (RequestingUpload, RequestFailed) => Error,
        (Uploading, TransferSucceeded) => Complete,
        (Uploading, TransferFailed) => Error,
        (Complete, CooldownElapsed) => Capturing,
        // Из Error только полный сброс цикла
        (Error, CooldownElapsed) => Init,
        (unchanged, _) => unchanged,
    }
}

/// Вход координатора: итог завершённой сессии захвата.
#[derive(Debug, Clone)]
pub struct FinishedSession {
    pub session_id: u32,
    pub timestamp: u32,
    pub file_size: u64,
    /// `None` — деградированный захват без файла
    pub path: Option<PathBuf>,
}

/// Координатор выгрузки одной сессии за цикл.
pub struct UploadCoordinator {
    config: UplinkConfig,
    channel: Box<dyn MessageChannel>,
    transfer: Box<dyn BulkTransfer>,
    phase: UplinkPhase,
}

impl UploadCoordinator {
    pub fn new(
        config: UplinkConfig,
        channel: Box<dyn MessageChannel>,
        transfer: Box<dyn BulkTransfer>,
    ) -> Self {
        Self {
            config,
            channel,
            transfer,
            phase: UplinkPhase::Init,
        }
    }

    /// Текущая фаза цикла.
    pub fn phase(&self) -> UplinkPhase {
        self.phase
    }

    /// Старт цикла: Init → Capturing.
    pub fn capture_started(&mut self) {
        self.apply(UplinkEvent::Started);
    }

    /// Cool-down истёк: Complete → Capturing или Error → Init.
    pub fn cooldown_elapsed(&mut self) {
        self.apply(UplinkEvent::CooldownElapsed);
    }

    fn apply(
        &mut self,
        event: UplinkEvent,
    ) {
        let next = transition(self.phase, event);
        if next != self.phase {
            info!("Uplink: {} -> {next}", self.phase);
            self.phase = next;
        }
    }

    /// Прогоняет сессию через RequestingUpload → Uploading до Complete или
    /// Error. Блокируется на таймаутах протокола; связь разрывается в любом
    /// исходе.
    pub fn run(
        &mut self,
        session: &FinishedSession,
    ) -> UplinkResult<()> {
        self.apply(UplinkEvent::CaptureFinished);

        let result = self.run_steps(session);
        self.channel.disconnect();

        if let Err(ref e) = result {
            warn!("Upload cycle failed for session {}: {e}", session.session_id);
        }
        result
    }

    fn run_steps(
        &mut self,
        session: &FinishedSession,
    ) -> UplinkResult<()> {
        let url = match self.request_url(session) {
            Ok(url) => {
                self.apply(UplinkEvent::UrlReceived);
                url
            }
            Err(e) => {
                self.apply(UplinkEvent::RequestFailed);
                return Err(e);
            }
        };

        match self.transfer_file(session, &url) {
            Ok(()) => {
                self.apply(UplinkEvent::TransferSucceeded);
                Ok(())
            }
            Err(e) => {
                self.apply(UplinkEvent::TransferFailed);
                Err(e)
            }
        }
    }

    /// Фаза RequestingUpload: публикация запроса и ожидание URL на
    /// per-device топике не дольше настроенного таймаута.
    fn request_url(
        &mut self,
        session: &FinishedSession,
    ) -> UplinkResult<String> {
        self.channel.connect()?;

        let response_topic = self.config.response_topic();
        self.channel.subscribe(&response_topic)?;

        let request = UploadRequest::new(
            self.config.device_id,
            session.session_id,
            session.timestamp,
            session.file_size,
        );
        let payload = serde_json::to_vec(&request)?;
        self.channel.publish(&self.config.request_topic, &payload)?;

        info!(
            "Upload requested: session {}, {} bytes",
            session.session_id, session.file_size
        );

        let timeout_secs = self.config.request_timeout_secs;
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(UplinkError::ResponseTimeout { timeout_secs });
            }

            let Some(message) = self
                .channel
                .poll(remaining.min(Duration::from_millis(500)))?
            else {
                continue;
            };

            if message.topic != response_topic {
                continue;
            }

            let response: UploadResponse = match serde_json::from_slice(&message.payload) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Malformed upload response: {e}");
                    continue;
                }
            };

            match response.evaluate(session.session_id) {
                ResponseVerdict::Accepted(url) => {
                    info!("Upload URL received for session {}", session.session_id);
                    return Ok(url.to_string());
                }
                ResponseVerdict::Stale { got } => {
                    warn!("Ignoring stale upload URL for session {got}");
                }
                ResponseVerdict::Rejected(status) => {
                    return Err(UplinkError::Rejected(status.to_string()));
                }
            }
        }
    }

    /// Фаза Uploading: чтение всего файла, один PUT, удаление файла после
    /// подтверждённого приёма.
    fn transfer_file(
        &mut self,
        session: &FinishedSession,
        url: &str,
    ) -> UplinkResult<()> {
        let path = session.path.as_ref().ok_or_else(|| {
            UplinkError::MissingFile(format!(
                "session {} was captured in simulated mode",
                session.session_id
            ))
        })?;

        // Файл целиком в памяти: размер ограничен известным максимумом сессии
        let body = fs::read(path)?;
        if body.len() as u64 != session.file_size {
            warn!(
                "Session file size changed since finalize: {} vs {}",
                body.len(),
                session.file_size
            );
        }

        let status = self.transfer.put(
            url,
            body,
            Duration::from_secs(self.config.transfer_timeout_secs),
        )?;

        if !(200..300).contains(&status) {
            return Err(UplinkError::TransferStatus { status });
        }

        // Носитель освобождается ровно одним удалением
        fs::remove_file(path)?;
        info!(
            "Session {} uploaded (HTTP {status}), local file removed",
            session.session_id
        );
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

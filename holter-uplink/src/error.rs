use thiserror::Error;

pub type UplinkResult<T> = std::result::Result<T, UplinkError>;

#[derive(Debug, Error)]
pub enum UplinkError {
    /// Не удалось установить связь с брокером
    #[error("Broker connection failed: {0}")]
    Connect(String),

    /// Подписка на канал ответов не подтверждена
    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    /// Публикация запроса не удалась
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Ответ с URL не пришёл за отведённое время
    #[error("No upload URL received within {timeout_secs}s")]
    ResponseTimeout { timeout_secs: u64 },

    /// Сервис отказал в выгрузке (status != success или пустой URL)
    #[error("Upload request rejected: {0}")]
    Rejected(String),

    /// Сессия не оставила файла на носителе (деградированный захват)
    #[error("No session file to upload: {0}")]
    MissingFile(String),

    /// Транспортная ошибка bulk-передачи
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Хранилище ответило не-2xx статусом
    #[error("Transfer rejected with HTTP status {status}")]
    TransferStatus { status: u16 },

    /// Ошибка ввода/вывода (чтение файла, удаление)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Некорректный JSON в протокольном сообщении
    #[error("Protocol JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

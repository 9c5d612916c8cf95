use thiserror::Error;

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Сенсорный фронтенд не найден
    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    /// Недопустимая операция для текущего состояния рекордера
    #[error("Invalid recorder state: cannot {op} while {state}")]
    InvalidState { op: &'static str, state: &'static str },

    /// Некорректная конфигурация захвата
    #[error("Invalid capture config: {0}")]
    Config(String),

    /// Ошибка ввода/вывода носителя
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сессионного формата
    #[error("Format error: {0}")]
    Format(#[from] holter_types::FormatError),
}

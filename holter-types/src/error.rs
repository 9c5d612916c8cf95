use thiserror::Error;

pub type FormatResult<T> = std::result::Result<T, FormatError>;

#[derive(Debug, Error)]
pub enum FormatError {
    /// Неверное магическое число в заголовке
    #[error("invalid magic: 0x{found:08X} (expected 0x{expected:08X})")]
    InvalidMagic { found: u32, expected: u32 },

    /// Неподдерживаемая версия формата
    #[error("unsupported format version: {found} (expected 1 or 2)")]
    UnsupportedVersion { found: u16 },

    /// Файл короче фиксированного заголовка
    #[error("truncated header: {len} bytes, need {need}")]
    TruncatedHeader { len: usize, need: usize },

    /// Нарушение формата (счётчики, размеры записей)
    #[error("format violation: {0}")]
    FormatViolation(String),

    /// Ошибка ввода/вывода
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Координатор выгрузки завершённых сессий.
//!
//! Двухфазный протокол: согласование URL назначения через канал сообщений
//! (запрос на общем топике, ответ на топике устройства), затем один
//! блокирующий bulk PUT всего файла. Любой сбой на любом шаге приводит к
//! единому исходу Error — частичных ретраев отдельных шагов нет.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod transport;

pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use protocol::*;
pub use transport::*;

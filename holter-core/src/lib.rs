//! Библиотека сессионного формата Holter
//!
//! Эталонная реализация дисциплины записи/чтения `.bin` файлов захвата:
//! буферизированная запись с авто-flush, предварительный заголовок с
//! финализацией счётчиков и пост-финализационная верификация целостности.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use holter_types::{EcgSample, FileHeader};
//! use holter_core::SessionWriter;
//! use std::fs::File;
//!
//! let file = File::create("session_1704067200.bin")?;
//! let header = FileHeader::new(1, 1_704_067_200, 1_704_067_200, 250, 0);
//! let mut writer = SessionWriter::new(file, header, 8192)?;
//!
//! writer.write_ecg(&EcgSample { lead_i: 10, lead_ii: 20, lead_iii: 10 })?;
//! let (header, _file) = writer.finish()?;
//! assert_eq!(header.num_ecg_samples, 1);
//! # Ok::<(), holter_types::FormatError>(())
//! ```

pub mod buffer;
pub mod integrity;
pub mod reader;
pub mod writer;

pub use buffer::*;
pub use integrity::*;
pub use reader::*;
pub use writer::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

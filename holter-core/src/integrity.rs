//! Пост-финализационная верификация файла сессии.
//!
//! Проверка открывает только что закрытый файл заново и сверяет заголовок,
//! счётчики и фактический размер. Любое расхождение — предупреждение, а не
//! отказ: файл уже записан, и решение о его судьбе принимает конвейер
//! выгрузки, а не верификатор. Ошибкой считается только невозможность
//! прочитать файл вовсе.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use log::warn;

use holter_types::{FileHeader, FormatResult, HOLTER_HEADER_SIZE};

/// Одно расхождение, найденное при верификации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Заголовок не распознан (magic/version/обрыв)
    HeaderInvalid(String),
    /// Счётчик в заголовке не совпадает с ожиданием записавшей стороны
    CountMismatch {
        field: &'static str,
        header: u32,
        expected: u32,
    },
    /// Фактический размер файла не равен `32 + ecg·6 + imu·12`
    SizeMismatch { expected: u64, actual: u64 },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::HeaderInvalid(reason) => {
                write!(f, "header invalid: {reason}")
            }
            IntegrityIssue::CountMismatch {
                field,
                header,
                expected,
            } => write!(
                f,
                "{field} count mismatch: header says {header}, writer counted {expected}"
            ),
            IntegrityIssue::SizeMismatch { expected, actual } => {
                write!(f, "file size mismatch: expected {expected}, actual {actual}")
            }
        }
    }
}

/// Результат верификации: заголовок (если распознан) и список расхождений.
#[derive(Debug)]
pub struct IntegrityReport {
    pub header: Option<FileHeader>,
    pub issues: Vec<IntegrityIssue>,
    pub file_size: u64,
}

impl IntegrityReport {
    /// Файл прошёл все проверки.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Переоткрывает файл и сверяет его с ожиданиями записавшей стороны.
///
/// `expected_ecg`/`expected_imu` — счётчики, которые вела запись; они
/// сравниваются с тем, что реально легло на диск.
pub fn verify_file(
    path: &Path,
    expected_ecg: u32,
    expected_imu: u32,
) -> FormatResult<IntegrityReport> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();

    let mut issues = Vec::new();
    let mut buf = [0u8; HOLTER_HEADER_SIZE];

    let header = match file.read_exact(&mut buf) {
        Ok(()) => match FileHeader::deserialize(&buf) {
            Ok(h) => Some(h),
            Err(e) => {
                issues.push(IntegrityIssue::HeaderInvalid(e.to_string()));
                None
            }
        },
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            issues.push(IntegrityIssue::HeaderInvalid(format!(
                "file too short for header: {file_size} bytes"
            )));
            None
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(ref header) = header {
        if header.num_ecg_samples != expected_ecg {
            issues.push(IntegrityIssue::CountMismatch {
                field: "ECG",
                header: header.num_ecg_samples,
                expected: expected_ecg,
            });
        }
        if header.num_imu_samples != expected_imu {
            issues.push(IntegrityIssue::CountMismatch {
                field: "IMU",
                header: header.num_imu_samples,
                expected: expected_imu,
            });
        }

        let expected_size = header.expected_file_size();
        if file_size != expected_size {
            issues.push(IntegrityIssue::SizeMismatch {
                expected: expected_size,
                actual: file_size,
            });
        }
    }

    for issue in &issues {
        warn!("Integrity check {}: {issue}", path.display());
    }

    Ok(IntegrityReport {
        header,
        issues,
        file_size,
    })
}

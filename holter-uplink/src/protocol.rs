//! Протокольные сообщения согласования выгрузки (JSON, не персистентные).

use serde::{Deserialize, Serialize};

/// Запрос URL выгрузки, публикуется на общем топике запросов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub device_id: u16,
    pub session_id: u32,
    pub timestamp: u32,
    pub file_size: u64,
    pub ready_for_upload: bool,
}

impl UploadRequest {
    pub fn new(
        device_id: u16,
        session_id: u32,
        timestamp: u32,
        file_size: u64,
    ) -> Self {
        Self {
            device_id,
            session_id,
            timestamp,
            file_size,
            ready_for_upload: true,
        }
    }
}

/// Ответ генератора URL, приходит на per-device топике.
///
/// Доставка at-least-once: возможен запоздалый ответ от предыдущего цикла,
/// поэтому ответ с несовпадающим `session_id` игнорируется. Поле опционально
/// для совместимости с развёрнутым генератором, который его не ставит.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub session_id: Option<u32>,
}

impl UploadResponse {
    /// Итог разбора ответа для сессии `session_id`.
    pub fn evaluate(
        &self,
        session_id: u32,
    ) -> ResponseVerdict<'_> {
        if let Some(id) = self.session_id {
            if id != session_id {
                return ResponseVerdict::Stale { got: id };
            }
        }

        if self.status != "success" {
            return ResponseVerdict::Rejected(&self.status);
        }

        match self.upload_url.as_deref() {
            Some(url) if !url.is_empty() => ResponseVerdict::Accepted(url),
            _ => ResponseVerdict::Rejected("success without upload_url"),
        }
    }
}

/// Вердикт по одному входящему ответу.
#[derive(Debug, PartialEq, Eq)]
pub enum ResponseVerdict<'a> {
    /// URL принят, можно передавать файл
    Accepted(&'a str),
    /// Ответ от другой (предыдущей) сессии — игнорировать и ждать дальше
    Stale { got: u32 },
    /// Сервис отказал — фатально для цикла
    Rejected(&'a str),
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = UploadRequest::new(1, 1_704_067_200, 1_704_067_215, 632);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["device_id"], 1);
        assert_eq!(json["session_id"], 1_704_067_200u32);
        assert_eq!(json["timestamp"], 1_704_067_215u32);
        assert_eq!(json["file_size"], 632);
        assert_eq!(json["ready_for_upload"], true);
    }

    #[test]
    fn test_response_without_session_id_accepted() {
        // Развёрнутый генератор не ставит session_id
        let resp: UploadResponse =
            serde_json::from_str(r#"{"status":"success","upload_url":"https://x"}"#).unwrap();

        assert_eq!(resp.evaluate(7), ResponseVerdict::Accepted("https://x"));
    }

    #[test]
    fn test_stale_response_ignored() {
        let resp: UploadResponse = serde_json::from_str(
            r#"{"status":"success","upload_url":"https://x","session_id":100}"#,
        )
        .unwrap();

        assert_eq!(resp.evaluate(200), ResponseVerdict::Stale { got: 100 });
        assert_eq!(resp.evaluate(100), ResponseVerdict::Accepted("https://x"));
    }

    #[test]
    fn test_error_status_rejected() {
        let resp: UploadResponse =
            serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert_eq!(resp.evaluate(1), ResponseVerdict::Rejected("error"));

        let resp: UploadResponse =
            serde_json::from_str(r#"{"status":"success","upload_url":""}"#).unwrap();
        assert!(matches!(resp.evaluate(1), ResponseVerdict::Rejected(_)));
    }
}

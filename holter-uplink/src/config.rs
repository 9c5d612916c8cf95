/// Конфигурация координатора выгрузки.
#[derive(Debug, Clone)]
pub struct UplinkConfig {
    /// Идентификатор устройства (канал ответов и поле запроса)
    pub device_id: u16,
    /// Хост брокера сообщений
    pub broker_host: String,
    /// Порт брокера
    pub broker_port: u16,
    /// Общий топик запросов выгрузки
    pub request_topic: String,
    /// Префикс per-device топика ответов
    pub response_topic_prefix: String,
    /// Таймаут ожидания URL (секунды)
    pub request_timeout_secs: u64,
    /// Таймаут bulk-передачи (секунды)
    pub transfer_timeout_secs: u64,
    /// Keep-alive клиента сообщений (секунды)
    pub keep_alive_secs: u64,
}

impl UplinkConfig {
    /// Per-device топик, на котором ждём ответ с URL.
    pub fn response_topic(&self) -> String {
        format!("{}/{}", self.response_topic_prefix, self.device_id)
    }

    /// Идентификатор клиента у брокера.
    pub fn client_id(&self) -> String {
        format!("holter-{}", self.device_id)
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            device_id: 1,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            request_topic: "holter/upload-request".to_string(),
            response_topic_prefix: "holter/upload-url".to_string(),
            request_timeout_secs: 60,
            transfer_timeout_secs: 30,
            keep_alive_secs: 5,
        }
    }
}

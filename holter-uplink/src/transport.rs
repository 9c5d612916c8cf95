//! Транспортные швы координатора: канал сообщений и bulk-передача.
//!
//! Координатор зависит только от трейтов — реальные клиенты (MQTT, HTTP)
//! подставляются на устройстве, моки в тестах.

use std::time::{Duration, Instant};

use log::debug;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};

use crate::{UplinkConfig, UplinkError, UplinkResult};

/// Входящее сообщение канала.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Publish/subscribe канал согласования URL.
pub trait MessageChannel: Send {
    /// Устанавливает соединение с брокером. Блокируется до подтверждения.
    fn connect(&mut self) -> UplinkResult<()>;

    /// Подписка на топик ответов.
    fn subscribe(
        &mut self,
        topic: &str,
    ) -> UplinkResult<()>;

    /// Публикация запроса.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> UplinkResult<()>;

    /// Обслуживает keep-alive клиента и возвращает следующее входящее
    /// сообщение, если оно пришло за `timeout`.
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> UplinkResult<Option<InboundMessage>>;

    /// Разрывает соединение. Ошибки разрыва игнорируются.
    fn disconnect(&mut self);
}

/// Блокирующая bulk-передача файла на полученный URL.
pub trait BulkTransfer: Send {
    /// Один PUT всего тела; возвращает HTTP статус.
    fn put(
        &mut self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> UplinkResult<u16>;
}

/// MQTT канал поверх синхронного клиента rumqttc.
pub struct MqttChannel {
    config: UplinkConfig,
    link: Option<(Client, Connection)>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MqttChannel {
    pub fn new(config: UplinkConfig) -> Self {
        Self { config, link: None }
    }
}

impl MessageChannel for MqttChannel {
    fn connect(&mut self) -> UplinkResult<()> {
        let mut options = MqttOptions::new(
            self.config.client_id(),
            &self.config.broker_host,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));

        let (client, mut connection) = Client::new(options, 16);

        // Ждём ConnAck: до него publish/subscribe только встают в очередь
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(UplinkError::Connect("ConnAck timeout".to_string()));
            }

            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => break,
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(UplinkError::Connect(e.to_string())),
                Err(_) => return Err(UplinkError::Connect("ConnAck timeout".to_string())),
            }
        }

        debug!(
            "Connected to broker {}:{}",
            self.config.broker_host, self.config.broker_port
        );
        self.link = Some((client, connection));
        Ok(())
    }

    fn subscribe(
        &mut self,
        topic: &str,
    ) -> UplinkResult<()> {
        let (client, _) = self
            .link
            .as_mut()
            .ok_or_else(|| UplinkError::Subscribe("not connected".to_string()))?;

        client
            .subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| UplinkError::Subscribe(e.to_string()))
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> UplinkResult<()> {
        let (client, _) = self
            .link
            .as_mut()
            .ok_or_else(|| UplinkError::Publish("not connected".to_string()))?;

        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| UplinkError::Publish(e.to_string()))
    }

    fn poll(
        &mut self,
        timeout: Duration,
    ) -> UplinkResult<Option<InboundMessage>> {
        let (_, connection) = self
            .link
            .as_mut()
            .ok_or_else(|| UplinkError::Connect("not connected".to_string()))?;

        match connection.recv_timeout(timeout) {
            Ok(Ok(Event::Incoming(Packet::Publish(p)))) => Ok(Some(InboundMessage {
                topic: p.topic.clone(),
                payload: p.payload.to_vec(),
            })),
            // Keep-alive и подтверждения обслуживаются самим recv
            Ok(Ok(_)) => Ok(None),
            Ok(Err(e)) => Err(UplinkError::Connect(e.to_string())),
            Err(_) => Ok(None),
        }
    }

    fn disconnect(&mut self) {
        if let Some((client, _)) = self.link.take() {
            let _ = client.disconnect();
        }
    }
}

/// Bulk-передача через блокирующий HTTP клиент.
pub struct HttpTransfer;

impl BulkTransfer for HttpTransfer {
    fn put(
        &mut self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> UplinkResult<u16> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UplinkError::Transfer(e.to_string()))?;

        let response = client
            .put(url)
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .map_err(|e| UplinkError::Transfer(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}

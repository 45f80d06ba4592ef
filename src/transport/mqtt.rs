use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet, QoS};

use super::{CloseHandler, CloseReason, Connector, MessageHandler, SharedHandlers, Transport, TransportError};
use crate::codec::{
    application_client_id, application_event_topic, broker_host, device_client_id, device_event_topic,
    DEVICE_TOKEN_USERNAME,
};
use crate::config::MqttConfig;
use crate::types::Credentials;

/// Which side of the platform this client speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttRole {
    /// Publishes its own events.
    Device,
    /// Subscribes to device events.
    Application { app_id: String },
}

pub fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

pub struct MqttConnector {
    settings: MqttConfig,
    role: MqttRole,
}

impl MqttConnector {
    pub fn new(settings: MqttConfig, role: MqttRole) -> Self {
        Self { settings, role }
    }

    fn options(&self, creds: &Credentials) -> Result<MqttOptions, TransportError> {
        let host = self
            .settings
            .broker
            .clone()
            .unwrap_or_else(|| broker_host(&creds.org, &self.settings.domain));

        let (client_id, username, password) = match &self.role {
            MqttRole::Device => (
                device_client_id(creds),
                DEVICE_TOKEN_USERNAME.to_string(),
                Some(creds.auth_token.clone()),
            ),
            MqttRole::Application { app_id } => {
                let api_key = creds.api_key.clone().or_else(|| self.settings.api_key.clone());
                let api_token = creds.api_token.clone().or_else(|| self.settings.api_token.clone());
                (application_client_id(&creds.org, app_id), api_key.unwrap_or_default(), api_token)
            }
        };

        let mut mqtt_options = MqttOptions::new(client_id, host, self.settings.port);

        // quickstart 不支持认证
        if !creds.is_quickstart() {
            let password = match password {
                Some(password) if !username.is_empty() => password,
                _ => {
                    return Err(TransportError::Connect(
                        "application connections need an API key and token".to_string(),
                    ))
                }
            };
            mqtt_options.set_credentials(username, password);
        }

        mqtt_options
            .set_keep_alive(Duration::from_secs(self.settings.keep_alive as u64))
            .set_clean_session(self.settings.clean_session);

        if self.settings.port == 8883 || self.settings.port == 443 {
            mqtt_options.set_transport(rumqttc::Transport::tls_with_default_config());
        }

        Ok(mqtt_options)
    }

    fn topics(&self, creds: &Credentials) -> (String, Vec<String>) {
        let event_id = &self.settings.event_id;
        match &self.role {
            MqttRole::Device => (device_event_topic(event_id), Vec::new()),
            MqttRole::Application { .. } => {
                let topic = application_event_topic(&creds.device_type, &creds.device_id, event_id);
                (topic.clone(), vec![topic])
            }
        }
    }
}

impl Connector for MqttConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Transport>, TransportError> {
        let options = self.options(credentials)?;
        let (publish_topic, subscriptions) = self.topics(credentials);
        let qos = qos_from_level(self.settings.qos);

        let (client, mut connection) = Client::new(options, 10);
        for topic in &subscriptions {
            client
                .subscribe(topic.as_str(), qos)
                .map_err(|e| TransportError::Connect(e.to_string()))?;
        }

        wait_for_connack(&mut connection)?;
        info!("MQTT connected, publishing on {}", publish_topic);

        Ok(Box::new(MqttTransport::start(client, connection, publish_topic, qos)?))
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}

fn wait_for_connack(connection: &mut Connection) -> Result<(), TransportError> {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(TransportError::Connect(e.to_string())),
        }
    }
    Err(TransportError::Connect("event loop ended before CONNACK".to_string()))
}

pub struct MqttTransport {
    client: Client,
    publish_topic: String,
    qos: QoS,
    handlers: SharedHandlers,
    closing: Arc<AtomicBool>,
}

impl MqttTransport {
    fn start(
        client: Client,
        mut connection: Connection,
        publish_topic: String,
        qos: QoS,
    ) -> Result<Self, TransportError> {
        let handlers = SharedHandlers::new();
        let closing = Arc::new(AtomicBool::new(false));

        let reader_handlers = handlers.clone();
        let reader_closing = Arc::clone(&closing);
        thread::Builder::new()
            .name("mqtt-reader".to_string())
            .spawn(move || {
                let reason = read_events(&mut connection, &reader_handlers, &reader_closing);
                reader_handlers.dispatch_close(reason);
            })
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            publish_topic,
            qos,
            handlers,
            closing,
        })
    }
}

fn read_events(connection: &mut Connection, handlers: &SharedHandlers, closing: &AtomicBool) -> CloseReason {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handlers.dispatch_message(&publish.payload);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                return CloseReason::Unexpected("broker sent DISCONNECT".to_string());
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => return CloseReason::Requested,
            Ok(other) => debug!("MQTT event: {:?}", other),
            Err(e) => {
                if closing.load(Ordering::Relaxed) {
                    return CloseReason::Requested;
                }
                error!("MQTT connection error: {}", e);
                return CloseReason::Unexpected(e.to_string());
            }
        }
    }

    if closing.load(Ordering::Relaxed) {
        CloseReason::Requested
    } else {
        CloseReason::Unexpected("event loop ended".to_string())
    }
}

impl Transport for MqttTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.handlers.is_closed() {
            return Err(TransportError::Closed);
        }
        self.client
            .try_publish(self.publish_topic.as_str(), self.qos, false, payload.to_vec())
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn on_message(&mut self, handler: MessageHandler) {
        self.handlers.set_message(handler);
    }

    fn on_close(&mut self, handler: CloseHandler) {
        self.handlers.set_close(handler);
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closing.swap(true, Ordering::Relaxed) || self.handlers.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.client.disconnect() {
            warn!("MQTT disconnect request failed: {}", e);
            // 请求发不出去说明事件循环已经退出
            self.handlers.dispatch_close(CloseReason::Requested);
            return Err(TransportError::Close(e.to_string()));
        }
        Ok(())
    }
}

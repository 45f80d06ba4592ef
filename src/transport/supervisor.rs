//! Connection lifecycle: status, fixed-delay reconnect and the network loop.
//!
//! Reconnect policy: after an unexpected close, a failed send or a failed
//! connect attempt, exactly one reconnect is scheduled after a fixed delay
//! using the credentials of the previous connect. There is no backoff and no
//! retry cap. A close preceded by [`ConnectionSupervisor::expect_disconnect`]
//! never reconnects.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{after, never, select, Receiver, Sender};
use log::{error, info, warn};

use super::{CloseReason, Connector, Transport, TransportError};
use crate::types::Credentials;
use crate::utils::now_millis;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u64 },
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => f.write_str("Disconnected"),
            ConnectionStatus::Connecting => f.write_str("Connecting"),
            ConnectionStatus::Connected => f.write_str("Connected"),
            ConnectionStatus::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {})", attempt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReconnect {
    pub after: Duration,
    pub credentials: Credentials,
    pub attempt: u64,
}

#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    delay: Duration,
    credentials: Option<Credentials>,
    status: ConnectionStatus,
    connected: bool,
    expect_disconnect: bool,
    pending: Option<ScheduledReconnect>,
    attempts: u64,
}

impl ConnectionSupervisor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            credentials: None,
            status: ConnectionStatus::Disconnected,
            connected: false,
            expect_disconnect: false,
            pending: None,
            attempts: 0,
        }
    }

    /// Record the credentials of a connect attempt; consumes any pending reconnect.
    pub fn begin_connect(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
        self.expect_disconnect = false;
        self.pending = None;
        self.status = if self.attempts > 0 {
            ConnectionStatus::Reconnecting { attempt: self.attempts }
        } else {
            ConnectionStatus::Connecting
        };
    }

    pub fn connected(&mut self) {
        self.connected = true;
        self.attempts = 0;
        self.status = ConnectionStatus::Connected;
    }

    /// Must be called immediately before a deliberate close.
    pub fn expect_disconnect(&mut self) {
        self.expect_disconnect = true;
    }

    pub fn handle_close(&mut self, reason: &CloseReason) -> Option<ScheduledReconnect> {
        self.connected = false;

        if self.expect_disconnect || *reason == CloseReason::Requested {
            info!("Disconnected ({})", reason);
            self.pending = None;
            self.attempts = 0;
            self.status = ConnectionStatus::Disconnected;
            return None;
        }

        warn!("Unexpected disconnect: {}", reason);
        self.schedule()
    }

    /// A failed send means the link is gone.
    pub fn handle_send_failure(&mut self, err: &TransportError) -> Option<ScheduledReconnect> {
        self.connected = false;
        warn!("Send failed, treating as disconnect: {}", err);
        if self.expect_disconnect {
            self.status = ConnectionStatus::Disconnected;
            return None;
        }
        self.schedule()
    }

    pub fn handle_connect_failure(&mut self, err: &TransportError) -> Option<ScheduledReconnect> {
        self.connected = false;
        error!("{}", err);
        if self.expect_disconnect {
            self.status = ConnectionStatus::Disconnected;
            return None;
        }
        self.schedule()
    }

    /// Drop a scheduled reconnect (user asked to stay disconnected).
    pub fn cancel_pending(&mut self) {
        self.pending = None;
        self.attempts = 0;
        self.status = ConnectionStatus::Disconnected;
    }

    fn schedule(&mut self) -> Option<ScheduledReconnect> {
        if self.pending.is_some() {
            return None;
        }
        let credentials = self.credentials.clone()?;

        self.attempts += 1;
        let scheduled = ScheduledReconnect {
            after: self.delay,
            credentials,
            attempt: self.attempts,
        };
        info!("Reconnect #{} scheduled in {:?}", scheduled.attempt, scheduled.after);

        self.status = ConnectionStatus::Reconnecting {
            attempt: self.attempts,
        };
        self.pending = Some(scheduled.clone());
        Some(scheduled)
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn pending(&self) -> Option<&ScheduledReconnect> {
        self.pending.as_ref()
    }

    pub fn last_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// Requests from the UI thread to the network thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCommand {
    Connect,
    Disconnect,
    Shutdown,
}

/// Notifications from the network thread to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Status(ConnectionStatus),
    Message { payload: Vec<u8>, received_at: i64 },
}

pub struct ConnectionChannels {
    pub events: Sender<NetworkEvent>,
    pub commands: Receiver<NetworkCommand>,
    /// Payloads to publish; use `crossbeam_channel::never()` for receive-only links.
    pub outbound: Receiver<Vec<u8>>,
}

enum Outcome {
    Shutdown,
    Idle,
    Retry(Option<ScheduledReconnect>),
}

enum RetryWait {
    Elapsed,
    Cancelled,
    Shutdown,
}

/// Drive a connection until shutdown. Runs on the network thread.
pub fn run_connection<C: Connector + ?Sized>(
    connector: &C,
    credentials: Credentials,
    reconnect_delay: Duration,
    channels: ConnectionChannels,
) {
    let mut supervisor = ConnectionSupervisor::new(reconnect_delay);
    let mut next = Some(credentials);
    let publish_status = |supervisor: &ConnectionSupervisor| {
        let _ = channels
            .events
            .send(NetworkEvent::Status(supervisor.status().clone()));
    };

    loop {
        let credentials = match next.take() {
            Some(credentials) => credentials,
            // 空闲状态：等待用户重新连接或退出
            None => match channels.commands.recv() {
                Ok(NetworkCommand::Connect) => match supervisor.last_credentials() {
                    Some(credentials) => credentials.clone(),
                    None => break,
                },
                Ok(NetworkCommand::Disconnect) => continue,
                Ok(NetworkCommand::Shutdown) | Err(_) => break,
            },
        };

        supervisor.begin_connect(credentials.clone());
        publish_status(&supervisor);
        info!(
            "Connecting over {} as {}:{}",
            connector.name(),
            credentials.device_type,
            credentials.device_id
        );

        let outcome = match connector.connect(&credentials) {
            Ok(transport) => {
                supervisor.connected();
                publish_status(&supervisor);
                serve(transport, &mut supervisor, &channels)
            }
            Err(e) => Outcome::Retry(supervisor.handle_connect_failure(&e)),
        };
        publish_status(&supervisor);

        match outcome {
            Outcome::Shutdown => break,
            Outcome::Idle | Outcome::Retry(None) => next = None,
            Outcome::Retry(Some(scheduled)) => match wait_for_retry(scheduled.after, &channels.commands) {
                RetryWait::Elapsed => next = Some(scheduled.credentials),
                RetryWait::Cancelled => {
                    supervisor.cancel_pending();
                    publish_status(&supervisor);
                    next = None;
                }
                RetryWait::Shutdown => break,
            },
        }
    }

    supervisor.cancel_pending();
    publish_status(&supervisor);
    info!("Network loop stopped");
}

fn serve(
    mut transport: Box<dyn Transport>,
    supervisor: &mut ConnectionSupervisor,
    channels: &ConnectionChannels,
) -> Outcome {
    let (close_tx, close_rx) = crossbeam_channel::bounded(1);
    let events = channels.events.clone();
    transport.on_message(Box::new(move |payload| {
        let _ = events.send(NetworkEvent::Message {
            payload: payload.to_vec(),
            received_at: now_millis(),
        });
    }));
    transport.on_close(Box::new(move |reason| {
        let _ = close_tx.try_send(reason);
    }));

    let closed_outbound = never();
    let mut outbound_open = true;
    loop {
        let outbound = if outbound_open {
            &channels.outbound
        } else {
            &closed_outbound
        };
        select! {
            recv(close_rx) -> reason => {
                let reason = reason
                    .unwrap_or_else(|_| CloseReason::Unexpected("transport dropped".to_string()));
                return match supervisor.handle_close(&reason) {
                    Some(scheduled) => Outcome::Retry(Some(scheduled)),
                    None => Outcome::Idle,
                };
            }
            recv(channels.commands) -> command => match command {
                Ok(NetworkCommand::Connect) => {}
                Ok(NetworkCommand::Disconnect) => {
                    supervisor.expect_disconnect();
                    if let Err(e) = transport.close() {
                        warn!("{}", e);
                        supervisor.handle_close(&CloseReason::Requested);
                        return Outcome::Idle;
                    }
                }
                Ok(NetworkCommand::Shutdown) | Err(_) => {
                    supervisor.expect_disconnect();
                    let _ = transport.close();
                    return Outcome::Shutdown;
                }
            },
            recv(outbound) -> payload => match payload {
                Ok(payload) => {
                    if let Err(e) = transport.send(&payload) {
                        let scheduled = supervisor.handle_send_failure(&e);
                        let _ = transport.close();
                        return Outcome::Retry(scheduled);
                    }
                }
                // 发送端已关闭，不再监听
                Err(_) => outbound_open = false,
            },
        }
    }
}

fn wait_for_retry(delay: Duration, commands: &Receiver<NetworkCommand>) -> RetryWait {
    let deadline = after(delay);
    loop {
        select! {
            recv(deadline) -> _ => return RetryWait::Elapsed,
            recv(commands) -> command => match command {
                Ok(NetworkCommand::Connect) => {}
                Ok(NetworkCommand::Disconnect) => return RetryWait::Cancelled,
                Ok(NetworkCommand::Shutdown) | Err(_) => return RetryWait::Shutdown,
            },
        }
    }
}

//! Transport capability interface shared by the MQTT and WebSocket clients.
//!
//! A transport is created connected by a [`Connector`]. Inbound payloads and
//! the (single) close notification are delivered to handlers registered
//! after construction, from the transport's own reader thread.

pub mod mqtt;
pub mod supervisor;
pub mod websocket;

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::types::Credentials;

pub use mqtt::{MqttConnector, MqttRole, MqttTransport};
pub use supervisor::{
    run_connection, ConnectionChannels, ConnectionStatus, ConnectionSupervisor, NetworkCommand, NetworkEvent,
    ScheduledReconnect,
};
pub use websocket::{RelayLogin, WebSocketConnector, WebSocketTransport};

pub type MessageHandler = Box<dyn FnMut(&[u8]) + Send>;
pub type CloseHandler = Box<dyn FnMut(CloseReason) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called on this side.
    Requested,
    /// The connection dropped without being asked to.
    Unexpected(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Requested => f.write_str("closed on request"),
            CloseReason::Unexpected(why) => write!(f, "connection lost: {}", why),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("close failed: {0}")]
    Close(String),
    #[error("transport is closed")]
    Closed,
}

pub trait Transport: Send {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    fn on_message(&mut self, handler: MessageHandler);

    /// Fires at most once. A close that already happened is reported on registration.
    fn on_close(&mut self, handler: CloseHandler);

    fn close(&mut self) -> Result<(), TransportError>;
}

pub trait Connector: Send {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Transport>, TransportError>;

    /// Short label for logs, e.g. `mqtt` or `websocket`.
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct HandlerSlots {
    message: Option<MessageHandler>,
    close: Option<CloseHandler>,
    closed: Option<CloseReason>,
}

/// Handler storage shared between a transport and its reader thread.
#[derive(Clone, Default)]
pub struct SharedHandlers {
    inner: Arc<Mutex<HandlerSlots>>,
}

impl SharedHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_message(&self, handler: MessageHandler) {
        if let Ok(mut slots) = self.inner.lock() {
            slots.message = Some(handler);
        }
    }

    pub fn set_close(&self, mut handler: CloseHandler) {
        let Ok(mut slots) = self.inner.lock() else {
            return;
        };
        match slots.closed.clone() {
            Some(reason) => {
                drop(slots);
                handler(reason);
            }
            None => slots.close = Some(handler),
        }
    }

    /// Messages that arrive before a handler is registered are dropped.
    pub fn dispatch_message(&self, payload: &[u8]) {
        if let Ok(mut slots) = self.inner.lock() {
            if let Some(handler) = slots.message.as_mut() {
                handler(payload);
            }
        }
    }

    pub fn dispatch_close(&self, reason: CloseReason) {
        let handler = {
            let Ok(mut slots) = self.inner.lock() else {
                return;
            };
            if slots.closed.is_some() {
                return;
            }
            slots.closed = Some(reason.clone());
            slots.close.take()
        };
        if let Some(mut handler) = handler {
            handler(reason);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().map(|slots| slots.closed.is_some()).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn close_fires_once() {
        let handlers = SharedHandlers::new();
        let (tx, rx) = unbounded();
        handlers.set_close(Box::new(move |reason| tx.send(reason).unwrap()));

        handlers.dispatch_close(CloseReason::Unexpected("eof".into()));
        handlers.dispatch_close(CloseReason::Requested);

        assert_eq!(rx.try_recv().unwrap(), CloseReason::Unexpected("eof".into()));
        assert!(rx.try_recv().is_err());
        assert!(handlers.is_closed());
    }

    #[test]
    fn late_close_handler_still_sees_close() {
        let handlers = SharedHandlers::new();
        handlers.dispatch_close(CloseReason::Requested);

        let (tx, rx) = unbounded();
        handlers.set_close(Box::new(move |reason| tx.send(reason).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), CloseReason::Requested);
    }

    #[test]
    fn messages_go_to_registered_handler() {
        let handlers = SharedHandlers::new();
        handlers.dispatch_message(b"dropped");

        let (tx, rx) = unbounded();
        handlers.set_message(Box::new(move |payload| tx.send(payload.to_vec()).unwrap()));
        handlers.dispatch_message(b"kept");

        assert_eq!(rx.try_recv().unwrap(), b"kept".to_vec());
        assert!(rx.try_recv().is_err());
    }
}

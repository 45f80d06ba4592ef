use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{CloseHandler, CloseReason, Connector, MessageHandler, SharedHandlers, Transport, TransportError};
use crate::types::Credentials;

/// Login sent as the first text frame; the relay streams readings for that account afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct RelayLogin {
    pub email: String,
    pub pin: String,
}

impl RelayLogin {
    pub fn new(email: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            pin: pin.into(),
        }
    }

    fn hello(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Connect(e.to_string()))
    }
}

/// Connects to one fixed relay URL and identifies with email + PIN.
pub struct WebSocketConnector {
    url: String,
    login: RelayLogin,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, login: RelayLogin) -> Self {
        Self { url: url.into(), login }
    }
}

impl Connector for WebSocketConnector {
    // 中继只认邮箱和 PIN，设备凭据用不上
    fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn Transport>, TransportError> {
        let hello = self.login.hello()?;
        Ok(Box::new(WebSocketTransport::connect(&self.url, Some(hello))?))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client driven by a current-thread tokio runtime on its own thread.
pub struct WebSocketTransport {
    outbound: Option<mpsc::UnboundedSender<Message>>,
    handlers: SharedHandlers,
    closing: Arc<AtomicBool>,
}

impl WebSocketTransport {
    /// Open the socket and, when given, send `hello` before any other frame.
    pub fn connect(url: &str, hello: Option<String>) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (mut stream, _) = runtime
            .block_on(connect_async(url))
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!("WebSocket connected to {}", strip_query(url));

        if let Some(hello) = hello {
            runtime
                .block_on(stream.send(Message::Text(hello.into())))
                .map_err(|e| TransportError::Connect(format!("login frame: {}", e)))?;
        }

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let handlers = SharedHandlers::new();
        let closing = Arc::new(AtomicBool::new(false));

        let worker_handlers = handlers.clone();
        let worker_closing = Arc::clone(&closing);
        thread::Builder::new()
            .name("websocket".to_string())
            .spawn(move || {
                let reason = runtime.block_on(pump(stream, outbound_rx, &worker_handlers, &worker_closing));
                worker_handlers.dispatch_close(reason);
            })
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            outbound: Some(outbound),
            handlers,
            closing,
        })
    }
}

// token 不写进日志
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn lost(closing: &AtomicBool, why: String) -> CloseReason {
    if closing.load(Ordering::Relaxed) {
        CloseReason::Requested
    } else {
        warn!("WebSocket {}", why);
        CloseReason::Unexpected(why)
    }
}

async fn pump(
    stream: RelayStream,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    handlers: &SharedHandlers,
    closing: &AtomicBool,
) -> CloseReason {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        return lost(closing, format!("write error: {}", e));
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return CloseReason::Requested;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => handlers.dispatch_message(text.as_bytes()),
                Some(Ok(Message::Binary(bytes))) => handlers.dispatch_message(&bytes),
                Some(Ok(Message::Close(frame))) => {
                    return lost(closing, format!("closed by peer: {:?}", frame));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return lost(closing, format!("read error: {}", e)),
                None => return lost(closing, "stream ended".to_string()),
            },
        }
    }
}

impl Transport for WebSocketTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        let message = match std::str::from_utf8(payload) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(payload.to_vec().into()),
        };
        outbound
            .send(message)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn on_message(&mut self, handler: MessageHandler) {
        self.handlers.set_message(handler);
    }

    fn on_close(&mut self, handler: CloseHandler) {
        self.handlers.set_close(handler);
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closing.store(true, Ordering::Relaxed);
        // 丢弃发送端后 pump 会发送 Close 帧并退出
        self.outbound.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use crossbeam_channel::unbounded;
    use tokio_tungstenite::accept_async;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    /// What the local relay does after reading the login frame and the client's "ready".
    #[derive(Clone, Copy)]
    enum RelayEnd {
        /// Send a reading, then close from the server side.
        ServerCloses,
        /// Send a reading, then wait for the client to close.
        AwaitClientClose,
    }

    /// Single-connection relay on a loopback port; the first frame it receives is
    /// reported on the returned channel.
    fn local_relay(end: RelayEnd) -> (String, crossbeam_channel::Receiver<String>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let (first_frames, first_frame) = unbounded();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                let (socket, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(socket).await.unwrap();

                if let Some(Ok(Message::Text(hello))) = ws.next().await {
                    let _ = first_frames.send(hello.to_string());
                }
                // 等客户端注册完回调
                while let Some(Ok(frame)) = ws.next().await {
                    if matches!(&frame, Message::Text(text) if text.as_str() == "ready") {
                        break;
                    }
                }
                ws.send(Message::Text(r#"{"ax":1.5,"ay":0,"az":9.8}"#.into()))
                    .await
                    .unwrap();

                match end {
                    RelayEnd::ServerCloses => {
                        let _ = ws.close(None).await;
                    }
                    RelayEnd::AwaitClientClose => while let Some(Ok(_)) = ws.next().await {},
                }
            });
        });

        (format!("ws://{}/websocket", addr), first_frame)
    }

    fn connect_and_listen(
        url: &str,
    ) -> (
        WebSocketTransport,
        crossbeam_channel::Receiver<Vec<u8>>,
        crossbeam_channel::Receiver<CloseReason>,
    ) {
        let login = RelayLogin::new("user@example.com", "1234");
        let mut transport = WebSocketTransport::connect(url, Some(login.hello().unwrap())).unwrap();

        let (messages_tx, messages) = unbounded();
        let (closes_tx, closes) = unbounded();
        transport.on_message(Box::new(move |payload: &[u8]| {
            let _ = messages_tx.send(payload.to_vec());
        }));
        transport.on_close(Box::new(move |reason: CloseReason| {
            let _ = closes_tx.send(reason);
        }));
        transport.send(b"ready").unwrap();
        (transport, messages, closes)
    }

    #[test]
    fn login_frame_carries_email_and_pin() {
        let hello = RelayLogin::new("user@example.com", "1234").hello().unwrap();
        let value: serde_json::Value = serde_json::from_str(&hello).unwrap();
        assert_eq!(value, serde_json::json!({"email": "user@example.com", "pin": "1234"}));
    }

    #[test]
    fn strip_query_hides_parameters() {
        assert_eq!(strip_query("wss://relay.example.com/websocket?x=1"), "wss://relay.example.com/websocket");
        assert_eq!(strip_query("ws://relay.example.com/websocket"), "ws://relay.example.com/websocket");
    }

    #[test]
    fn relay_readings_reach_message_handler_and_server_close_is_unexpected() {
        let (url, first_frame) = local_relay(RelayEnd::ServerCloses);
        let (_transport, messages, closes) = connect_and_listen(&url);

        let hello: serde_json::Value = serde_json::from_str(&first_frame.recv_timeout(WAIT).unwrap()).unwrap();
        assert_eq!(hello["email"], "user@example.com");
        assert_eq!(hello["pin"], "1234");

        let payload = messages.recv_timeout(WAIT).unwrap();
        assert_eq!(payload, br#"{"ax":1.5,"ay":0,"az":9.8}"#.to_vec());
        assert!(matches!(closes.recv_timeout(WAIT).unwrap(), CloseReason::Unexpected(_)));
    }

    #[test]
    fn client_close_is_requested() {
        let (url, _) = local_relay(RelayEnd::AwaitClientClose);
        let (mut transport, messages, closes) = connect_and_listen(&url);

        messages.recv_timeout(WAIT).unwrap();
        transport.close().unwrap();
        assert_eq!(closes.recv_timeout(WAIT).unwrap(), CloseReason::Requested);
        // one close per connection
        assert!(closes.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn connect_to_closed_port_fails() {
        assert!(matches!(
            WebSocketTransport::connect("ws://127.0.0.1:9/websocket", None),
            Err(TransportError::Connect(_))
        ));
    }

    #[test]
    fn send_after_close_is_an_error() {
        let mut transport = WebSocketTransport {
            outbound: None,
            handlers: SharedHandlers::new(),
            closing: Arc::new(AtomicBool::new(true)),
        };
        assert!(matches!(transport.send(b"{}"), Err(TransportError::Closed)));
    }
}

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use motionhub::transport::{
    run_connection, CloseHandler, CloseReason, ConnectionChannels, ConnectionStatus, Connector, MessageHandler,
    NetworkCommand, NetworkEvent, SharedHandlers, Transport, TransportError,
};
use motionhub::types::Credentials;

const DELAY: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(2);

fn creds() -> Credentials {
    Credentials {
        org: "abc123".to_string(),
        device_type: "phone".to_string(),
        device_id: "p1".to_string(),
        auth_token: "secret".to_string(),
        api_key: None,
        api_token: None,
    }
}

struct FakeTransport {
    handlers: SharedHandlers,
    links: Sender<SharedHandlers>,
    fail_sends: bool,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Transport for FakeTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Send("broken pipe".to_string()));
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn on_message(&mut self, handler: MessageHandler) {
        self.handlers.set_message(handler);
        // the test drives the link once handlers are in place
        let _ = self.links.send(self.handlers.clone());
    }

    fn on_close(&mut self, handler: CloseHandler) {
        self.handlers.set_close(handler);
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.handlers.dispatch_close(CloseReason::Requested);
        Ok(())
    }
}

struct FakeConnector {
    connects: Arc<Mutex<Vec<(Credentials, Instant)>>>,
    links: Sender<SharedHandlers>,
    fail_sends: bool,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Connector for FakeConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Transport>, TransportError> {
        self.connects.lock().unwrap().push((credentials.clone(), Instant::now()));
        Ok(Box::new(FakeTransport {
            handlers: SharedHandlers::new(),
            links: self.links.clone(),
            fail_sends: self.fail_sends,
            sent: Arc::clone(&self.sent),
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct Harness {
    connects: Arc<Mutex<Vec<(Credentials, Instant)>>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    links: Receiver<SharedHandlers>,
    events: Receiver<NetworkEvent>,
    commands: Sender<NetworkCommand>,
    outbound: Sender<Vec<u8>>,
    handle: thread::JoinHandle<()>,
}

impl Harness {
    fn start(delay: Duration, fail_sends: bool) -> Self {
        let connects = Arc::new(Mutex::new(Vec::new()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (links_tx, links) = unbounded();
        let (events_tx, events) = unbounded();
        let (commands, commands_rx) = unbounded();
        let (outbound, outbound_rx) = unbounded();

        let connector = FakeConnector {
            connects: Arc::clone(&connects),
            links: links_tx,
            fail_sends,
            sent: Arc::clone(&sent),
        };
        let handle = thread::spawn(move || {
            run_connection(
                &connector,
                creds(),
                delay,
                ConnectionChannels {
                    events: events_tx,
                    commands: commands_rx,
                    outbound: outbound_rx,
                },
            )
        });

        Self {
            connects,
            sent,
            links,
            events,
            commands,
            outbound,
            handle,
        }
    }

    fn next_link(&self) -> SharedHandlers {
        self.links.recv_timeout(WAIT).expect("transport connected")
    }

    fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    fn wait_for_status(&self, wanted: ConnectionStatus) {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if let Ok(NetworkEvent::Status(status)) = self.events.recv_timeout(WAIT) {
                if status == wanted {
                    return;
                }
            }
        }
        panic!("never saw status {:?}", wanted);
    }

    fn shutdown(self) {
        self.commands.send(NetworkCommand::Shutdown).unwrap();
        self.handle.join().expect("network loop exits");
    }
}

#[test]
fn unexpected_close_reconnects_once_with_same_credentials() {
    let harness = Harness::start(DELAY, false);
    let first = harness.next_link();

    first.dispatch_close(CloseReason::Unexpected("connection reset".to_string()));
    let _second = harness.next_link();

    // no further attempts once the link is back
    assert!(harness.links.recv_timeout(DELAY * 4).is_err());

    {
        let connects = harness.connects.lock().unwrap();
        assert_eq!(connects.len(), 2);
        assert_eq!(connects[0].0, creds());
        assert_eq!(connects[1].0, creds());
        assert!(connects[1].1.duration_since(connects[0].1) >= DELAY);
    }
    harness.shutdown();
}

#[test]
fn requested_disconnect_stays_disconnected_until_connect() {
    let harness = Harness::start(DELAY, false);
    let _first = harness.next_link();
    harness.wait_for_status(ConnectionStatus::Connected);

    harness.commands.send(NetworkCommand::Disconnect).unwrap();
    harness.wait_for_status(ConnectionStatus::Disconnected);
    assert!(harness.links.recv_timeout(DELAY * 4).is_err());
    assert_eq!(harness.connect_count(), 1);

    harness.commands.send(NetworkCommand::Connect).unwrap();
    let _second = harness.next_link();
    assert_eq!(harness.connect_count(), 2);
    harness.shutdown();
}

#[test]
fn inbound_payloads_are_forwarded_with_receive_time() {
    let harness = Harness::start(DELAY, false);
    let link = harness.next_link();

    link.dispatch_message(br#"{"ax":"1.00"}"#);
    let deadline = Instant::now() + WAIT;
    loop {
        assert!(Instant::now() < deadline, "payload not forwarded");
        if let Ok(NetworkEvent::Message { payload, received_at }) = harness.events.recv_timeout(WAIT) {
            assert_eq!(payload, br#"{"ax":"1.00"}"#.to_vec());
            assert!(received_at > 0);
            break;
        }
    }
    harness.shutdown();
}

#[test]
fn outbound_payloads_are_published() {
    let harness = Harness::start(DELAY, false);
    let _link = harness.next_link();

    harness.outbound.send(b"hello".to_vec()).unwrap();
    let deadline = Instant::now() + WAIT;
    while harness.sent.lock().unwrap().is_empty() {
        assert!(Instant::now() < deadline, "payload not published");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(harness.sent.lock().unwrap()[0], b"hello".to_vec());
    harness.shutdown();
}

#[test]
fn send_failure_triggers_reconnect() {
    let harness = Harness::start(DELAY, true);
    let _first = harness.next_link();

    harness.outbound.send(b"reading".to_vec()).unwrap();
    let _second = harness.next_link();
    assert_eq!(harness.connect_count(), 2);
    harness.shutdown();
}

#[test]
fn shutdown_interrupts_pending_reconnect() {
    let harness = Harness::start(Duration::from_secs(30), false);
    let first = harness.next_link();
    first.dispatch_close(CloseReason::Unexpected("eof".to_string()));
    harness.wait_for_status(ConnectionStatus::Reconnecting { attempt: 1 });

    let started = Instant::now();
    harness.shutdown();
    assert!(started.elapsed() < Duration::from_secs(5));
}

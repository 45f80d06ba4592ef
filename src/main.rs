use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{bounded, never, unbounded, Sender};
use dotenv::dotenv;
use eframe::egui;
use log::{error, info, warn};

use motionhub::app::MotionViewerApp;
use motionhub::auth::{AuthClient, AuthError};
use motionhub::commands::{Cli, Commands, LoginArgs};
use motionhub::config::{AppConfig, ConfigManager, TransportKind};
use motionhub::logger;
use motionhub::simulator::{run_simulator, MotionSimulator};
use motionhub::transport::{
    run_connection, ConnectionChannels, Connector, MqttConnector, MqttRole, NetworkCommand, NetworkEvent, RelayLogin,
    WebSocketConnector,
};
use motionhub::types::Credentials;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    dotenv().ok(); // 加载 .env 文件
    let cli = Cli::parse();

    let manager = match ConfigManager::load_or_default(&cli.config) {
        Ok(manager) => manager,
        Err(e) => {
            logger::init_logger("info");
            error!("Failed to load {}: {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };
    let config = manager.get_config().clone();
    logger::init_logger(&config.logging.level);
    info!("Application starting");

    let result = match &cli.command {
        Commands::View { login, register } => viewer_connector(&config, login)
            .and_then(|connector| resolve_credentials(&config, login, *register).map(|creds| (connector, creds)))
            .and_then(|(connector, creds)| run_viewer(manager, connector, creds)),
        Commands::Simulate { login, count } => {
            resolve_credentials(&config, login, false).and_then(|creds| run_device(&config, creds, *count))
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn resolve_credentials(config: &AppConfig, login: &LoginArgs, register: bool) -> Result<Credentials, Box<dyn Error>> {
    let Some((email, pin)) = login.pair() else {
        return Ok(Credentials::from_env()?);
    };

    let client = AuthClient::new(&config.auth);
    let creds = match client.authenticate(email, pin) {
        Ok(creds) => creds,
        Err(AuthError::NotRegistered) if register => {
            info!("{} is not registered yet, registering", email);
            client.register(email, pin).map_err(|e| e.user_message())?
        }
        Err(e) => return Err(e.user_message().into()),
    };
    Ok(creds.with_env_api_key())
}

/// The relay identifies viewers by email and PIN, so it needs a login; MQTT subscribes as an application.
fn viewer_connector(config: &AppConfig, login: &LoginArgs) -> Result<Box<dyn Connector>, Box<dyn Error>> {
    let connector: Box<dyn Connector> = match config.transport.kind {
        TransportKind::Websocket => {
            let Some((email, pin)) = login.pair() else {
                return Err("the websocket relay needs --email and --pin".into());
            };
            Box::new(WebSocketConnector::new(
                config.transport.websocket.url.clone(),
                RelayLogin::new(email, pin),
            ))
        }
        TransportKind::Mqtt => Box::new(MqttConnector::new(
            config.transport.mqtt.clone(),
            MqttRole::Application {
                app_id: config.transport.mqtt.app_id.clone(),
            },
        )),
    };
    Ok(connector)
}

fn spawn_network(
    connector: Box<dyn Connector>,
    credentials: Credentials,
    reconnect_delay: Duration,
    channels: ConnectionChannels,
) -> Result<thread::JoinHandle<()>, Box<dyn Error>> {
    let handle = thread::Builder::new()
        .name("network".to_string())
        .spawn(move || run_connection(connector.as_ref(), credentials, reconnect_delay, channels))?;
    Ok(handle)
}

fn run_viewer(
    manager: ConfigManager,
    connector: Box<dyn Connector>,
    credentials: Credentials,
) -> Result<(), Box<dyn Error>> {
    let config = manager.get_config().clone();
    let (event_sender, event_receiver) = bounded(config.channels.event_channel_capacity);
    let (command_sender, command_receiver) = unbounded();

    let network_handle = spawn_network(
        connector,
        credentials,
        config.reconnect_delay(),
        ConnectionChannels {
            events: event_sender,
            commands: command_receiver,
            outbound: never(),
        },
    )?;

    let options = eframe::NativeOptions {
        vsync: config.window.vsync,
        hardware_acceleration: if config.window.hardware_acceleration {
            eframe::HardwareAcceleration::Preferred // 硬件加速优先模式
        } else {
            eframe::HardwareAcceleration::Off
        },
        renderer: eframe::Renderer::Glow,
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_resizable(config.window.resizable),
        ..Default::default()
    };

    let title = config.window.title.clone();
    let app_commands = command_sender.clone();
    let gui_result = eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(MotionViewerApp::new(manager, event_receiver, app_commands)))),
    );

    // GUI 关闭后，通知网络线程退出
    let _ = command_sender.send(NetworkCommand::Shutdown);
    if network_handle.join().is_err() {
        error!("Network thread panicked");
    }

    gui_result.map_err(|e| format!("GUI failed: {}", e).into())
}

fn run_device(config: &AppConfig, credentials: Credentials, count: Option<u64>) -> Result<(), Box<dyn Error>> {
    let (event_sender, event_receiver) = bounded(config.channels.event_channel_capacity);
    let (command_sender, command_receiver) = unbounded();
    let (outbound_sender, outbound_receiver) = bounded(config.channels.outbound_channel_capacity);

    let connector = MqttConnector::new(config.transport.mqtt.clone(), MqttRole::Device);
    let network_handle = spawn_network(
        Box::new(connector),
        credentials,
        config.reconnect_delay(),
        ConnectionChannels {
            events: event_sender,
            commands: command_receiver,
            outbound: outbound_receiver,
        },
    )?;

    // 设备模式下没有界面，只记录状态变化；网络线程退出后停止模拟器
    let shutdown = Arc::new(AtomicBool::new(false));
    let logger_shutdown = Arc::clone(&shutdown);
    let status_logger = thread::spawn(move || {
        for event in event_receiver.iter() {
            if let NetworkEvent::Status(status) = event {
                info!("Connection status: {}", status);
            }
        }
        logger_shutdown.store(true, Ordering::Relaxed);
    });

    let simulator = MotionSimulator::new(config.simulator.noise, config.simulator_interval());
    let pending = outbound_sender.clone();
    let sim_shutdown = Arc::clone(&shutdown);
    let sim_handle = thread::Builder::new()
        .name("simulator".to_string())
        .spawn(move || run_simulator(simulator, count, outbound_sender, sim_shutdown))?;

    let published = sim_handle.join().unwrap_or_else(|_| {
        error!("Simulator thread panicked");
        0
    });
    info!("Simulator queued {} readings", published);

    wait_for_drain(&pending, DRAIN_TIMEOUT);
    let _ = command_sender.send(NetworkCommand::Shutdown);

    if network_handle.join().is_err() {
        error!("Network thread panicked");
    }
    let _ = status_logger.join();
    Ok(())
}

/// Give the network thread a chance to publish what is still queued.
fn wait_for_drain(pending: &Sender<Vec<u8>>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !pending.is_empty() {
        if Instant::now() >= deadline {
            warn!("{} readings were not published before shutdown", pending.len());
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

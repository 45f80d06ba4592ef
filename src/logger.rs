use std::io::Write;
use std::thread;

use chrono::Local;
use env_logger::{Builder, Env};
use log::Level;

/// Network crates that are chatty at info/debug; capped unless `RUST_LOG` says otherwise.
const QUIET_MODULES: [&str; 3] = ["rumqttc", "tungstenite", "tokio_tungstenite"];

fn default_filter(level: &str) -> String {
    QUIET_MODULES
        .iter()
        .fold(level.to_string(), |filter, module| format!("{},{}=warn", filter, module))
}

fn level_style(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m\x1b[1m", // 红色
        Level::Warn => "\x1b[33m\x1b[1m",  // 黄色
        Level::Info => "\x1b[32m\x1b[1m",  // 绿色
        Level::Debug => "\x1b[36m\x1b[1m", // 青色
        Level::Trace => "\x1b[90m\x1b[1m", // 灰色
    }
}

/// Colored `time LEVEL (thread) [target] message` lines on stderr.
/// `RUST_LOG` replaces the whole filter; calling this twice keeps the first logger.
pub fn init_logger(default_level: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter(default_level)))
        .format(|buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(
                buf,
                "{}{} {:<5}\x1b[0m ({}) [{}] {}",
                time,
                level_style(record.level()),
                record.level(),
                thread::current().name().unwrap_or("-"),
                record.target(),
                record.args(),
            )
        })
        .try_init();

    if let Err(e) = result {
        log::debug!("Logger already installed: {}", e);
    }
}

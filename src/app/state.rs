use crossbeam_channel::{Receiver, Sender};

use crate::codec::{decode_reading, CodecError};
use crate::config::AppConfig;
use crate::ingest::{ingest, ingest_strict, SampleStore};
use crate::transport::{ConnectionStatus, NetworkCommand, NetworkEvent};
use crate::types::{ParseError, Sample};
use crate::window::ChartRegistry;

/// 应用状态管理模块

/// Why an inbound payload did not become a sample.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("rejected reading: {0}")]
    Malformed(#[from] ParseError),
}

/// 数据通道
#[derive(Debug)]
pub struct DataChannels {
    pub events: Receiver<NetworkEvent>,
    pub commands: Sender<NetworkCommand>,
}

/// Counters shown in the status bar.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub rejected: u64,
    pub last_error: Option<String>,
}

/// 统一的应用状态管理
#[derive(Debug)]
pub struct AppState {
    pub store: SampleStore,
    pub registry: ChartRegistry,
    pub status: ConnectionStatus,
    pub stats: IngestStats,
    pub channels: DataChannels,
    reject_malformed: bool,
}

impl AppState {
    pub fn new(config: &AppConfig, events: Receiver<NetworkEvent>, commands: Sender<NetworkCommand>) -> Self {
        Self {
            store: SampleStore::new(config.effective_history_limit()),
            registry: ChartRegistry::new(
                config.plot.charts.clone(),
                config.plot.window_size,
                config.plot.synthetic_spacing_ms,
            ),
            status: ConnectionStatus::Disconnected,
            stats: IngestStats::default(),
            channels: DataChannels { events, commands },
            reject_malformed: config.ingest.reject_malformed,
        }
    }

    /// Decode one payload, append it to the history and refresh every chart window.
    pub fn ingest_payload(&mut self, payload: &[u8], received_at: i64, now: i64) -> Result<Sample, IngestError> {
        let raw = decode_reading(payload)?;
        let sample = if self.reject_malformed {
            ingest_strict(&raw, received_at)?
        } else {
            ingest(&raw, received_at)
        };

        let stored = self.store.push(sample);
        self.registry.recompute(&self.store, now);
        Ok(stored)
    }

    /// Refresh windows without new data, e.g. before the first sample arrives.
    pub fn refresh(&mut self, now: i64) {
        self.registry.recompute(&self.store, now);
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.store.latest()
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// 发送命令给网络线程
    pub fn send_command(&self, command: NetworkCommand) {
        if let Err(e) = self.channels.commands.send(command) {
            log::warn!("Network thread is gone, dropping {:?}: {}", command, e);
        }
    }
}

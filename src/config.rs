use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

use crate::types::ChartSpec;
use crate::window::{DEFAULT_SPACING_MS, DEFAULT_WINDOW_SIZE};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub logging: LoggingConfig,
    pub transport: TransportConfig,
    pub plot: PlotConfig,
    pub ingest: IngestConfig,
    pub reconnect: ReconnectConfig,
    pub auth: AuthConfig,
    pub simulator: SimulatorConfig,
    pub channels: ChannelConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
    pub hardware_acceleration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter used when `RUST_LOG` is unset.
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Mqtt,
    Websocket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport used by the viewer. The simulator always publishes over MQTT.
    pub kind: TransportKind,
    pub mqtt: MqttConfig,
    pub websocket: WebSocketConfig,
}

/// MQTT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Explicit broker host; derived from the organization when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    pub domain: String,
    pub port: u16,
    pub qos: u8,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub event_id: String,
    /// Application id used when the viewer subscribes over MQTT.
    pub app_id: String,
    /// Application API key / token; `MOTIONHUB_API_KEY` / `MOTIONHUB_API_TOKEN` take precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub url: String,
}

/// 绘图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Points per window.
    pub window_size: usize,
    /// Spacing of synthetic padding points.
    pub synthetic_spacing_ms: i64,
    pub plot_height: f32,
    pub show_orientation: bool,
    pub charts: Vec<ChartSpec>,
    pub colors: PlotColors,
}

/// 绘图颜色配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotColors {
    /// Series colors, reused in order for every chart.
    pub series: Vec<[u8; 3]>,
    pub cube: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub history_limit: usize,
    /// Drop readings with malformed fields instead of passing NaN through.
    pub reject_malformed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub interval_ms: u64,
    /// Half-width of the uniform noise added to each accelerometer axis, m/s².
    pub noise: f64,
}

/// 通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub event_channel_capacity: usize,
    pub outbound_channel_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 900.0,
            title: "MotionHub - Motion Telemetry Viewer".to_string(),
            resizable: true,
            vsync: true,
            hardware_acceleration: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Websocket,
            mqtt: MqttConfig::default(),
            websocket: WebSocketConfig::default(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: None,
            domain: "internetofthings.ibmcloud.com".to_string(),
            port: 1883,
            qos: 0,
            keep_alive: 60,
            clean_session: true,
            event_id: crate::codec::DEFAULT_EVENT_ID.to_string(),
            app_id: "motionhub-viewer".to_string(),
            api_key: None,
            api_token: None,
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/websocket".to_string(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            synthetic_spacing_ms: DEFAULT_SPACING_MS,
            plot_height: 160.0,
            show_orientation: true,
            charts: ChartSpec::defaults(),
            colors: PlotColors::default(),
        }
    }
}

impl Default for PlotColors {
    fn default() -> Self {
        Self {
            series: vec![
                [220, 50, 47],  // 红色
                [38, 139, 210], // 蓝色
                [133, 153, 0],  // 绿色
            ],
            cube: [88, 110, 117],
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_WINDOW_SIZE,
            reject_malformed: false,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            noise: 0.15,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 5000,
            outbound_channel_capacity: 100,
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::ValidationError("Window dimensions must be positive".to_string()));
        }

        if self.plot.window_size == 0 {
            return Err(ConfigError::ValidationError("Plot window size must be positive".to_string()));
        }

        if self.plot.synthetic_spacing_ms <= 0 {
            return Err(ConfigError::ValidationError("Synthetic spacing must be positive".to_string()));
        }

        if self.plot.charts.is_empty() {
            return Err(ConfigError::ValidationError("At least one chart must be configured".to_string()));
        }

        for chart in &self.plot.charts {
            if chart.fields.is_empty() {
                return Err(ConfigError::ValidationError(format!("Chart '{}' has no fields", chart.title)));
            }
            if chart.min_value >= chart.max_value {
                return Err(ConfigError::ValidationError(format!(
                    "Chart '{}' needs min_value < max_value",
                    chart.title
                )));
            }
        }

        if self.plot.colors.series.is_empty() {
            return Err(ConfigError::ValidationError("At least one series color is required".to_string()));
        }

        if self.transport.mqtt.qos > 2 {
            return Err(ConfigError::ValidationError("MQTT QoS must be 0, 1 or 2".to_string()));
        }

        if self.reconnect.delay_ms == 0 {
            return Err(ConfigError::ValidationError("Reconnect delay must be positive".to_string()));
        }

        if self.simulator.interval_ms == 0 {
            return Err(ConfigError::ValidationError("Simulator interval must be positive".to_string()));
        }

        if self.channels.event_channel_capacity == 0 || self.channels.outbound_channel_capacity == 0 {
            return Err(ConfigError::ValidationError("Channel capacities must be positive".to_string()));
        }

        Ok(())
    }

    /// Retention never drops below one full window.
    pub fn effective_history_limit(&self) -> usize {
        self.ingest.history_limit.max(self.plot.window_size)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.delay_ms)
    }

    pub fn simulator_interval(&self) -> Duration {
        Duration::from_millis(self.simulator.interval_ms)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Load `path` if it exists, otherwise start from defaults bound to `path`.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            return Self::load_from_file(path);
        }
        info!("No config at {}, using defaults", path.as_ref().display());
        Ok(Self {
            config: AppConfig::default(),
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取可变配置
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 保存配置
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.config_path {
            self.config.save_to_file(path)?;
        }
        Ok(())
    }
}

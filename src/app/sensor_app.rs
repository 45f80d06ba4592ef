use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use eframe::{egui, Frame};
use log::{info, warn};

use super::handlers::IngestionHandler;
use super::state::AppState;
use crate::config::{AppConfig, ConfigManager};
use crate::transport::{NetworkCommand, NetworkEvent};
use crate::utils::now_millis;

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

pub struct MotionViewerApp {
    // 统一的状态管理
    pub state: AppState,
    config: ConfigManager,
}

impl MotionViewerApp {
    pub fn new(config: ConfigManager, events: Receiver<NetworkEvent>, commands: Sender<NetworkCommand>) -> Self {
        let mut state = AppState::new(config.get_config(), events, commands);
        // 启动时先填满合成时间轴
        state.refresh(now_millis());

        info!(
            "Viewer started: {} charts, window of {} points",
            state.registry.charts().len(),
            state.registry.window_size()
        );

        Self { state, config }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.get_config()
    }

    /// Display toggles are remembered in the config file.
    pub fn set_show_orientation(&mut self, show: bool) {
        if self.config.get_config().plot.show_orientation == show {
            return;
        }
        self.config.get_config_mut().plot.show_orientation = show;
        match self.config.save() {
            Ok(()) => info!("Orientation view {}", if show { "shown" } else { "hidden" }),
            Err(e) => warn!("Failed to save display settings: {}", e),
        }
    }
}

impl eframe::App for MotionViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 设置明亮模式主题
        ctx.set_visuals(egui::Visuals::light());

        IngestionHandler::handle_events(&mut self.state, now_millis());

        crate::app::ui::render_status_bar(self, ctx);
        crate::app::ui::render_main_panel(self, ctx);

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("GUI closing, signaling network thread to shutdown");
        self.state.send_command(NetworkCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn orientation_toggle_is_saved_to_config_file() {
        let path = std::env::temp_dir().join(format!("motionhub-view-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let (_events_tx, events) = unbounded();
        let (commands, _commands_rx) = unbounded();
        let manager = ConfigManager::load_or_default(&path).unwrap();
        let shown = manager.get_config().plot.show_orientation;
        let mut app = MotionViewerApp::new(manager, events, commands);

        app.set_show_orientation(!shown);
        assert_eq!(app.config().plot.show_orientation, !shown);

        let reloaded = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(reloaded.get_config().plot.show_orientation, !shown);
        let _ = std::fs::remove_file(&path);
    }
}

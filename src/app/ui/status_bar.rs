use eframe::egui;

use crate::app::sensor_app::MotionViewerApp;
use crate::transport::{ConnectionStatus, NetworkCommand};
use crate::utils::format_timestamp;

fn status_color(status: &ConnectionStatus) -> egui::Color32 {
    match status {
        ConnectionStatus::Connected => egui::Color32::from_rgb(0, 150, 0),             // 绿色
        ConnectionStatus::Connecting => egui::Color32::from_rgb(255, 165, 0),          // 橙色
        ConnectionStatus::Reconnecting { .. } => egui::Color32::from_rgb(255, 165, 0), // 橙色
        ConnectionStatus::Disconnected => egui::Color32::from_rgb(150, 0, 0),          // 红色
    }
}

pub fn render_status_bar(app: &mut MotionViewerApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("status_bar")
        .min_height(40.0)
        .show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                let state = &app.state;
                ui.label("Status:");
                ui.colored_label(status_color(&state.status), state.status.to_string());

                ui.separator();

                // 连接控制
                match state.status {
                    ConnectionStatus::Disconnected => {
                        if ui.button("Connect").clicked() {
                            state.send_command(NetworkCommand::Connect);
                        }
                    }
                    _ => {
                        if ui.button("Disconnect").clicked() {
                            state.send_command(NetworkCommand::Disconnect);
                        }
                    }
                }

                ui.separator();
                ui.label(format!(
                    "Samples: {} ({} retained)",
                    state.store.total_ingested(),
                    state.store.len()
                ));

                ui.separator();
                match state.latest() {
                    Some(sample) => {
                        ui.label(format!("|a|: {:.2} m/s²", sample.accel_magnitude));
                        ui.label(format!("Last: {}", format_timestamp(sample.time)));
                    }
                    None => {
                        ui.label("waiting for data...");
                    }
                }

                if state.stats.rejected > 0 {
                    ui.separator();
                    let label = ui.colored_label(
                        egui::Color32::from_rgb(150, 0, 0),
                        format!("Rejected: {}", state.stats.rejected),
                    );
                    if let Some(err) = &state.stats.last_error {
                        label.on_hover_text(err);
                    }
                }

                ui.separator();
                ui.label(format!("Window: {} points", state.registry.window_size()));
            });
            ui.add_space(5.0);
        });
}

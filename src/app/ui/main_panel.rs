use eframe::egui;

use crate::app::sensor_app::MotionViewerApp;
use crate::orientation::paint_cube;
use crate::plotter::render_charts;

const CUBE_SIZE: f32 = 180.0;

pub fn render_main_panel(app: &mut MotionViewerApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        // 显示选项控制
        ui.horizontal(|ui| {
            ui.label("Display:");
            let mut show_orientation = app.config().plot.show_orientation;
            if ui.checkbox(&mut show_orientation, "Show Orientation").changed() {
                app.set_show_orientation(show_orientation);
            }
        });
        ui.add_space(10.0);

        let plot_config = &app.config().plot;
        let state = &app.state;
        ui.horizontal_top(|ui| {
            if plot_config.show_orientation {
                ui.vertical(|ui| {
                    ui.heading("Orientation");
                    let angles = state
                        .latest()
                        .map(|sample| (sample.rot_alpha, sample.rot_beta, sample.rot_gamma));
                    let [r, g, b] = plot_config.colors.cube;
                    paint_cube(ui, angles, CUBE_SIZE, egui::Color32::from_rgb(r, g, b));
                    if let Some((alpha, beta, gamma)) = angles {
                        ui.label(format!("α {:.1}°  β {:.1}°  γ {:.1}°", alpha, beta, gamma));
                    }
                });
                ui.separator();
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical(|ui| {
                    render_charts(ui, &state.registry, plot_config);
                });
            });
        });
    });
}

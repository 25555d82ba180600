//! Start-up failure screen with a manual retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eframe::egui::{self, RichText};
use egui_phosphor::regular::{ARROWS_CLOCKWISE, WARNING};

use super::components::colors;

/// Shown when the runtime or backend client cannot be built.
///
/// "Tentar novamente" sets the shared flag and closes the window; the
/// caller decides whether to start over.
pub struct RecoveryApp {
    error: String,
    retry: Arc<AtomicBool>,
}

impl RecoveryApp {
    pub fn new(error: String, retry: Arc<AtomicBool>) -> Self {
        Self { error, retry }
    }
}

impl eframe::App for RecoveryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.label(RichText::new(WARNING).size(40.0).color(colors::WARNING));
                ui.heading("Não foi possível iniciar o aplicativo");
                ui.add_space(15.0);
                ui.colored_label(colors::ERROR, &self.error);
                ui.add_space(25.0);

                if ui.button(format!("{ARROWS_CLOCKWISE} Tentar novamente")).clicked() {
                    self.retry.store(true, Ordering::SeqCst);
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                ui.add_space(8.0);
                if ui.button("Fechar").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }
}

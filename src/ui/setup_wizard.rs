//! First-run setup wizard for configuration.

use std::path::PathBuf;
use std::sync::mpsc;

use eframe::egui::{self, RichText};

use crate::config::AppConfig;
use crate::db::connection::test_connection;

use super::components::colors;

/// Connection test state.
#[derive(Default, Clone)]
pub enum ConnectionTestState {
    #[default]
    NotTested,
    Testing,
    Success,
    Failed(String),
}

/// Setup wizard state.
pub struct SetupWizard {
    /// Current step (0-3).
    pub current_step: usize,
    /// Configuration being built.
    pub config: AppConfig,
    /// Backend connection test state.
    pub backend_test_state: ConnectionTestState,
    /// Wizard completed flag.
    pub completed: bool,
    /// Timeout input as string for text editing.
    timeout_input: String,
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupWizard {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Start from existing values, e.g. a config that failed validation.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            current_step: 0,
            timeout_input: config.backend.timeout_secs.to_string(),
            config,
            backend_test_state: ConnectionTestState::NotTested,
            completed: false,
        }
    }

    /// Check if user can proceed to next step.
    pub fn can_proceed(&self) -> bool {
        match self.current_step {
            0 => true, // Welcome - always can proceed
            1 => matches!(self.backend_test_state, ConnectionTestState::Success),
            2 => self.config.validate().is_ok(),
            3 => true, // Confirmation
            _ => false,
        }
    }

    /// Get step title.
    fn step_title(&self) -> &'static str {
        match self.current_step {
            0 => "Bem-vindo",
            1 => "Servidor",
            2 => "Câmera e relatórios",
            3 => "Confirmação",
            _ => "Configuração",
        }
    }

    /// Any edit to the backend fields invalidates the last test.
    fn backend_changed(&mut self) {
        self.backend_test_state = ConnectionTestState::NotTested;
    }

    /// Total number of steps.
    const TOTAL_STEPS: usize = 4;
}

/// Setup wizard application.
pub struct SetupApp {
    pub wizard: SetupWizard,
    pub initial_error: Option<String>,
    pub rt: tokio::runtime::Runtime,
    config_path: PathBuf,
    backend_test_rx: Option<mpsc::Receiver<Result<(), String>>>,
}

impl SetupApp {
    pub fn new(
        wizard: SetupWizard,
        initial_error: Option<String>,
        config_path: PathBuf,
        rt: tokio::runtime::Runtime,
    ) -> Self {
        Self {
            wizard,
            initial_error,
            rt,
            config_path,
            backend_test_rx: None,
        }
    }

    /// Test backend connection asynchronously.
    fn start_backend_test(&mut self) {
        self.wizard.config.backend.normalize();
        if let Err(e) = self.wizard.config.backend.validate() {
            self.wizard.backend_test_state = ConnectionTestState::Failed(e.to_string());
            return;
        }

        let backend = self.wizard.config.backend.clone();
        let (tx, rx) = mpsc::channel();
        self.backend_test_rx = Some(rx);
        self.wizard.backend_test_state = ConnectionTestState::Testing;

        self.rt.spawn(async move {
            let result = test_connection(&backend).await.map_err(|e| e.user_message());
            let _ = tx.send(result);
        });
    }

    /// Check for async test results.
    fn poll_test_results(&mut self) {
        if let Some(rx) = &self.backend_test_rx
            && let Ok(result) = rx.try_recv()
        {
            self.wizard.backend_test_state = match result {
                Ok(()) => {
                    tracing::info!("Backend reachable at {}", self.wizard.config.backend.url);
                    ConnectionTestState::Success
                }
                Err(e) => {
                    tracing::warn!("Backend test failed: {e}");
                    ConnectionTestState::Failed(e)
                }
            };
            self.backend_test_rx = None;
        }
    }
}

impl eframe::App for SetupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll async test results
        self.poll_test_results();

        // Request repaint while testing
        if matches!(self.wizard.backend_test_state, ConnectionTestState::Testing) {
            ctx.request_repaint();
        }

        // Show initial error dialog
        if let Some(err) = self.initial_error.clone() {
            egui::Window::new("Erro de configuração")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.colored_label(colors::ERROR, &err);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.initial_error = None;
                    }
                });
            return;
        }

        // Main wizard panel
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(20.0);

                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("Configuração - Portaria Obras").size(24.0).strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(format!(
                            "Passo {} de {}",
                            self.wizard.current_step + 1,
                            SetupWizard::TOTAL_STEPS
                        ));
                    });
                });

                ui.separator();
                ui.add_space(10.0);

                // Step title
                ui.heading(self.wizard.step_title());
                ui.add_space(20.0);

                // Step content
                let needs_backend_test = match self.wizard.current_step {
                    0 => {
                        show_welcome_step(ui);
                        false
                    }
                    1 => show_backend_step(ui, &mut self.wizard),
                    2 => {
                        show_camera_step(ui, &mut self.wizard);
                        false
                    }
                    3 => {
                        show_confirmation_step(ui, &self.wizard, &self.config_path);
                        false
                    }
                    _ => false,
                };

                if needs_backend_test {
                    self.start_backend_test();
                }

                ui.add_space(30.0);
                ui.separator();

                // Navigation buttons
                ui.horizontal(|ui| {
                    if self.wizard.current_step > 0 && ui.button("< Voltar").clicked() {
                        self.wizard.current_step -= 1;
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.wizard.current_step < SetupWizard::TOTAL_STEPS - 1 {
                            let btn_text = if self.wizard.current_step == 0 {
                                "Começar >"
                            } else {
                                "Próximo >"
                            };
                            let enabled = self.wizard.can_proceed();
                            if ui.add_enabled(enabled, egui::Button::new(btn_text)).clicked() {
                                self.wizard.current_step += 1;
                            }
                        } else if ui.button("Salvar e sair").clicked() {
                            self.wizard.completed = true;
                        }
                    });
                });
            });
        });

        // Handle completion
        if self.wizard.completed {
            match self.wizard.config.save(&self.config_path) {
                Ok(()) => {
                    tracing::info!("Config saved to {}", self.config_path.display());
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                Err(e) => {
                    tracing::error!("Failed to save config: {e}");
                    self.initial_error = Some(format!("Falha ao salvar a configuração: {e}"));
                    self.wizard.completed = false;
                }
            }
        }
    }
}

fn show_welcome_step(ui: &mut egui::Ui) {
    ui.label("Bem-vindo ao Portaria Obras!");
    ui.add_space(10.0);
    ui.label("Este assistente configura o aplicativo da portaria.");
    ui.add_space(20.0);
    ui.label("Você vai precisar de:");
    ui.add_space(5.0);
    ui.label("  - Endereço do projeto no servidor (https://...supabase.co)");
    ui.label("  - Chave pública (anon key) do projeto");
    ui.label("  - Uma câmera conectada (opcional: fotos também podem vir de arquivos)");
}

fn show_backend_step(ui: &mut egui::Ui, wizard: &mut SetupWizard) -> bool {
    let mut needs_test = false;

    egui::Grid::new("backend_grid")
        .num_columns(2)
        .spacing([20.0, 8.0])
        .striped(true)
        .show(ui, |ui| {
            ui.label("Endereço:");
            if ui
                .add(
                    egui::TextEdit::singleline(&mut wizard.config.backend.url)
                        .hint_text("https://projeto.supabase.co")
                        .desired_width(320.0),
                )
                .changed()
            {
                wizard.backend_changed();
            }
            ui.end_row();

            ui.label("Chave pública:");
            if ui
                .add(
                    egui::TextEdit::singleline(&mut wizard.config.backend.anon_key)
                        .password(true)
                        .desired_width(320.0),
                )
                .changed()
            {
                wizard.backend_changed();
            }
            ui.end_row();

            ui.label("Tempo limite (s):");
            if ui.text_edit_singleline(&mut wizard.timeout_input).changed() {
                if let Ok(t) = wizard.timeout_input.trim().parse() {
                    wizard.config.backend.timeout_secs = t;
                }
                wizard.backend_changed();
            }
            ui.end_row();
        });

    ui.add_space(20.0);

    ui.horizontal(|ui| {
        let testing = matches!(wizard.backend_test_state, ConnectionTestState::Testing);
        if ui.add_enabled(!testing, egui::Button::new("Testar conexão")).clicked() {
            needs_test = true;
        }

        ui.add_space(10.0);

        match &wizard.backend_test_state {
            ConnectionTestState::NotTested => {
                ui.label("Não testado");
            }
            ConnectionTestState::Testing => {
                ui.spinner();
                ui.label("Testando...");
            }
            ConnectionTestState::Success => {
                ui.colored_label(colors::SUCCESS, "Conexão bem-sucedida!");
            }
            ConnectionTestState::Failed(e) => {
                ui.colored_label(colors::ERROR, format!("Falhou: {e}"));
            }
        }
    });

    needs_test
}

fn show_camera_step(ui: &mut egui::Ui, wizard: &mut SetupWizard) {
    ui.label("Resolução solicitada à câmera e qualidade das fotos.");
    ui.label(RichText::new("Os valores padrão servem para a maioria das câmeras.").italics());
    ui.add_space(10.0);

    let camera = &mut wizard.config.camera;

    egui::Grid::new("camera_grid")
        .num_columns(2)
        .spacing([20.0, 8.0])
        .striped(true)
        .show(ui, |ui| {
            ui.label("Resolução preferida:");
            ui.horizontal(|ui| {
                ui.add(egui::DragValue::new(&mut camera.preferred_width).range(320..=7680));
                ui.label("x");
                ui.add(egui::DragValue::new(&mut camera.preferred_height).range(240..=4320));
            });
            ui.end_row();

            ui.label("Resolução mínima:");
            ui.horizontal(|ui| {
                ui.add(egui::DragValue::new(&mut camera.min_width).range(320..=7680));
                ui.label("x");
                ui.add(egui::DragValue::new(&mut camera.min_height).range(240..=4320));
            });
            ui.end_row();

            ui.label("Câmera traseira:");
            ui.checkbox(&mut camera.rear_facing, "Preferir câmera traseira");
            ui.end_row();

            ui.label("Dispositivo:");
            ui.add(egui::DragValue::new(&mut camera.device_index).range(0..=9));
            ui.end_row();

            ui.label("Qualidade JPEG:");
            ui.add(egui::Slider::new(&mut camera.jpeg_quality, 1..=100));
            ui.end_row();
        });

    ui.add_space(15.0);

    egui::Grid::new("prefs_grid")
        .num_columns(2)
        .spacing([20.0, 8.0])
        .striped(true)
        .show(ui, |ui| {
            ui.label("Pasta dos relatórios:");
            ui.horizontal(|ui| {
                let dir = wizard
                    .config
                    .export
                    .directory
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "Perguntar sempre".to_string());
                ui.label(dir);
                if ui.button("Escolher...").clicked()
                    && let Some(folder) = rfd::FileDialog::new().pick_folder()
                {
                    wizard.config.export.directory = Some(folder);
                }
                if wizard.config.export.directory.is_some() && ui.button("Limpar").clicked() {
                    wizard.config.export.directory = None;
                }
            });
            ui.end_row();

            ui.label("Sessão:");
            ui.checkbox(&mut wizard.config.ui.remember_session, "Manter conectado entre execuções");
            ui.end_row();

            ui.label("Avisos (s):");
            ui.add(egui::DragValue::new(&mut wizard.config.ui.toast_secs).range(1..=30));
            ui.end_row();
        });

    // Validation feedback
    if let Err(e) = wizard.config.validate() {
        ui.add_space(10.0);
        ui.colored_label(colors::ERROR, e.to_string());
    }
}

fn show_confirmation_step(ui: &mut egui::Ui, wizard: &SetupWizard, config_path: &std::path::Path) {
    ui.label("Revise a configuração:");
    ui.add_space(10.0);

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.heading("Servidor");
        ui.label(format!("  {}", wizard.config.backend.url));
        ui.label(format!("  Tempo limite: {}s", wizard.config.backend.timeout_secs));
    });

    ui.add_space(10.0);

    let camera = &wizard.config.camera;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.heading("Câmera");
        ui.label(format!(
            "  {}x{} (mínimo {}x{}), {}",
            camera.preferred_width,
            camera.preferred_height,
            camera.min_width,
            camera.min_height,
            if camera.rear_facing { "traseira" } else { "frontal" }
        ));
        ui.label(format!("  Qualidade JPEG: {}", camera.jpeg_quality));
    });

    ui.add_space(10.0);

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.heading("Preferências");
        ui.label(format!(
            "  Manter conectado: {}",
            if wizard.config.ui.remember_session { "Sim" } else { "Não" }
        ));
        if let Some(dir) = &wizard.config.export.directory {
            ui.label(format!("  Relatórios em: {}", dir.display()));
        }
    });

    ui.add_space(20.0);
    ui.label(format!("O arquivo será salvo em {}.", config_path.display()));
    ui.label("O aplicativo abre em seguida com a nova configuração.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_step_requires_successful_test() {
        let mut wizard = SetupWizard::new();
        wizard.current_step = 1;
        assert!(!wizard.can_proceed());

        wizard.backend_test_state = ConnectionTestState::Success;
        assert!(wizard.can_proceed());

        wizard.backend_changed();
        assert!(!wizard.can_proceed());
    }

    #[test]
    fn test_camera_step_checks_whole_config() {
        let mut wizard = SetupWizard::new();
        wizard.config.backend.url = "https://obra.supabase.co".to_string();
        wizard.config.backend.anon_key = "anon".to_string();
        wizard.current_step = 2;
        assert!(wizard.can_proceed());

        wizard.config.camera.min_width = wizard.config.camera.preferred_width + 1;
        assert!(!wizard.can_proceed());
    }
}

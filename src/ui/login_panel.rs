//! Sign-in / sign-up screen.

use eframe::egui::{Key, RichText, TextEdit, Ui};
use egui_phosphor::regular::{BUILDINGS, SIGN_IN, USER_PLUS};

use crate::forms::LoginMode;

use super::app::App;
use super::components::{card_frame, colors, primary_button_with_icon};

pub fn show(app: &mut App, ui: &mut Ui) {
    ui.vertical_centered(|ui| {
        ui.add_space((ui.available_height() * 0.15).max(20.0));

        ui.label(RichText::new(BUILDINGS).size(48.0).color(colors::ACCENT));
        ui.label(RichText::new("Portaria Obras").size(30.0).strong());
        ui.label(RichText::new("Controle de acesso de canteiro").weak());
        ui.add_space(25.0);

        if app.restoring {
            ui.spinner();
            ui.label("Restaurando sessão...");
            return;
        }

        card_frame(ui).show(ui, |ui| {
            ui.set_width(340.0);

            let title = match app.login.mode {
                LoginMode::SignIn => "Entrar",
                LoginMode::SignUp => "Criar conta",
            };
            ui.label(RichText::new(title).size(18.0).strong());
            ui.add_space(12.0);

            let submitting = app.login.guard.is_submitting();

            ui.add_enabled_ui(!submitting, |ui| {
                ui.label("E-mail");
                ui.add(
                    TextEdit::singleline(&mut app.login.email)
                        .hint_text("nome@empresa.com.br")
                        .desired_width(f32::INFINITY),
                );
                ui.add_space(8.0);

                ui.label("Senha");
                let password = ui.add(
                    TextEdit::singleline(&mut app.login.password)
                        .password(true)
                        .desired_width(f32::INFINITY),
                );
                let enter = password.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));

                ui.add_space(12.0);

                if let Some(error) = &app.login_error {
                    ui.colored_label(colors::ERROR, error);
                    ui.add_space(6.0);
                }
                if let Some(notice) = &app.login_notice {
                    ui.colored_label(colors::SUCCESS, notice);
                    ui.add_space(6.0);
                }

                let (icon, label) = match app.login.mode {
                    LoginMode::SignIn => (SIGN_IN, "Entrar"),
                    LoginMode::SignUp => (USER_PLUS, "Cadastrar"),
                };
                let clicked = primary_button_with_icon(ui, icon, label, !submitting).clicked();
                if clicked || enter {
                    app.submit_login();
                }

                ui.add_space(8.0);

                let toggle = match app.login.mode {
                    LoginMode::SignIn => "Não tem conta? Cadastre-se",
                    LoginMode::SignUp => "Já tem conta? Entrar",
                };
                if ui.link(toggle).clicked() {
                    app.login.toggle_mode();
                    app.login_error = None;
                }
            });

            if submitting {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Aguarde...");
                });
            }
        });

        ui.add_space(10.0);
        ui.label(RichText::new(app.client.base_url()).small().weak());
    });
}

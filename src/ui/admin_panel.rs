//! Administration: sites and user roles.

use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_phosphor::regular::{ARROWS_CLOCKWISE, FLOPPY_DISK, PLUS};

use crate::models::{Profile, Role};

use super::app::App;
use super::components::{
    card_frame, chip, colors, empty_hint, panel_header, primary_button_with_icon, stat_card, styled_button_with_icon,
};

pub fn show(app: &mut App, ui: &mut Ui) {
    panel_header(ui, "Administração");

    // Table counts
    ui.horizontal(|ui| {
        let counts = app.table_counts.clone().unwrap_or_default();
        stat_card(ui, "Obras", &counts.works.to_string(), "Cadastradas");
        stat_card(ui, "Visitantes", &counts.visitors.to_string(), "Registros totais");
        stat_card(ui, "Entregas", &counts.deliveries.to_string(), "Registros totais");

        if styled_button_with_icon(ui, ARROWS_CLOCKWISE, "Atualizar").clicked() {
            app.load_works();
            app.load_profiles();
            app.load_table_counts();
        }
    });

    ui.add_space(15.0);

    ScrollArea::vertical().id_salt("admin_scroll").show(ui, |ui| {
        show_works(app, ui);
        ui.add_space(15.0);
        show_profiles(app, ui);
    });
}

fn show_works(app: &mut App, ui: &mut Ui) {
    card_frame(ui).show(ui, |ui| {
        ui.label(RichText::new("Obras").strong());
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            ui.label("Nome *");
            ui.add(egui::TextEdit::singleline(&mut app.admin.work_name).desired_width(220.0));
            ui.label("Endereço");
            ui.add(egui::TextEdit::singleline(&mut app.admin.work_address).desired_width(280.0));

            let ready = !app.admin.work_name.trim().is_empty();
            if primary_button_with_icon(ui, PLUS, "Cadastrar obra", ready).clicked() {
                app.create_work();
            }
        });

        ui.add_space(10.0);

        if app.works.is_empty() {
            empty_hint(ui, "Nenhuma obra cadastrada.");
            return;
        }

        egui::Grid::new("works_grid")
            .num_columns(4)
            .striped(true)
            .min_col_width(60.0)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.strong("ID");
                ui.strong("Nome");
                ui.strong("Endereço");
                ui.strong("Situação");
                ui.end_row();

                for work in &app.works {
                    ui.label(work.id.to_string());
                    ui.label(&work.name);
                    ui.label(if work.address.is_empty() { "-" } else { work.address.as_str() });
                    if work.active {
                        chip(ui, "Ativa", colors::SUCCESS);
                    } else {
                        chip(ui, "Inativa", colors::NEUTRAL);
                    }
                    ui.end_row();
                }
            });
    });
}

fn show_profiles(app: &mut App, ui: &mut Ui) {
    card_frame(ui).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Usuários").strong());
            ui.add_space(20.0);
            ui.add(
                egui::TextEdit::singleline(&mut app.admin.profile_search)
                    .hint_text("Buscar por nome")
                    .desired_width(220.0),
            );
        });
        ui.add_space(10.0);

        let search = app.admin.profile_search.trim().to_lowercase();
        let profiles: Vec<Profile> = app
            .profiles
            .iter()
            .filter(|p| search.is_empty() || p.display_name().to_lowercase().contains(&search))
            .cloned()
            .collect();

        if profiles.is_empty() {
            empty_hint(ui, "Nenhum usuário encontrado.");
            return;
        }

        let mut to_save = None;

        egui::Grid::new("profiles_grid")
            .num_columns(4)
            .striped(true)
            .min_col_width(80.0)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.strong("Nome");
                ui.strong("Função");
                ui.strong("Obra");
                ui.strong("");
                ui.end_row();

                for profile in &profiles {
                    let (mut role, mut work_id) = app
                        .admin
                        .drafts
                        .get(&profile.id)
                        .copied()
                        .unwrap_or((profile.role, profile.work_id));

                    ui.label(profile.display_name());

                    egui::ComboBox::from_id_salt(("profile_role", profile.id))
                        .width(150.0)
                        .selected_text(role.label())
                        .show_ui(ui, |ui| {
                            for option in Role::ALL {
                                ui.selectable_value(&mut role, option, option.label());
                            }
                        });

                    let site_text = work_id
                        .and_then(|id| app.works.iter().find(|w| w.id == id))
                        .map(|w| w.name.clone())
                        .unwrap_or_else(|| "Nenhuma".to_string());
                    egui::ComboBox::from_id_salt(("profile_site", profile.id))
                        .width(180.0)
                        .selected_text(site_text)
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut work_id, None, "Nenhuma");
                            for work in &app.works {
                                ui.selectable_value(&mut work_id, Some(work.id), &work.name);
                            }
                        });

                    let changed = (role, work_id) != (profile.role, profile.work_id);
                    if changed {
                        app.admin.drafts.insert(profile.id, (role, work_id));
                    } else {
                        app.admin.drafts.remove(&profile.id);
                    }

                    let save = ui.add_enabled(changed, egui::Button::new(format!("{FLOPPY_DISK} Salvar")));
                    if save.clicked() {
                        to_save = Some((profile.id, role, work_id));
                    }
                    ui.end_row();
                }
            });

        if let Some((user_id, role, work_id)) = to_save {
            app.assign_profile(user_id, role, work_id);
        }

        ui.add_space(6.0);
        ui.label(
            RichText::new("Porteiros e gestores sem obra não enxergam nenhum registro.")
                .small()
                .color(colors::WARNING),
        );
    });
}

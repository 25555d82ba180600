//! Visitor entry form.

use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_phosphor::regular::{ERASER, USER_PLUS};

use crate::format::{format_document, format_plate, upper};

use super::app::App;
use super::camera_widget::CameraEvent;
use super::components::{colors, formatted_field, panel_header, primary_button_with_icon, site_selector, styled_button_with_icon};

pub fn show(app: &mut App, ui: &mut Ui) {
    panel_header(ui, "Registrar visitante");

    let is_admin = app.session.as_ref().is_some_and(|s| s.is_admin());

    ScrollArea::vertical().id_salt("visitor_form_scroll").show(ui, |ui| {
        egui::Grid::new("visitor_form_grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let form = &mut app.visitor_form;

                if is_admin {
                    ui.label("Obra *");
                    site_selector(ui, "visitor_site", &app.works, &mut form.work_id);
                    ui.end_row();
                }

                ui.label("Nome completo *");
                formatted_field(ui, &mut form.name, "Nome do visitante", upper);
                ui.end_row();

                ui.label("Documento (RG/CPF) *");
                formatted_field(ui, &mut form.document, "Somente números", format_document);
                ui.end_row();

                ui.label("Empresa/Origem *");
                formatted_field(ui, &mut form.company, "Empresa ou origem", upper);
                ui.end_row();

                ui.label("Motivo da visita *");
                formatted_field(ui, &mut form.visit_reason, "Reunião, vistoria...", upper);
                ui.end_row();

                ui.label("Pessoa visitada *");
                formatted_field(ui, &mut form.person_visited, "Quem recebe o visitante", upper);
                ui.end_row();

                ui.label("EPI *");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut form.epi.helmet, "Capacete");
                    ui.checkbox(&mut form.epi.boots, "Bota");
                    ui.checkbox(&mut form.epi.glasses, "Óculos");
                });
                ui.end_row();
            });

        ui.add_space(12.0);
        ui.label(RichText::new("Veículo (opcional)").strong());
        ui.add_space(6.0);

        egui::Grid::new("visitor_vehicle_grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let vehicle = &mut app.visitor_form.vehicle;

                ui.label("Modelo");
                formatted_field(ui, &mut vehicle.model, "Modelo do veículo", upper);
                ui.end_row();

                ui.label("Cor");
                formatted_field(ui, &mut vehicle.color, "Cor", upper);
                ui.end_row();

                ui.label("Placa");
                formatted_field(ui, &mut vehicle.plate, "ABC1D23", format_plate);
                ui.end_row();
            });

        ui.add_space(12.0);

        ui.horizontal_top(|ui| {
            match app.visitor_photo.show(ui) {
                Some(CameraEvent::Captured(photo)) => app.visitor_form.photo = Some(photo),
                Some(CameraEvent::Cleared) => app.visitor_form.photo = None,
                None => {}
            }
            ui.add_space(24.0);
            match app.visitor_plate_photo.show(ui) {
                Some(CameraEvent::Captured(photo)) => app.visitor_form.plate_photo = Some(photo),
                Some(CameraEvent::Cleared) => app.visitor_form.plate_photo = None,
                None => {}
            }
        });

        ui.add_space(16.0);

        if let Some(error) = &app.visitor_error {
            ui.colored_label(colors::ERROR, error);
            ui.add_space(8.0);
        }

        let submitting = app.visitor_form.guard.is_submitting();
        ui.horizontal(|ui| {
            let label = if submitting { "Registrando..." } else { "Registrar entrada" };
            if primary_button_with_icon(ui, USER_PLUS, label, !submitting).clicked() {
                app.submit_visitor();
            }
            ui.add_space(8.0);
            if ui
                .add_enabled_ui(!submitting, |ui| styled_button_with_icon(ui, ERASER, "Limpar"))
                .inner
                .clicked()
            {
                app.clear_visitor_form();
            }
            if submitting {
                ui.spinner();
            }
        });
    });
}

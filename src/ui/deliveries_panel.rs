//! Delivery entry form.

use eframe::egui::{self, ScrollArea, Ui};
use egui_phosphor::regular::{ERASER, TRUCK};

use crate::format::{format_document, format_plate, upper};

use super::app::App;
use super::camera_widget::CameraEvent;
use super::components::{colors, formatted_field, panel_header, primary_button_with_icon, site_selector, styled_button_with_icon};

pub fn show(app: &mut App, ui: &mut Ui) {
    panel_header(ui, "Registrar entrega");

    let is_admin = app.session.as_ref().is_some_and(|s| s.is_admin());

    ScrollArea::vertical().id_salt("delivery_form_scroll").show(ui, |ui| {
        egui::Grid::new("delivery_form_grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let form = &mut app.delivery_form;

                if is_admin {
                    ui.label("Obra *");
                    site_selector(ui, "delivery_site", &app.works, &mut form.work_id);
                    ui.end_row();
                }

                ui.label("Fornecedor *");
                formatted_field(ui, &mut form.supplier, "Empresa fornecedora", upper);
                ui.end_row();

                ui.label("Motorista *");
                formatted_field(ui, &mut form.driver_name, "Nome do motorista", upper);
                ui.end_row();

                ui.label("Documento do motorista *");
                formatted_field(ui, &mut form.driver_document, "Somente números", format_document);
                ui.end_row();

                ui.label("Nº da nota fiscal *");
                formatted_field(ui, &mut form.invoice_number, "Número da NF", upper);
                ui.end_row();

                ui.label("Placa *");
                formatted_field(ui, &mut form.license_plate, "ABC1D23", format_plate);
                ui.end_row();
            });

        ui.add_space(12.0);

        ui.horizontal_top(|ui| {
            match app.delivery_invoice_photo.show(ui) {
                Some(CameraEvent::Captured(photo)) => app.delivery_form.invoice_photo = Some(photo),
                Some(CameraEvent::Cleared) => app.delivery_form.invoice_photo = None,
                None => {}
            }
            ui.add_space(24.0);
            match app.delivery_plate_photo.show(ui) {
                Some(CameraEvent::Captured(photo)) => app.delivery_form.plate_photo = Some(photo),
                Some(CameraEvent::Cleared) => app.delivery_form.plate_photo = None,
                None => {}
            }
        });

        ui.add_space(16.0);

        if let Some(error) = &app.delivery_error {
            ui.colored_label(colors::ERROR, error);
            ui.add_space(8.0);
        }

        let submitting = app.delivery_form.guard.is_submitting();
        ui.horizontal(|ui| {
            let label = if submitting { "Registrando..." } else { "Registrar entrega" };
            if primary_button_with_icon(ui, TRUCK, label, !submitting).clicked() {
                app.submit_delivery();
            }
            ui.add_space(8.0);
            if ui
                .add_enabled_ui(!submitting, |ui| styled_button_with_icon(ui, ERASER, "Limpar"))
                .inner
                .clicked()
            {
                app.clear_delivery_form();
            }
            if submitting {
                ui.spinner();
            }
        });
    });
}

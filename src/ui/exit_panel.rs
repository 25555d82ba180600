//! Exit registration: search everyone still on site and close their entry.

use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_phosphor::regular::{ARROWS_CLOCKWISE, MAGNIFYING_GLASS, SIGN_OUT};

use crate::format::local_datetime;
use crate::models::{GateRecord, RecordKind};

use super::app::App;
use super::components::{danger_action_button, empty_hint, epi_chips, panel_header};

pub fn show(app: &mut App, ui: &mut Ui) {
    panel_header(ui, "Registrar saída");

    // Toolbar
    ui.horizontal(|ui| {
        for kind in [RecordKind::Visitor, RecordKind::Delivery] {
            let count = match kind {
                RecordKind::Visitor => app.dashboard.active_visitors.len(),
                RecordKind::Delivery => app.dashboard.active_deliveries.len(),
            };
            if ui
                .selectable_label(app.exit_view.kind == kind, format!("{} ({count})", kind.label()))
                .clicked()
            {
                app.exit_view.kind = kind;
            }
        }

        ui.separator();
        ui.label(MAGNIFYING_GLASS);
        ui.add(
            egui::TextEdit::singleline(&mut app.exit_view.search)
                .hint_text("Nome, documento, empresa ou placa")
                .desired_width(260.0),
        );

        if ui.button(format!("{ARROWS_CLOCKWISE} Atualizar")).clicked() {
            app.load_dashboard();
        }
    });

    ui.add_space(10.0);

    let search = app.exit_view.search.clone();

    ScrollArea::vertical().id_salt("exit_scroll").show(ui, |ui| match app.exit_view.kind {
        RecordKind::Visitor => {
            let visitors: Vec<_> = app
                .dashboard
                .active_visitors
                .iter()
                .filter(|v| v.matches_search(&search))
                .cloned()
                .collect();
            if visitors.is_empty() {
                empty_hint(ui, "Nenhum visitante na obra.");
                return;
            }

            egui::Grid::new("exit_visitors_grid")
                .num_columns(6)
                .striped(true)
                .min_col_width(60.0)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Nome").strong());
                    ui.label(RichText::new("Documento").strong());
                    ui.label(RichText::new("Empresa").strong());
                    ui.label(RichText::new("Entrada").strong());
                    ui.label(RichText::new("EPI").strong());
                    ui.label("");
                    ui.end_row();

                    for visitor in &visitors {
                        ui.label(&visitor.name);
                        ui.label(&visitor.document);
                        ui.label(&visitor.company);
                        ui.label(local_datetime(&visitor.entry_time));
                        epi_chips(ui, &visitor.epi);
                        if danger_action_button(ui, SIGN_OUT, "Registrar saída").clicked() {
                            app.request_exit(RecordKind::Visitor, visitor);
                        }
                        ui.end_row();
                    }
                });
        }
        RecordKind::Delivery => {
            let deliveries: Vec<_> = app
                .dashboard
                .active_deliveries
                .iter()
                .filter(|d| d.matches_search(&search))
                .cloned()
                .collect();
            if deliveries.is_empty() {
                empty_hint(ui, "Nenhuma entrega na obra.");
                return;
            }

            egui::Grid::new("exit_deliveries_grid")
                .num_columns(6)
                .striped(true)
                .min_col_width(60.0)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Fornecedor").strong());
                    ui.label(RichText::new("Motorista").strong());
                    ui.label(RichText::new("NF").strong());
                    ui.label(RichText::new("Placa").strong());
                    ui.label(RichText::new("Entrada").strong());
                    ui.label("");
                    ui.end_row();

                    for delivery in &deliveries {
                        ui.label(&delivery.supplier);
                        ui.label(&delivery.driver_name);
                        ui.label(&delivery.invoice_number);
                        ui.label(&delivery.license_plate);
                        ui.label(local_datetime(&delivery.entry_time));
                        if danger_action_button(ui, SIGN_OUT, "Registrar saída").clicked() {
                            app.request_exit(RecordKind::Delivery, delivery);
                        }
                        ui.end_row();
                    }
                });
        }
    });
}

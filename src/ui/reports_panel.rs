//! Reports panel with filters, evidence photos, record edits and CSV/Excel export.

use chrono::{Datelike, Duration, Local, NaiveDate};
use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use egui_phosphor::regular::{ARROWS_CLOCKWISE, ERASER, FILE_CSV, FILE_XLS, IMAGE, MAGNIFYING_GLASS, PENCIL_SIMPLE};

use crate::export::ExportFormat;
use crate::format::{format_document, format_plate, local_datetime, upper};
use crate::models::{Delivery, GateRecord, RecordKind, Visitor};
use crate::reports::{RecordFilter, StatusFilter};

use super::app::{App, EditTarget};
use super::components::{
    action_button, colors, empty_hint, epi_chips, formatted_field, panel_header, status_badge, styled_button,
    styled_button_with_icon,
};

/// Show the reports panel.
pub fn show(app: &mut App, ui: &mut Ui) {
    panel_header(ui, "Relatórios");

    // Record kind toggle
    ui.horizontal(|ui| {
        for kind in [RecordKind::Visitor, RecordKind::Delivery] {
            if ui.selectable_label(app.reports.kind == kind, kind.label()).clicked() {
                app.reports.kind = kind;
            }
        }

        ui.separator();
        ui.label(MAGNIFYING_GLASS);
        ui.add(
            egui::TextEdit::singleline(&mut app.reports.filter.search)
                .hint_text("Buscar por nome, documento, empresa, NF ou placa")
                .desired_width(300.0),
        );

        ui.label("Status:");
        egui::ComboBox::from_id_salt("report_status_filter")
            .width(140.0)
            .selected_text(app.reports.filter.status.label())
            .show_ui(ui, |ui| {
                for status in StatusFilter::ALL {
                    ui.selectable_value(&mut app.reports.filter.status, status, status.label());
                }
            });
    });

    ui.add_space(8.0);

    // Date range filters
    ui.horizontal(|ui| {
        date_filter(ui, "De", "report_start_date", &mut app.reports.filter.start_date);
        ui.add_space(10.0);
        date_filter(ui, "Até", "report_end_date", &mut app.reports.filter.end_date);

        ui.add_space(20.0);

        // Quick date buttons
        let today = Local::now().date_naive();
        if styled_button(ui, "Hoje").clicked() {
            set_range(&mut app.reports.filter, today, today);
        }
        if styled_button(ui, "Últimos 7 dias").clicked() {
            set_range(&mut app.reports.filter, today - Duration::days(6), today);
        }
        if styled_button(ui, "Este mês").clicked() {
            set_range(&mut app.reports.filter, today.with_day(1).unwrap_or(today), today);
        }

        ui.add_enabled_ui(!app.reports.filter.is_empty(), |ui| {
            if styled_button_with_icon(ui, ERASER, "Limpar filtros").clicked() {
                app.reports.filter = RecordFilter::default();
            }
        });
    });

    ui.add_space(8.0);

    // Export buttons and record count
    ui.horizontal(|ui| {
        if styled_button_with_icon(ui, FILE_CSV, "Exportar CSV").clicked() {
            app.export_report(ExportFormat::Csv);
        }
        ui.add_space(10.0);
        if styled_button_with_icon(ui, FILE_XLS, "Exportar Excel").clicked() {
            app.export_report(ExportFormat::Excel);
        }
        ui.add_space(10.0);
        if styled_button_with_icon(ui, ARROWS_CLOCKWISE, "Atualizar").clicked() {
            app.load_records();
        }

        ui.add_space(20.0);

        let (shown, total) = match app.reports.kind {
            RecordKind::Visitor => (app.reports.filter.apply(&app.visitors).len(), app.visitors.len()),
            RecordKind::Delivery => (app.reports.filter.apply(&app.deliveries).len(), app.deliveries.len()),
        };
        ui.label(format!("{shown} de {total} registros"));
        ui.label(RichText::new("A exportação inclui todos os registros carregados.").small().weak());
    });

    ui.add_space(10.0);
    ui.separator();
    ui.add_space(10.0);

    // Results table
    match app.reports.kind {
        RecordKind::Visitor => show_visitor_table(app, ui),
        RecordKind::Delivery => show_delivery_table(app, ui),
    }

    show_photo_modal(app, ui.ctx());
    show_edit_dialog(app, ui.ctx());
}

/// Optional date bound: a checkbox enables the picker.
fn date_filter(ui: &mut Ui, label: &str, id: &str, value: &mut Option<NaiveDate>) {
    let mut enabled = value.is_some();
    if ui.checkbox(&mut enabled, label).changed() {
        *value = enabled.then(|| Local::now().date_naive());
    }
    if let Some(date) = value {
        ui.add(DatePickerButton::new(date).id_salt(id).format("%d/%m/%Y"));
    }
}

fn set_range(filter: &mut RecordFilter, start: NaiveDate, end: NaiveDate) {
    filter.start_date = Some(start);
    filter.end_date = Some(end);
}

fn show_visitor_table(app: &mut App, ui: &mut Ui) {
    let rows: Vec<Visitor> = app.reports.filter.apply(&app.visitors).into_iter().cloned().collect();
    if rows.is_empty() {
        empty_hint(ui, "Nenhum visitante encontrado.");
        return;
    }

    ScrollArea::both().id_salt("report_visitors_scroll").show(ui, |ui| {
        egui::Grid::new("report_visitors_grid")
            .num_columns(10)
            .striped(true)
            .min_col_width(60.0)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                // Header
                ui.strong("Nome");
                ui.strong("Documento");
                ui.strong("Empresa");
                ui.strong("Motivo");
                ui.strong("Visitado");
                ui.strong("EPI");
                ui.strong("Entrada");
                ui.strong("Saída");
                ui.strong("Status");
                ui.strong("");
                ui.end_row();

                for visitor in &rows {
                    ui.label(&visitor.name);
                    ui.label(&visitor.document);
                    ui.label(&visitor.company);
                    ui.label(&visitor.visit_reason);
                    ui.label(&visitor.person_visited);
                    epi_chips(ui, &visitor.epi);
                    ui.label(local_datetime(&visitor.entry_time));
                    ui.label(visitor.exit_time.as_ref().map(local_datetime).unwrap_or_else(|| "-".to_string()));
                    status_badge(ui, visitor.is_active());

                    ui.horizontal(|ui| {
                        if action_button(ui, IMAGE, "Ver fotos").clicked() {
                            app.open_photos(RecordKind::Visitor, visitor.id, visitor.name.clone());
                        }
                        if action_button(ui, PENCIL_SIMPLE, "Editar").clicked() {
                            app.edit_visitor(visitor);
                        }
                    });
                    ui.end_row();
                }
            });
    });
}

fn show_delivery_table(app: &mut App, ui: &mut Ui) {
    let rows: Vec<Delivery> = app.reports.filter.apply(&app.deliveries).into_iter().cloned().collect();
    if rows.is_empty() {
        empty_hint(ui, "Nenhuma entrega encontrada.");
        return;
    }

    ScrollArea::both().id_salt("report_deliveries_scroll").show(ui, |ui| {
        egui::Grid::new("report_deliveries_grid")
            .num_columns(9)
            .striped(true)
            .min_col_width(60.0)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                // Header
                ui.strong("Fornecedor");
                ui.strong("Motorista");
                ui.strong("Documento");
                ui.strong("NF");
                ui.strong("Placa");
                ui.strong("Entrada");
                ui.strong("Saída");
                ui.strong("Status");
                ui.strong("");
                ui.end_row();

                for delivery in &rows {
                    ui.label(&delivery.supplier);
                    ui.label(&delivery.driver_name);
                    ui.label(&delivery.driver_document);
                    ui.label(&delivery.invoice_number);
                    ui.label(&delivery.license_plate);
                    ui.label(local_datetime(&delivery.entry_time));
                    ui.label(delivery.exit_time.as_ref().map(local_datetime).unwrap_or_else(|| "-".to_string()));
                    status_badge(ui, delivery.is_active());

                    ui.horizontal(|ui| {
                        if action_button(ui, IMAGE, "Ver fotos").clicked() {
                            app.open_photos(RecordKind::Delivery, delivery.id, delivery.display_name().to_string());
                        }
                        if action_button(ui, PENCIL_SIMPLE, "Editar").clicked() {
                            app.edit_delivery(delivery);
                        }
                    });
                    ui.end_row();
                }
            });
    });
}

fn show_photo_modal(app: &mut App, ctx: &egui::Context) {
    let Some(modal) = &app.reports.photo_modal else {
        return;
    };

    let mut open = true;
    egui::Window::new(format!("Fotos: {}", modal.title))
        .collapsible(false)
        .resizable(true)
        .default_width(700.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .open(&mut open)
        .show(ctx, |ui| match &modal.photos {
            None => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Carregando fotos...");
                });
            }
            Some(photos) => {
                ui.horizontal_top(|ui| {
                    for (label, texture) in photos {
                        ui.vertical(|ui| {
                            ui.label(RichText::new(*label).strong());
                            match texture {
                                Some(texture) => {
                                    ui.add(
                                        egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                                            .max_width(330.0)
                                            .max_height(400.0)
                                            .corner_radius(egui::CornerRadius::same(4)),
                                    );
                                }
                                None => {
                                    ui.colored_label(colors::NEUTRAL, "Sem foto");
                                }
                            }
                        });
                        ui.add_space(12.0);
                    }
                });
            }
        });

    if !open {
        app.reports.photo_modal = None;
    }
}

fn show_edit_dialog(app: &mut App, ctx: &egui::Context) {
    let Some(target) = &mut app.reports.edit else {
        return;
    };

    let mut save = false;
    let mut cancel = false;

    egui::Window::new("Editar registro")
        .collapsible(false)
        .resizable(false)
        .default_width(450.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.add_space(10.0);

            match target {
                EditTarget::Visitor { edited, .. } => {
                    egui::Grid::new("edit_visitor_grid")
                        .num_columns(2)
                        .spacing([12.0, 8.0])
                        .show(ui, |ui| {
                            ui.label("Nome");
                            formatted_field(ui, &mut edited.name, "", upper);
                            ui.end_row();

                            ui.label("Documento");
                            formatted_field(ui, &mut edited.document, "", format_document);
                            ui.end_row();

                            ui.label("Empresa/Origem");
                            formatted_field(ui, &mut edited.company, "", upper);
                            ui.end_row();

                            ui.label("Motivo da visita");
                            formatted_field(ui, &mut edited.visit_reason, "", upper);
                            ui.end_row();

                            ui.label("Pessoa visitada");
                            formatted_field(ui, &mut edited.person_visited, "", upper);
                            ui.end_row();

                            ui.label("EPI");
                            ui.horizontal(|ui| {
                                ui.checkbox(&mut edited.epi.helmet, "Capacete");
                                ui.checkbox(&mut edited.epi.boots, "Bota");
                                ui.checkbox(&mut edited.epi.glasses, "Óculos");
                            });
                            ui.end_row();

                            ui.label("Veículo");
                            formatted_field(ui, &mut edited.vehicle.model, "", upper);
                            ui.end_row();

                            ui.label("Cor");
                            formatted_field(ui, &mut edited.vehicle.color, "", upper);
                            ui.end_row();

                            ui.label("Placa");
                            formatted_field(ui, &mut edited.vehicle.plate, "", format_plate);
                            ui.end_row();
                        });
                }
                EditTarget::Delivery { edited, .. } => {
                    egui::Grid::new("edit_delivery_grid")
                        .num_columns(2)
                        .spacing([12.0, 8.0])
                        .show(ui, |ui| {
                            ui.label("Fornecedor");
                            formatted_field(ui, &mut edited.supplier, "", upper);
                            ui.end_row();

                            ui.label("Motorista");
                            formatted_field(ui, &mut edited.driver_name, "", upper);
                            ui.end_row();

                            ui.label("Documento");
                            formatted_field(ui, &mut edited.driver_document, "", format_document);
                            ui.end_row();

                            ui.label("Nº da NF");
                            formatted_field(ui, &mut edited.invoice_number, "", upper);
                            ui.end_row();

                            ui.label("Placa");
                            formatted_field(ui, &mut edited.license_plate, "", format_plate);
                            ui.end_row();
                        });
                }
            }

            ui.add_space(8.0);
            ui.label(RichText::new("Horários de entrada e saída não podem ser alterados.").small().weak());
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Salvar").clicked() {
                    save = true;
                }
                if ui.button("Cancelar").clicked() {
                    cancel = true;
                }
            });
        });

    if save {
        app.save_edit();
    } else if cancel {
        app.reports.edit = None;
    }
}

//! Dashboard panel with daily stats, navigation cards, people on site, and activity log.

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_phosphor::regular::{ARROWS_CLOCKWISE, CHART_BAR, GEAR, SIGN_OUT, TRUCK, USER_PLUS};

use crate::format::local_time;
use crate::models::{GateRecord, RecordKind};
use crate::session::Tab;

use super::app::{App, LogLevel};
use super::components::{card_frame, colors, dashboard_card, danger_action_button, empty_hint, stat_card};

/// Show the dashboard panel.
///
/// Returns `Some(tab)` if navigation is requested.
pub fn show(app: &mut App, ui: &mut Ui) -> Option<Tab> {
    let mut next_tab = None;
    let session = app.session.clone()?;
    let stats = app.dashboard.stats.clone();

    ScrollArea::vertical().id_salt("dashboard_scroll").show(ui, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);

            // Header
            ui.label(RichText::new("Portaria Obras").size(32.0).strong());
            ui.add_space(5.0);
            let subtitle = match session.work_id() {
                Some(id) => app.site_name(id),
                None if session.is_admin() => "Todas as obras".to_string(),
                None => "Controle de acesso".to_string(),
            };
            ui.label(RichText::new(subtitle).size(14.0).weak());

            ui.add_space(20.0);

            // Stat cards row
            ui.horizontal(|ui| {
                let available = ui.available_width();
                let start_offset = ((available - 700.0) / 2.0).max(0.0);
                ui.add_space(start_offset);

                stat_card(
                    ui,
                    "Visitantes hoje",
                    &stats.visitors.today_total.to_string(),
                    &format!("{} na obra, {} saíram", stats.visitors.today_active, stats.visitors.today_exited),
                );
                stat_card(
                    ui,
                    "Entregas hoje",
                    &stats.deliveries.today_total.to_string(),
                    &format!("{} na obra, {} saíram", stats.deliveries.today_active, stats.deliveries.today_exited),
                );
                stat_card(
                    ui,
                    "Na obra agora",
                    &(stats.visitors.active_total + stats.deliveries.active_total).to_string(),
                    "Entradas sem saída",
                );
                if ui.button(format!("{ARROWS_CLOCKWISE} Atualizar")).clicked() {
                    app.refresh_all();
                }
            });

            ui.add_space(20.0);

            // Navigation cards for the tabs this role may open
            let cards: Vec<(Tab, &str, &str, &str)> = [
                (Tab::Deliveries, "Entregas", "Registrar chegada", TRUCK),
                (Tab::Visitors, "Visitantes", "Registrar entrada", USER_PLUS),
                (Tab::Exit, "Saída", "Finalizar permanência", SIGN_OUT),
                (Tab::Reports, "Relatórios", "Consultar e exportar", CHART_BAR),
                (Tab::Admin, "Administração", "Obras e perfis", GEAR),
            ]
            .into_iter()
            .filter(|(tab, ..)| session.can_open(*tab))
            .collect();

            if !cards.is_empty() {
                let available = ui.available_width();
                let num_cards = cards.len() as f32;
                let spacing = 24.0;
                let total_spacing = spacing * (num_cards - 1.0);
                let card_width = ((available - total_spacing) / num_cards).clamp(140.0, 220.0);
                let card_size = egui::vec2(card_width, card_width * 0.7);
                let total_width = card_width * num_cards + total_spacing;
                let start_offset = ((available - total_width) / 2.0).max(0.0);

                ui.horizontal(|ui| {
                    ui.add_space(start_offset);
                    for (idx, (tab, title, desc, icon)) in cards.iter().enumerate() {
                        if idx > 0 {
                            ui.add_space(spacing);
                        }
                        if dashboard_card(ui, title, desc, icon, card_size).clicked() {
                            next_tab = Some(*tab);
                        }
                    }
                });
            }

            ui.add_space(20.0);
        });

        // Two-column layout: On site | Recent Activity
        let available_width = ui.available_width();
        let column_width = (available_width - 40.0) / 2.0;
        let can_exit = session.can_open(Tab::Exit);

        ui.horizontal_top(|ui| {
            ui.add_space(10.0);

            // Left column - people and trucks still on site
            ui.vertical(|ui| {
                ui.set_width(column_width);

                card_frame(ui).show(ui, |ui| {
                    ui.set_min_width(column_width - 30.0);

                    ui.label(RichText::new("Na obra agora").strong());
                    ui.add_space(10.0);

                    ScrollArea::vertical().id_salt("on_site").max_height(220.0).show(ui, |ui| {
                        if app.dashboard.active_visitors.is_empty() && app.dashboard.active_deliveries.is_empty() {
                            empty_hint(ui, "Ninguém na obra no momento.");
                            return;
                        }

                        let visitors = app.dashboard.active_visitors.clone();
                        for visitor in &visitors {
                            ui.horizontal(|ui| {
                                ui.label(RichText::new(local_time(&visitor.entry_time)).small().weak());
                                ui.label(&visitor.name);
                                ui.label(RichText::new(&visitor.company).small().weak());
                                if can_exit && danger_action_button(ui, SIGN_OUT, "Saída").clicked() {
                                    app.request_exit(RecordKind::Visitor, visitor);
                                }
                            });
                        }

                        let deliveries = app.dashboard.active_deliveries.clone();
                        for delivery in &deliveries {
                            ui.horizontal(|ui| {
                                ui.label(RichText::new(local_time(&delivery.entry_time)).small().weak());
                                ui.label(format!("{TRUCK} {}", delivery.display_name()));
                                ui.label(RichText::new(&delivery.license_plate).small().weak());
                                if can_exit && danger_action_button(ui, SIGN_OUT, "Saída").clicked() {
                                    app.request_exit(RecordKind::Delivery, delivery);
                                }
                            });
                        }
                    });
                });
            });

            ui.add_space(20.0);

            // Right column - Recent Activity
            ui.vertical(|ui| {
                ui.set_width(column_width);

                card_frame(ui).show(ui, |ui| {
                    ui.set_min_width(column_width - 30.0);

                    ui.label(RichText::new("Atividade recente").strong());
                    ui.add_space(10.0);

                    ScrollArea::vertical().id_salt("activity").max_height(220.0).show(ui, |ui| {
                        if app.log_messages.is_empty() {
                            ui.label(RichText::new("Nenhuma atividade recente").weak());
                        } else {
                            for entry in app.log_messages.iter().rev().take(15) {
                                let color = match entry.level {
                                    LogLevel::Info => Color32::GRAY,
                                    LogLevel::Success => colors::SUCCESS,
                                    LogLevel::Warning => colors::WARNING,
                                    LogLevel::Error => colors::ERROR,
                                };

                                ui.horizontal(|ui| {
                                    ui.label(
                                        RichText::new(entry.timestamp.format("%H:%M:%S").to_string())
                                            .small()
                                            .color(Color32::DARK_GRAY),
                                    );
                                    ui.label(RichText::new(&entry.message).color(color));
                                });
                            }
                        }
                    });
                });
            });
        });
    });

    next_tab
}

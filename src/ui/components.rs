//! Shared UI components.

use eframe::egui::{self, Color32, CornerRadius, Margin, Response, RichText, Sense, StrokeKind, Ui};

use crate::models::{Epi, Work};

/// Render a clickable dashboard card with dynamic size.
///
/// Returns the response which can be checked for `.clicked()`.
pub fn dashboard_card(ui: &mut Ui, title: &str, description: &str, icon: &str, size: egui::Vec2) -> Response {
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());

    if ui.is_rect_visible(rect) {
        let visuals = ui.style().interact(&response);

        // Scale factor based on width (200 is the reference size)
        let scale = size.x / 200.0;

        ui.painter().rect_filled(rect, 8.0, visuals.bg_fill);
        ui.painter()
            .rect_stroke(rect, 8.0, visuals.bg_stroke, StrokeKind::Outside);

        let icon_pos = egui::pos2(rect.center().x, rect.top() + size.y * 0.25);
        ui.painter().text(
            icon_pos,
            egui::Align2::CENTER_CENTER,
            icon,
            egui::FontId::proportional(32.0 * scale),
            visuals.text_color(),
        );

        let title_pos = egui::pos2(rect.center().x, rect.center().y + size.y * 0.08);
        ui.painter().text(
            title_pos,
            egui::Align2::CENTER_CENTER,
            title,
            egui::FontId::proportional(17.0 * scale),
            visuals.text_color(),
        );

        let desc_pos = egui::pos2(rect.center().x, rect.bottom() - size.y * 0.17);
        ui.painter().text(
            desc_pos,
            egui::Align2::CENTER_CENTER,
            description,
            egui::FontId::proportional(12.0 * scale),
            ui.visuals().weak_text_color(),
        );
    }

    response
}

/// Status indicator colors.
pub mod colors {
    use super::Color32;

    pub const SUCCESS: Color32 = Color32::from_rgb(100, 200, 100);
    pub const ERROR: Color32 = Color32::from_rgb(255, 100, 100);
    pub const WARNING: Color32 = Color32::from_rgb(255, 200, 100);
    pub const NEUTRAL: Color32 = Color32::from_rgb(150, 150, 150);
    /// Safety-yellow used for primary actions.
    pub const ACCENT: Color32 = Color32::from_rgb(242, 169, 0);
}

/// Render a panel header with title.
pub fn panel_header(ui: &mut Ui, title: &str) {
    ui.heading(RichText::new(title).size(24.0));
    ui.add_space(10.0);
    ui.separator();
    ui.add_space(15.0);
}

pub fn styled_button(ui: &mut Ui, text: &str) -> Response {
    ui.add(egui::Button::new(RichText::new(text).size(14.0)).min_size(egui::vec2(80.0, 28.0)))
}

pub fn styled_button_with_icon(ui: &mut Ui, icon: &str, text: &str) -> Response {
    styled_button(ui, &format!("{icon} {text}"))
}

/// Filled accent button for the main action of a view.
pub fn primary_button_with_icon(ui: &mut Ui, icon: &str, text: &str, enabled: bool) -> Response {
    ui.add_enabled(
        enabled,
        egui::Button::new(RichText::new(format!("{icon} {text}")).size(15.0).strong().color(Color32::BLACK))
            .fill(colors::ACCENT)
            .min_size(egui::vec2(180.0, 34.0)),
    )
}

/// Small row action.
pub fn action_button(ui: &mut Ui, icon: &str, tooltip: &str) -> Response {
    ui.small_button(icon).on_hover_text(tooltip)
}

/// Small row action for irreversible operations.
pub fn danger_action_button(ui: &mut Ui, icon: &str, text: &str) -> Response {
    ui.add(egui::Button::new(RichText::new(format!("{icon} {text}")).color(colors::ERROR)).small())
}

/// Rounded colored label.
pub fn chip(ui: &mut Ui, text: &str, color: Color32) {
    egui::Frame::new()
        .fill(color.gamma_multiply(0.2))
        .corner_radius(CornerRadius::same(10))
        .inner_margin(Margin::symmetric(6, 2))
        .show(ui, |ui| {
            ui.label(RichText::new(text).small().color(color));
        });
}

/// "On site" or "exit finalised" badge.
pub fn status_badge(ui: &mut Ui, active: bool) {
    if active {
        chip(ui, "Na obra", colors::WARNING);
    } else {
        chip(ui, "Saída finalizada", colors::SUCCESS);
    }
}

/// One chip per safety item, green when confirmed.
pub fn epi_chips(ui: &mut Ui, epi: &Epi) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 4.0;
        for (label, worn) in epi.items() {
            chip(ui, label, if worn { colors::SUCCESS } else { colors::NEUTRAL });
        }
    });
}

/// Framed block used for stats and side lists.
pub fn card_frame(ui: &Ui) -> egui::Frame {
    egui::Frame::new()
        .fill(ui.style().visuals.extreme_bg_color)
        .inner_margin(Margin::same(15))
        .outer_margin(Margin::same(5))
        .corner_radius(CornerRadius::same(8))
}

/// Render a stat card with title, value, and subtitle.
pub fn stat_card(ui: &mut Ui, title: &str, value: &str, subtitle: &str) {
    card_frame(ui).show(ui, |ui| {
        ui.set_min_width(150.0);

        ui.vertical(|ui| {
            ui.label(RichText::new(title).small());
            ui.label(RichText::new(value).heading().strong());
            ui.label(RichText::new(subtitle).small().weak());
        });
    });
}

/// Empty-state line.
pub fn empty_hint(ui: &mut Ui, text: &str) {
    ui.add_space(10.0);
    ui.label(RichText::new(text).weak().italics());
}

/// Single-line field that re-applies `format` whenever the text changes.
pub fn formatted_field(ui: &mut Ui, value: &mut String, hint: &str, format: fn(&str) -> String) -> Response {
    let response = ui.add(
        egui::TextEdit::singleline(value)
            .hint_text(hint)
            .desired_width(280.0),
    );
    if response.changed() {
        *value = format(value.as_str());
    }
    response
}

/// Site picker for admins; other roles always write to their own site.
pub fn site_selector(ui: &mut Ui, id: &str, works: &[Work], selected: &mut Option<i64>) {
    let current = selected
        .and_then(|id| works.iter().find(|w| w.id == id))
        .map(|w| w.name.as_str())
        .unwrap_or("Selecione a obra");

    egui::ComboBox::from_id_salt(id)
        .selected_text(current)
        .width(280.0)
        .show_ui(ui, |ui| {
            for work in works.iter().filter(|w| w.active) {
                ui.selectable_value(selected, Some(work.id), &work.name);
            }
        });
}

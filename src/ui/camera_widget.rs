//! Photo field: live preview, snapshot and retake.

use eframe::egui::{self, ColorImage, RichText, TextureHandle, TextureOptions, Ui};
use egui_phosphor::regular::{ARROW_COUNTER_CLOCKWISE, CAMERA, X};
use image::{RgbImage, RgbaImage};

use crate::camera::{self, CameraCapture, CameraError, CaptureState, Photo};
use crate::config::CameraConfig;

use super::components::colors;

const PREVIEW_WIDTH: u32 = 640;
const PREVIEW_MAX_HEIGHT: f32 = 200.0;

/// Change to the photo held by the field.
pub enum CameraEvent {
    Captured(Photo),
    Cleared,
}

pub struct CameraWidget {
    id: &'static str,
    label: &'static str,
    capture: CameraCapture,
    texture: Option<TextureHandle>,
    notice: Option<String>,
}

impl CameraWidget {
    pub fn new(id: &'static str, label: &'static str, config: &CameraConfig) -> Self {
        Self {
            id,
            label,
            capture: CameraCapture::new(camera::default_device(config), config),
            texture: None,
            notice: None,
        }
    }

    /// Forget the photo and release the camera (form cleared or signed out).
    pub fn reset(&mut self) {
        self.capture.reset();
        self.texture = None;
        self.notice = None;
    }

    pub fn show(&mut self, ui: &mut Ui) -> Option<CameraEvent> {
        let mut event = None;

        ui.vertical(|ui| {
            ui.label(RichText::new(self.label).strong());
            ui.add_space(4.0);

            match self.capture.state().clone() {
                CaptureState::Off => {
                    if ui.button(format!("{CAMERA} Abrir câmera")).clicked() {
                        self.start();
                    }
                }
                CaptureState::Live => {
                    if let Some(frame) = self.capture.preview_frame() {
                        self.set_texture(ui.ctx(), rgb_preview(&frame));
                    }
                    self.show_texture(ui);
                    if let Some(res) = self.capture.resolution() {
                        ui.label(RichText::new(res.to_string()).small().weak());
                    }

                    ui.horizontal(|ui| {
                        if ui.button(format!("{CAMERA} Capturar")).clicked() {
                            match self.capture.capture() {
                                Ok(photo) => {
                                    self.show_photo(ui.ctx(), &photo);
                                    self.notice = None;
                                    event = Some(CameraEvent::Captured(photo));
                                }
                                Err(e) => self.notice = Some(e.user_message()),
                            }
                        }
                        if ui.button(format!("{X} Cancelar")).clicked() {
                            self.capture.cancel();
                            self.texture = None;
                        }
                    });

                    ui.ctx().request_repaint();
                }
                CaptureState::Captured => {
                    self.show_texture(ui);
                    if ui.button(format!("{ARROW_COUNTER_CLOCKWISE} Tirar outra")).clicked() {
                        self.texture = None;
                        event = Some(CameraEvent::Cleared);
                        if let Err(e) = self.capture.retake() {
                            self.note_start_error(&e);
                        }
                    }
                }
                CaptureState::Failed(message) => {
                    ui.colored_label(colors::ERROR, message);
                    if ui.button(format!("{CAMERA} Tentar novamente")).clicked() {
                        self.start();
                    }
                }
            }

            if let Some(notice) = &self.notice {
                ui.label(RichText::new(notice).small().color(colors::WARNING));
            }
        });

        event
    }

    fn start(&mut self) {
        self.notice = None;
        if let Err(e) = self.capture.start() {
            self.note_start_error(&e);
        }
    }

    /// Failures other than a cancelled picker already show through `CaptureState::Failed`.
    fn note_start_error(&mut self, error: &CameraError) {
        if *error == CameraError::Cancelled {
            self.notice = Some(error.user_message());
        }
    }

    fn show_photo(&mut self, ctx: &egui::Context, photo: &Photo) {
        match camera::decode_data_url(photo.data_url()) {
            Ok(image) => self.set_texture(ctx, rgba_preview(&image)),
            Err(e) => tracing::warn!("Captured photo could not be previewed: {e}"),
        }
    }

    fn set_texture(&mut self, ctx: &egui::Context, image: ColorImage) {
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture(self.id, image, TextureOptions::LINEAR)),
        }
    }

    fn show_texture(&self, ui: &mut Ui) {
        match &self.texture {
            Some(texture) => {
                ui.add(
                    egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                        .max_height(PREVIEW_MAX_HEIGHT)
                        .max_width(PREVIEW_WIDTH as f32 / 2.0)
                        .corner_radius(egui::CornerRadius::same(4)),
                );
            }
            None => {
                ui.spinner();
            }
        }
    }
}

/// Downscaled frame for the on-screen preview.
fn rgb_preview(frame: &RgbImage) -> ColorImage {
    let frame = if frame.width() > PREVIEW_WIDTH {
        let height = frame.height() * PREVIEW_WIDTH / frame.width();
        image::imageops::thumbnail(frame, PREVIEW_WIDTH, height.max(1))
    } else {
        frame.clone()
    };
    ColorImage::from_rgb([frame.width() as usize, frame.height() as usize], frame.as_raw())
}

pub(crate) fn rgba_preview(image: &RgbaImage) -> ColorImage {
    let image = if image.width() > PREVIEW_WIDTH * 2 {
        let width = PREVIEW_WIDTH * 2;
        let height = image.height() * width / image.width();
        image::imageops::thumbnail(image, width, height.max(1))
    } else {
        image.clone()
    };
    ColorImage::from_rgba_unmultiplied([image.width() as usize, image.height() as usize], image.as_raw())
}

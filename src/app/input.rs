use crate::render::camera::CameraRig;
use egui::{Key, PointerButton, Vec2};

/// Pixels one arrow-key press pans by.
const KEY_PAN_PIXELS: f32 = 7.0;
const SCROLL_ZOOM_RATE: f32 = 0.002;

/// Orbit gestures collected over the preview viewport for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitInput {
    /// Rotate drag, pixels.
    pub rotate: Vec2,
    /// Pan drag, pixels.
    pub pan: Vec2,
    /// Multiplicative zoom; above 1 zooms in.
    pub zoom: f32,
}

impl Default for OrbitInput {
    fn default() -> Self {
        Self {
            rotate: Vec2::ZERO,
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl OrbitInput {
    /// Left drag orbits, right/middle or shift+left drag pans, wheel and
    /// pinch zoom, arrow keys pan in steps.
    pub fn gather(ui: &egui::Ui, response: &egui::Response) -> Self {
        let mut input = Self::default();
        let shift = ui.input(|i| i.modifiers.shift);
        if response.dragged_by(PointerButton::Primary) {
            if shift {
                input.pan += response.drag_delta();
            } else {
                input.rotate += response.drag_delta();
            }
        }
        if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle) {
            input.pan += response.drag_delta();
        }
        if response.hovered() {
            ui.input(|i| {
                input.zoom = i.zoom_delta() * (i.smooth_scroll_delta.y * SCROLL_ZOOM_RATE).exp();
                let steps = [
                    (Key::ArrowLeft, Vec2::new(KEY_PAN_PIXELS, 0.0)),
                    (Key::ArrowRight, Vec2::new(-KEY_PAN_PIXELS, 0.0)),
                    (Key::ArrowUp, Vec2::new(0.0, KEY_PAN_PIXELS)),
                    (Key::ArrowDown, Vec2::new(0.0, -KEY_PAN_PIXELS)),
                ];
                for (key, step) in steps {
                    if i.key_pressed(key) {
                        input.pan += step;
                    }
                }
            });
        }
        input
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, rig: &mut CameraRig, viewport_height: f32) {
        if self.is_idle() {
            return;
        }
        let height = viewport_height.max(1.0);
        if self.rotate != Vec2::ZERO {
            let tau = std::f32::consts::TAU;
            rig.rotate(-tau * self.rotate.x / height, -tau * self.rotate.y / height);
        }
        if self.zoom != 1.0 {
            rig.dolly(self.zoom);
        }
        if self.pan != Vec2::ZERO {
            let scale = rig.world_units_per_pixel(height);
            rig.pan(self.pan.x * scale, self.pan.y * scale);
        }
    }
}

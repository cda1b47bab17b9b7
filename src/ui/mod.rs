use crate::assets::loader::abbreviate;
use crate::scene::background::FALLBACK_COLOR;
use crate::scene::{
    BackgroundFit, BackgroundSource, CameraType, EnvironmentPreset, MockupMaterial,
    ModelTransform, SceneConfiguration, Srgba,
};
use egui::{Align2, Color32, Key, RichText};

const TOAST_SECONDS: f64 = 4.0;

/// What the user asked for this frame that the UI cannot do by itself.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SaveProject { name: String, category: String },
    OpenProject,
    ApplyPreset(&'static str),
    ResetCamera,
    PickScreenImage,
    PickBackgroundImage,
    CopyScene,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    expires_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundKind {
    Solid,
    Linear,
    Radial,
    Image,
}

impl BackgroundKind {
    const ALL: [Self; 4] = [Self::Solid, Self::Linear, Self::Radial, Self::Image];

    fn label(self) -> &'static str {
        match self {
            Self::Solid => "Solid",
            Self::Linear => "Linear",
            Self::Radial => "Radial",
            Self::Image => "Image",
        }
    }
}

/// Editable copy of the background so switching kinds keeps the other
/// kinds' settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundDraft {
    pub kind: BackgroundKind,
    pub solid: Srgba,
    pub angle_deg: f32,
    pub stops: Vec<Srgba>,
    pub url: String,
    /// Text in the URL field; becomes `url` on Enter or when focus leaves.
    pub url_input: String,
}

impl Default for BackgroundDraft {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Solid,
            solid: FALLBACK_COLOR,
            angle_deg: crate::scene::background::DEFAULT_LINEAR_ANGLE_DEG,
            stops: vec![Srgba::from_hex_u32(0xD5CCFF), Srgba::from_hex_u32(0x6B75FF)],
            url: String::new(),
            url_input: String::new(),
        }
    }
}

impl BackgroundDraft {
    /// Adopts `source`, keeping `self`'s values for the fields it lacks.
    pub fn adopt(&mut self, source: &BackgroundSource) {
        match source {
            BackgroundSource::Solid(color) => {
                self.kind = BackgroundKind::Solid;
                self.solid = *color;
            }
            BackgroundSource::LinearGradient { angle_deg, stops } => {
                self.kind = BackgroundKind::Linear;
                self.angle_deg = *angle_deg;
                self.stops = stops.clone();
            }
            BackgroundSource::RadialGradient { stops } => {
                self.kind = BackgroundKind::Radial;
                self.stops = stops.clone();
            }
            BackgroundSource::Image { url } => {
                self.kind = BackgroundKind::Image;
                self.url = url.clone();
                self.url_input = url.clone();
            }
        }
    }

    /// Takes the typed URL. Returns true if the committed URL changed.
    pub fn commit_url(&mut self) -> bool {
        let url = self.url_input.trim();
        if url.is_empty() || url == self.url {
            return false;
        }
        self.url = url.to_string();
        true
    }

    /// The source to write back, or `None` while an image has no URL yet.
    pub fn committed_source(&self) -> Option<BackgroundSource> {
        if self.kind == BackgroundKind::Image && self.url.trim().is_empty() {
            return None;
        }
        Some(self.to_source())
    }

    pub fn to_source(&self) -> BackgroundSource {
        match self.kind {
            BackgroundKind::Solid => BackgroundSource::Solid(self.solid),
            BackgroundKind::Linear => BackgroundSource::LinearGradient {
                angle_deg: self.angle_deg,
                stops: self.stops.clone(),
            },
            BackgroundKind::Radial => BackgroundSource::RadialGradient {
                stops: self.stops.clone(),
            },
            BackgroundKind::Image => BackgroundSource::Image {
                url: self.url.clone(),
            },
        }
    }
}

pub struct UiState {
    preview_mode: bool,
    background: BackgroundDraft,
    /// Last background source seen in the configuration.
    background_seen: Option<BackgroundSource>,
    project_name: String,
    project_category: String,
    toast: Option<Toast>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            preview_mode: false,
            background: BackgroundDraft::default(),
            background_seen: None,
            project_name: "Untitled mockup".to_string(),
            project_category: "phone".to_string(),
            toast: None,
        }
    }

    #[cfg(test)]
    pub fn preview_mode(&self) -> bool {
        self.preview_mode
    }

    pub fn set_project_fields(&mut self, name: &str, category: &str) {
        self.project_name = name.to_string();
        self.project_category = category.to_string();
    }

    #[cfg(test)]
    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn notify(&mut self, kind: ToastKind, message: impl Into<String>, now: f64) {
        self.toast = Some(Toast {
            kind,
            message: message.into(),
            expires_at: now + TOAST_SECONDS,
        });
    }

    fn expire_toast(&mut self, now: f64) {
        if self.toast.as_ref().is_some_and(|toast| now >= toast.expires_at) {
            self.toast = None;
        }
    }

    /// Draws the sidebar, dock and toast. Must run before the central panel.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        config: &mut SceneConfiguration,
        has_project: bool,
        status: &str,
    ) -> Vec<UiAction> {
        let mut actions = Vec::new();
        if self.preview_mode && ctx.input(|i| i.key_pressed(Key::Escape)) {
            self.preview_mode = false;
        }

        if !self.preview_mode {
            egui::SidePanel::right("controls")
                .resizable(false)
                .default_width(300.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        self.project_card(ui, has_project, &mut actions);
                        self.background_card(ui, config, &mut actions);
                        environment_card(ui, config);
                        camera_card(ui, config, &mut actions);
                        material_card(ui, config);
                        model_card(ui, config, &mut actions);
                    });
                });
        }

        self.dock(ctx, status, &mut actions);
        let now = ctx.input(|i| i.time);
        self.expire_toast(now);
        self.show_toast(ctx);
        actions
    }

    fn project_card(&mut self, ui: &mut egui::Ui, has_project: bool, actions: &mut Vec<UiAction>) {
        egui::CollapsingHeader::new("Project")
            .default_open(true)
            .show(ui, |ui| {
                egui::Grid::new("project_fields").num_columns(2).show(ui, |ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut self.project_name);
                    ui.end_row();
                    ui.label("Category");
                    ui.text_edit_singleline(&mut self.project_category);
                    ui.end_row();
                });
                ui.horizontal(|ui| {
                    let label = if has_project { "Update" } else { "Save" };
                    let can_save = !self.project_name.trim().is_empty();
                    if ui.add_enabled(can_save, egui::Button::new(label)).clicked() {
                        actions.push(UiAction::SaveProject {
                            name: self.project_name.trim().to_string(),
                            category: self.project_category.trim().to_string(),
                        });
                    }
                    if ui.button("Open…").clicked() {
                        actions.push(UiAction::OpenProject);
                    }
                    if ui.button("Preset: phone-1").clicked() {
                        actions.push(UiAction::ApplyPreset("phone-1"));
                    }
                });
            });
    }

    fn background_card(
        &mut self,
        ui: &mut egui::Ui,
        config: &mut SceneConfiguration,
        actions: &mut Vec<UiAction>,
    ) {
        if self.background_seen.as_ref() != Some(&config.background.source) {
            self.background.adopt(&config.background.source);
        }
        let draft = &mut self.background;
        egui::CollapsingHeader::new("Background")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    for kind in BackgroundKind::ALL {
                        ui.selectable_value(&mut draft.kind, kind, kind.label());
                    }
                });
                match draft.kind {
                    BackgroundKind::Solid => {
                        ui.horizontal(|ui| {
                            ui.label("Color");
                            srgb_button(ui, &mut draft.solid);
                        });
                    }
                    BackgroundKind::Linear | BackgroundKind::Radial => {
                        if draft.kind == BackgroundKind::Linear {
                            ui.add(
                                egui::Slider::new(&mut draft.angle_deg, 0.0..=360.0)
                                    .text("Angle")
                                    .suffix("°"),
                            );
                        }
                        ui.horizontal(|ui| {
                            ui.label("Stops");
                            for stop in draft.stops.iter_mut() {
                                srgb_button(ui, stop);
                            }
                        });
                    }
                    BackgroundKind::Image => {
                        ui.horizontal(|ui| {
                            let response = ui.text_edit_singleline(&mut draft.url_input);
                            if response.lost_focus() {
                                draft.commit_url();
                            }
                            if ui.button("Browse…").clicked() {
                                actions.push(UiAction::PickBackgroundImage);
                            }
                        });
                        ui.horizontal(|ui| {
                            ui.radio_value(&mut config.background.fit, BackgroundFit::Fill, "Fill");
                            ui.radio_value(&mut config.background.fit, BackgroundFit::Fit, "Fit");
                        });
                    }
                }
            });
        if let Some(source) = draft.committed_source() {
            if source != config.background.source {
                config.background.source = source;
            }
        }
        self.background_seen = Some(config.background.source.clone());
    }

    fn dock(&mut self, ctx: &egui::Context, status: &str, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::bottom("dock").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.preview_mode { "Exit preview" } else { "Preview" };
                if ui.selectable_label(self.preview_mode, label).clicked() {
                    self.preview_mode = !self.preview_mode;
                }
                if ui.button("Copy").clicked() {
                    actions.push(UiAction::CopyScene);
                }
                if ui.button("Export").clicked() {
                    actions.push(UiAction::Export);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(status);
                });
            });
        });
    }

    fn show_toast(&mut self, ctx: &egui::Context) {
        let Some(toast) = &self.toast else {
            return;
        };
        let color = match toast.kind {
            ToastKind::Success => Color32::from_rgb(0x4C, 0xAF, 0x50),
            ToastKind::Error => Color32::from_rgb(0xE5, 0x48, 0x4D),
        };
        let mut dismissed = false;
        egui::Area::new(egui::Id::new("toast"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&toast.message).color(color));
                        dismissed = ui.small_button("×").clicked();
                    });
                });
            });
        if dismissed {
            self.toast = None;
        }
    }
}

fn srgb_button(ui: &mut egui::Ui, color: &mut Srgba) {
    let [r, g, b, a] = color.0;
    let mut rgb = [r, g, b];
    if ui.color_edit_button_srgb(&mut rgb).changed() {
        *color = Srgba([rgb[0], rgb[1], rgb[2], a]);
    }
}

fn environment_card(ui: &mut egui::Ui, config: &mut SceneConfiguration) {
    egui::CollapsingHeader::new("Environment")
        .default_open(true)
        .show(ui, |ui| {
            let environment = &mut config.environment;
            egui::ComboBox::from_label("Preset")
                .selected_text(environment.preset.label())
                .show_ui(ui, |ui| {
                    for preset in EnvironmentPreset::ALL {
                        ui.selectable_value(&mut environment.preset, preset, preset.label());
                    }
                });
            ui.add(egui::Slider::new(&mut environment.intensity, 0.0..=2.0).text("Intensity"));
            ui.add(
                egui::Slider::new(&mut environment.rotation, 0.0..=std::f32::consts::TAU)
                    .text("Rotation")
                    .suffix(" rad"),
            );
            ui.separator();
            let lighting = &mut config.lighting;
            ui.add(egui::Slider::new(&mut lighting.ambient_intensity, 0.0..=2.0).text("Ambient"));
            ui.add(
                egui::Slider::new(&mut lighting.directional_intensity, 0.0..=20.0)
                    .text("Key light"),
            );
        });
}

fn camera_card(ui: &mut egui::Ui, config: &mut SceneConfiguration, actions: &mut Vec<UiAction>) {
    egui::CollapsingHeader::new("Camera")
        .default_open(true)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                for camera_type in [CameraType::Perspective, CameraType::Orthographic] {
                    ui.radio_value(&mut config.camera.camera_type, camera_type, camera_type.label());
                }
            });
            if ui.button("Reset camera").clicked() {
                actions.push(UiAction::ResetCamera);
            }
        });
}

fn material_card(ui: &mut egui::Ui, config: &mut SceneConfiguration) {
    egui::CollapsingHeader::new("Material")
        .default_open(true)
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for material in MockupMaterial::ALL {
                    ui.selectable_value(&mut config.material, material, material.label());
                }
            });
        });
}

fn model_card(ui: &mut egui::Ui, config: &mut SceneConfiguration, actions: &mut Vec<UiAction>) {
    egui::CollapsingHeader::new("Model")
        .default_open(true)
        .show(ui, |ui| {
            let model = &mut config.model;
            let limit = ModelTransform::POSITION_LIMIT;
            for (label, value) in [
                ("Position X", &mut model.position.x),
                ("Position Y", &mut model.position.y),
                ("Position Z", &mut model.position.z),
            ] {
                ui.add(egui::Slider::new(value, -limit..=limit).text(label).fixed_decimals(3));
            }
            let limit = ModelTransform::ROTATION_LIMIT_DEG;
            for (label, value) in [
                ("Rotation X", &mut model.rotation.x),
                ("Rotation Y", &mut model.rotation.y),
                ("Rotation Z", &mut model.rotation.z),
            ] {
                let mut degrees = value.to_degrees();
                let response =
                    ui.add(egui::Slider::new(&mut degrees, -limit..=limit).text(label).suffix("°"));
                if response.changed() {
                    *value = degrees.to_radians();
                }
            }
            if ui.button("Reset orientation").clicked() {
                *model = ModelTransform::default();
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Screen image…").clicked() {
                    actions.push(UiAction::PickScreenImage);
                }
                match &config.screen_image {
                    Some(reference) => ui.weak(abbreviate(reference)),
                    None => ui.weak("or drop an image on the window"),
                };
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(ui_state: &mut UiState, config: &mut SceneConfiguration) -> Vec<UiAction> {
        let ctx = egui::Context::default();
        let mut actions = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = ui_state.show(ctx, config, false, "status");
        });
        actions
    }

    #[test]
    fn idle_frame_changes_nothing() {
        let mut ui_state = UiState::new();
        let mut config = SceneConfiguration::default();
        let before = config.clone();
        let actions = run_frame(&mut ui_state, &mut config);
        assert!(actions.is_empty());
        assert_eq!(config, before);
    }

    #[test]
    fn idle_frame_keeps_gradient_and_image_sources() {
        let mut ui_state = UiState::new();
        for source in [
            BackgroundSource::parse_css("linear-gradient(120deg, #111111, #222222, #333333)"),
            BackgroundSource::parse_css("radial-gradient(circle, #FF0000, #0000FF)"),
            BackgroundSource::Image {
                url: "bg.png".into(),
            },
        ] {
            let mut config = SceneConfiguration::default();
            config.background.source = source.clone();
            run_frame(&mut ui_state, &mut config);
            assert_eq!(config.background.source, source);
        }
    }

    #[test]
    fn draft_keeps_other_kinds_when_switching() {
        let mut draft = BackgroundDraft::default();
        draft.adopt(&BackgroundSource::LinearGradient {
            angle_deg: 90.0,
            stops: vec![Srgba::rgb(1, 1, 1), Srgba::rgb(2, 2, 2)],
        });
        draft.kind = BackgroundKind::Solid;
        assert_eq!(draft.to_source(), BackgroundSource::Solid(FALLBACK_COLOR));
        draft.kind = BackgroundKind::Linear;
        assert_eq!(
            draft.to_source(),
            BackgroundSource::LinearGradient {
                angle_deg: 90.0,
                stops: vec![Srgba::rgb(1, 1, 1), Srgba::rgb(2, 2, 2)],
            }
        );
        draft.kind = BackgroundKind::Radial;
        assert!(matches!(
            draft.to_source(),
            BackgroundSource::RadialGradient { stops } if stops.len() == 2
        ));
    }

    #[test]
    fn typed_url_waits_for_commit() {
        let mut ui_state = UiState::new();
        let mut config = SceneConfiguration::default();
        let source = BackgroundSource::Image {
            url: "bg.png".into(),
        };
        config.background.source = source.clone();
        run_frame(&mut ui_state, &mut config);

        ui_state.background.url_input = "/home/me/b".into();
        run_frame(&mut ui_state, &mut config);
        assert_eq!(config.background.source, source);

        ui_state.background.url_input = "/home/me/bg2.png ".into();
        assert!(ui_state.background.commit_url());
        assert!(!ui_state.background.commit_url());
        run_frame(&mut ui_state, &mut config);
        assert_eq!(
            config.background.source,
            BackgroundSource::Image {
                url: "/home/me/bg2.png".into()
            }
        );
    }

    #[test]
    fn image_kind_without_url_keeps_previous_source() {
        let mut ui_state = UiState::new();
        let mut config = SceneConfiguration::default();
        run_frame(&mut ui_state, &mut config);
        ui_state.background.kind = BackgroundKind::Image;
        assert!(ui_state.background.committed_source().is_none());
        run_frame(&mut ui_state, &mut config);
        assert_eq!(config.background.source, BackgroundSource::default());
        assert_eq!(ui_state.background.kind, BackgroundKind::Image);
    }

    #[test]
    fn degenerate_stops_are_left_alone() {
        let mut ui_state = UiState::new();
        let source = BackgroundSource::RadialGradient {
            stops: vec![Srgba::rgb(5, 5, 5)],
        };
        let mut config = SceneConfiguration::default();
        config.background.source = source.clone();
        run_frame(&mut ui_state, &mut config);
        assert_eq!(config.background.source, source);
    }

    #[test]
    fn toast_expires() {
        let mut ui_state = UiState::new();
        ui_state.notify(ToastKind::Success, "Project saved", 10.0);
        ui_state.expire_toast(13.0);
        assert_eq!(ui_state.toast().map(|t| t.kind), Some(ToastKind::Success));
        ui_state.expire_toast(14.5);
        assert!(ui_state.toast().is_none());
    }

    #[test]
    fn preview_mode_hides_sidebar_state() {
        let mut ui_state = UiState::new();
        assert!(!ui_state.preview_mode());
        ui_state.preview_mode = true;
        let mut config = SceneConfiguration::default();
        let actions = run_frame(&mut ui_state, &mut config);
        assert!(actions.is_empty());
        assert!(ui_state.preview_mode());
    }
}

mod compose;
mod input;
mod timing;

use crate::assets::loader::{LoadSlot, TextureLoader};
use crate::assets::screen::ScreenTextureBinder;
use crate::assets::DeviceModel;
use crate::config::EditorConfig;
use crate::render::PreviewRenderer;
use crate::scene::serialization::{
    load_project_from_file, now_millis, save_project_to_file, ProjectRecord, SceneData,
};
use crate::scene::{BackgroundSource, SceneConfiguration};
use crate::ui::{ToastKind, UiAction, UiState};
use compose::SceneComposer;
use input::OrbitInput;
use timing::FrameTiming;

use std::path::{Path, PathBuf};
use std::time::Instant;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

struct PendingExport {
    path: PathBuf,
    rect: egui::Rect,
}

pub struct MockupApp {
    editor: EditorConfig,
    config: SceneConfiguration,
    model: Option<DeviceModel>,
    loader: TextureLoader,
    screen: ScreenTextureBinder,
    composer: SceneComposer,
    preview: PreviewRenderer,
    preview_rect: egui::Rect,
    ui: UiState,
    timing: FrameTiming,
    project: Option<(ProjectRecord, PathBuf)>,
    pending_export: Option<PendingExport>,
}

impl MockupApp {
    pub fn new(editor: EditorConfig) -> Self {
        let config = editor.initial_scene();
        let model = load_model(editor.model_path.as_deref());
        let mut loader = TextureLoader::new();
        let mut screen = ScreenTextureBinder::new();
        if let Some(reference) = &config.screen_image {
            screen.request(reference, &mut loader);
        }
        let composer = SceneComposer::new(&config);
        Self {
            editor,
            config,
            model,
            loader,
            screen,
            composer,
            preview: PreviewRenderer::new(),
            preview_rect: egui::Rect::NOTHING,
            ui: UiState::new(),
            timing: FrameTiming::new(),
            project: None,
            pending_export: None,
        }
    }

    fn receive_loads(&mut self) {
        for loaded in self.loader.poll() {
            match loaded.slot {
                LoadSlot::Screen => {
                    self.screen
                        .apply(&loaded, self.model.as_mut(), &mut self.config);
                }
                LoadSlot::Background => {
                    self.composer.apply_background(&loaded);
                }
            }
        }
    }

    fn receive_screenshots(&mut self, ctx: &egui::Context) {
        let screenshots: Vec<_> = ctx.input(|i| {
            i.raw
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Screenshot { image, .. } => Some(image.clone()),
                    _ => None,
                })
                .collect()
        });
        let Some(image) = screenshots.last() else {
            return;
        };
        let Some(export) = self.pending_export.take() else {
            return;
        };
        let region = image.region(&export.rect, Some(ctx.pixels_per_point()));
        let now = ctx.input(|i| i.time);
        match save_png(&export.path, &region) {
            Ok(()) => {
                log::info!("Exported {}", export.path.display());
                self.ui
                    .notify(ToastKind::Success, "Mockup exported", now);
            }
            Err(err) => {
                log::warn!("Failed to export mockup: {}", err);
                self.ui
                    .notify(ToastKind::Error, format!("Export failed: {err}"), now);
            }
        }
    }

    fn handle_action(&mut self, ctx: &egui::Context, action: UiAction) {
        match action {
            UiAction::SaveProject { name, category } => {
                self.handle_save_project_action(ctx, &name, &category)
            }
            UiAction::OpenProject => self.handle_open_project_action(ctx),
            UiAction::ApplyPreset(preset) => {
                if !self.config.apply_preset(preset) {
                    log::warn!("Unknown preset {preset:?}");
                }
            }
            UiAction::ResetCamera => self.composer.reset_camera(&mut self.config),
            UiAction::PickScreenImage => {
                if let Some(path) = pick_image("screen.png") {
                    self.screen
                        .request(&path.display().to_string(), &mut self.loader);
                }
            }
            UiAction::PickBackgroundImage => {
                if let Some(path) = pick_image("background.png") {
                    self.config.background.source = BackgroundSource::Image {
                        url: path.display().to_string(),
                    };
                }
            }
            UiAction::CopyScene => {
                self.composer.record_camera(&mut self.config);
                match serde_json::to_string_pretty(&SceneData::from(&self.config)) {
                    Ok(json) => {
                        ctx.copy_text(json);
                        self.ui
                            .notify(ToastKind::Success, "Scene copied", ctx.input(|i| i.time));
                    }
                    Err(err) => log::warn!("Failed to serialize scene: {}", err),
                }
            }
            UiAction::Export => self.handle_export_action(ctx),
        }
    }

    fn handle_save_project_action(&mut self, ctx: &egui::Context, name: &str, category: &str) {
        self.composer.record_camera(&mut self.config);
        let now_ms = now_millis();
        let (record, path) = match self.project.take() {
            Some((mut record, path)) => {
                record.name = name.to_string();
                record.category = category.to_string();
                record.update_scene(&self.config, now_ms);
                (record, path)
            }
            None => {
                let Some(path) = rfd::FileDialog::new()
                    .add_filter("Mockup project", &["json"])
                    .set_file_name(format!("{}.json", file_stem(name)))
                    .save_file()
                else {
                    return;
                };
                let record = ProjectRecord::create(
                    &self.editor.user_id,
                    name,
                    category,
                    &self.config,
                    now_ms,
                );
                (record, path)
            }
        };

        let now = ctx.input(|i| i.time);
        match save_project_to_file(&record, &path) {
            Ok(()) => {
                log::info!("Project '{}' saved to {:?}", record.name, path);
                self.ui.notify(ToastKind::Success, "Project saved", now);
            }
            Err(e) => {
                log::warn!("Failed to save project: {}", e);
                self.ui
                    .notify(ToastKind::Error, format!("Save failed: {e}"), now);
            }
        }
        self.project = Some((record, path));
    }

    fn handle_open_project_action(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Mockup project", &["json"])
            .pick_file()
        else {
            return;
        };

        let now = ctx.input(|i| i.time);
        match load_project_from_file(&path) {
            Ok(record) => {
                log::info!("Project '{}' loaded from {:?}", record.name, path);
                self.adopt_project(record, path);
                self.ui.notify(ToastKind::Success, "Project opened", now);
            }
            Err(e) => {
                log::warn!("Failed to load project: {}", e);
                self.ui
                    .notify(ToastKind::Error, format!("Open failed: {e}"), now);
            }
        }
    }

    /// Replaces the session with an opened project.
    fn adopt_project(&mut self, record: ProjectRecord, path: PathBuf) {
        let base =
            SceneConfiguration::with_limits(self.editor.perspective, self.editor.orthographic);
        self.config = record.scene_data.to_configuration(&base);
        self.composer.reload(&self.config);
        self.screen.restore(
            self.config.screen_image.as_deref(),
            self.model.as_mut(),
            &mut self.loader,
        );
        self.ui.set_project_fields(&record.name, &record.category);
        self.project = Some((record, path));
    }

    fn handle_export_action(&mut self, ctx: &egui::Context) {
        if !self.preview_rect.is_positive() {
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("mockup.png")
            .save_file()
        else {
            return;
        };
        self.pending_export = Some(PendingExport {
            path,
            rect: self.preview_rect,
        });
        ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(Default::default()));
    }

    fn status_line(&self) -> String {
        let mut status = format!(
            "{} camera | {}",
            self.composer.rig().active_type().label(),
            self.timing.status()
        );
        if self.loader.is_pending() {
            if self.screen.pending_reference().is_some() {
                status.push_str(" | loading screen");
            }
            if self.composer.has_pending_background() {
                status.push_str(" | loading background");
            }
        }
        status
    }

    fn show_preview(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
                self.preview_rect = rect;

                self.composer
                    .sync(&self.config, self.model.as_mut(), &mut self.loader);
                OrbitInput::gather(ui, &response).apply(self.composer.rig_mut(), rect.height());
                self.composer.update();

                let frame = self
                    .composer
                    .frame(glam::Vec2::new(rect.width(), rect.height()));
                self.preview
                    .paint(ctx, &ui.painter_at(rect), rect, &frame, self.model.as_ref());
            });
    }
}

impl eframe::App for MockupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.timing.update(Instant::now());

        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if !dropped.is_empty() {
            self.screen.handle_drops(&dropped, &mut self.loader);
        }
        self.receive_screenshots(ctx);
        self.receive_loads();

        let status = self.status_line();
        let actions = self
            .ui
            .show(ctx, &mut self.config, self.project.is_some(), &status);
        for action in actions {
            self.handle_action(ctx, action);
        }

        let compose_start = Instant::now();
        self.show_preview(ctx);
        self.timing
            .set_compose_ms(compose_start.elapsed().as_secs_f32() * 1000.0);

        ctx.request_repaint();
    }
}

/// A model that fails to load falls back to the built-in phone; one that is
/// missing its named parts renders nothing.
fn load_model(path: Option<&Path>) -> Option<DeviceModel> {
    let Some(path) = path else {
        return Some(DeviceModel::builtin_phone());
    };
    match DeviceModel::load_from_path(path) {
        Ok(model) => model,
        Err(err) => {
            log::warn!("Failed to load device model {:?}: {}", path, err);
            Some(DeviceModel::builtin_phone())
        }
    }
}

fn pick_image(file_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Image", IMAGE_EXTENSIONS)
        .set_file_name(file_name)
        .pick_file()
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "mockup".to_string()
    } else {
        stem
    }
}

fn save_png(path: &Path, image: &egui::ColorImage) -> Result<(), String> {
    let [width, height] = image.size;
    image::save_buffer_with_format(
        path,
        image.as_raw(),
        width as u32,
        height as u32,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|err| format!("failed writing '{}': {}", path.display(), err))
}

pub fn run() -> eframe::Result<()> {
    let editor = EditorConfig::load().unwrap_or_else(|err| {
        log::warn!("{err}; using default editor config");
        EditorConfig::default()
    });
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(editor.window_size)
            .with_title("Mockup Studio"),
        ..Default::default()
    };
    log::info!("Mockup Studio starting (user '{}')", editor.user_id);
    eframe::run_native(
        "Mockup Studio",
        options,
        Box::new(|_cc| Ok(Box::new(MockupApp::new(editor)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_is_filesystem_safe() {
        assert_eq!(file_stem("Launch shot / v2"), "Launch_shot___v2");
        assert_eq!(file_stem("   "), "mockup");
        assert_eq!(file_stem("hero-1"), "hero-1");
    }

    #[test]
    fn png_export_writes_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let image = egui::ColorImage::from_rgba_unmultiplied([4, 3], &[10, 20, 30, 255].repeat(12));
        save_png(&path, &image).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn opening_project_without_screen_image_blanks_screen() {
        let mut app = MockupApp::new(EditorConfig::default());
        let loaded = crate::assets::loader::LoadedImage {
            slot: LoadSlot::Screen,
            sequence: 0,
            reference: "old.png".into(),
            image: std::sync::Arc::new(image::RgbaImage::new(2, 2)),
        };
        app.screen.apply(&loaded, app.model.as_mut(), &mut app.config);
        assert!(app.model.as_ref().unwrap().screen().texture().is_some());

        let record = ProjectRecord::create(
            "dana",
            "Launch",
            "phone",
            &SceneConfiguration::default(),
            1_700_000_000_000,
        );
        assert!(record.scene_data.screen_image.is_none());
        app.adopt_project(record, PathBuf::from("launch.json"));

        assert!(app.config.screen_image.is_none());
        assert!(app.model.as_ref().unwrap().screen().texture().is_none());
        assert!(app.screen.pending_reference().is_none());
        assert!(app.project.is_some());
    }

    #[test]
    fn missing_model_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_model(Some(&dir.path().join("absent.json")));
        assert_eq!(
            model.map(|m| m.name().to_string()),
            Some(DeviceModel::builtin_phone().name().to_string())
        );
        assert!(load_model(None).is_some());
    }

    #[test]
    fn model_without_screen_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body_only.json");
        std::fs::write(
            &path,
            r#"{ "parts": [ { "name": "PhoneBody", "positions": [[0,0,0],[1,0,0],[0,1,0]], "normals": [], "uvs": [], "indices": [0,1,2] } ] }"#,
        )
        .unwrap();
        assert!(load_model(Some(&path)).is_none());
    }
}

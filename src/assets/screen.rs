use crate::assets::loader::{self, LoadSlot, LoadedImage, TextureLoader};
use crate::assets::DeviceModel;
use crate::scene::SceneConfiguration;
use std::path::Path;

/// Routes screenshots onto the model's screen surface.
#[derive(Debug, Default)]
pub struct ScreenTextureBinder {
    requested: Option<(u64, String)>,
}

impl ScreenTextureBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns a dropped file into a loadable reference: its path when the
    /// platform gives one, otherwise its bytes as a `data:` URL.
    pub fn reference_from_drop(file: &egui::DroppedFile) -> Option<String> {
        if let Some(path) = &file.path {
            return Some(path.display().to_string());
        }
        let bytes = file.bytes.as_ref()?;
        let mime = if file.mime.starts_with("image/") {
            file.mime.as_str()
        } else {
            loader::mime_for_path(Path::new(&file.name))
        };
        Some(loader::data_url(mime, bytes))
    }

    /// Requests the last usable file of a drop. Returns true if a load started.
    pub fn handle_drops(&mut self, files: &[egui::DroppedFile], loader: &mut TextureLoader) -> bool {
        match files.iter().rev().find_map(Self::reference_from_drop) {
            Some(reference) => {
                log::info!("Screen image dropped: {}", loader::abbreviate(&reference));
                self.request(&reference, loader);
                true
            }
            None => false,
        }
    }

    pub fn request(&mut self, reference: &str, loader: &mut TextureLoader) {
        let sequence = loader.request(LoadSlot::Screen, reference);
        self.requested = Some((sequence, reference.to_string()));
    }

    /// Puts the screen in step with a reopened project. Anything in flight is
    /// superseded; without a reference the screen goes blank, otherwise the
    /// current texture stays up until the new one lands.
    pub fn restore(
        &mut self,
        reference: Option<&str>,
        model: Option<&mut DeviceModel>,
        loader: &mut TextureLoader,
    ) {
        loader.supersede(LoadSlot::Screen);
        match reference {
            Some(reference) => self.request(reference, loader),
            None => {
                self.requested = None;
                if let Some(model) = model {
                    model.screen_mut().clear_texture();
                }
            }
        }
    }

    pub fn pending_reference(&self) -> Option<&str> {
        self.requested.as_ref().map(|(_, reference)| reference.as_str())
    }

    /// Binds an accepted completion. Non-screen completions are ignored.
    pub fn apply(
        &mut self,
        loaded: &LoadedImage,
        model: Option<&mut DeviceModel>,
        config: &mut SceneConfiguration,
    ) -> bool {
        if loaded.slot != LoadSlot::Screen {
            return false;
        }
        if let Some(model) = model {
            model
                .screen_mut()
                .bind_texture(&loaded.reference, loaded.image.clone());
        }
        config.screen_image = Some(loaded.reference.clone());
        if matches!(&self.requested, Some((sequence, _)) if *sequence == loaded.sequence) {
            self.requested = None;
        }
        let (w, h) = loaded.image.dimensions();
        log::info!(
            "Screen texture bound: {} ({w}x{h})",
            loader::abbreviate(&loaded.reference)
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::loader::Completion;
    use image::RgbaImage;
    use std::sync::Arc;

    fn dropped(path: Option<&str>, bytes: Option<&[u8]>, name: &str) -> egui::DroppedFile {
        egui::DroppedFile {
            path: path.map(std::path::PathBuf::from),
            name: name.to_string(),
            bytes: bytes.map(|b| Arc::from(b.to_vec().into_boxed_slice())),
            ..Default::default()
        }
    }

    fn loaded(sequence: u64, reference: &str, size: u32) -> LoadedImage {
        LoadedImage {
            slot: LoadSlot::Screen,
            sequence,
            reference: reference.to_string(),
            image: Arc::new(RgbaImage::new(size, size)),
        }
    }

    #[test]
    fn drop_prefers_path_then_bytes() {
        let file = dropped(Some("/shots/a.png"), Some(b"xyz"), "a.png");
        assert_eq!(
            ScreenTextureBinder::reference_from_drop(&file).unwrap(),
            "/shots/a.png"
        );
        let file = dropped(None, Some(b"xyz"), "b.jpg");
        assert_eq!(
            ScreenTextureBinder::reference_from_drop(&file).unwrap(),
            loader::data_url("image/jpeg", b"xyz")
        );
        assert!(ScreenTextureBinder::reference_from_drop(&dropped(None, None, "c.png")).is_none());
    }

    #[test]
    fn apply_binds_and_records_reference() {
        let mut binder = ScreenTextureBinder::new();
        let mut model = DeviceModel::builtin_phone();
        let mut config = SceneConfiguration::default();
        assert!(binder.apply(&loaded(1, "home.png", 3), Some(&mut model), &mut config));
        assert_eq!(config.screen_image.as_deref(), Some("home.png"));
        let texture = model.screen().texture().unwrap();
        assert_eq!(texture.image.dimensions(), (3, 3));
    }

    #[test]
    fn apply_without_model_still_records() {
        let mut binder = ScreenTextureBinder::new();
        let mut config = SceneConfiguration::default();
        assert!(binder.apply(&loaded(1, "home.png", 1), None, &mut config));
        assert_eq!(config.screen_image.as_deref(), Some("home.png"));
    }

    #[test]
    fn background_completion_is_ignored() {
        let mut binder = ScreenTextureBinder::new();
        let mut config = SceneConfiguration::default();
        let mut image = loaded(1, "bg.png", 1);
        image.slot = LoadSlot::Background;
        assert!(!binder.apply(&image, None, &mut config));
        assert!(config.screen_image.is_none());
    }

    #[test]
    fn second_request_stays_bound_when_first_resolves_late() {
        let mut loader = TextureLoader::new();
        let mut binder = ScreenTextureBinder::new();
        let mut model = DeviceModel::builtin_phone();
        let mut config = SceneConfiguration::default();

        // Neither file exists; the worker results are replaced by hand so
        // the completion order is under test control.
        binder.request("/missing/first.png", &mut loader);
        let first = loader_sequence(&binder);
        binder.request("/missing/second.png", &mut loader);
        let second = loader_sequence(&binder);

        let late_first = Completion {
            slot: LoadSlot::Screen,
            sequence: first,
            reference: "first.png".into(),
            result: Ok(RgbaImage::new(1, 1)),
        };
        let early_second = Completion {
            slot: LoadSlot::Screen,
            sequence: second,
            reference: "second.png".into(),
            result: Ok(RgbaImage::new(2, 2)),
        };
        for completion in [early_second, late_first] {
            if let Some(image) = loader.accept(completion) {
                binder.apply(&image, Some(&mut model), &mut config);
            }
        }
        assert_eq!(model.screen().texture().unwrap().reference, "second.png");
        assert_eq!(config.screen_image.as_deref(), Some("second.png"));
        assert!(binder.pending_reference().is_none());
    }

    #[test]
    fn restoring_without_reference_blanks_screen_and_drops_in_flight() {
        let mut loader = TextureLoader::new();
        let mut binder = ScreenTextureBinder::new();
        let mut model = DeviceModel::builtin_phone();
        let mut config = SceneConfiguration::default();
        binder.apply(&loaded(1, "old.png", 2), Some(&mut model), &mut config);

        binder.request("/missing/dropped.png", &mut loader);
        let in_flight = loader_sequence(&binder);
        binder.restore(None, Some(&mut model), &mut loader);

        assert!(model.screen().texture().is_none());
        assert!(binder.pending_reference().is_none());
        let late = Completion {
            slot: LoadSlot::Screen,
            sequence: in_flight,
            reference: "dropped.png".into(),
            result: Ok(RgbaImage::new(1, 1)),
        };
        assert!(loader.accept(late).is_none());
    }

    #[test]
    fn restoring_with_reference_keeps_texture_until_loaded() {
        let mut loader = TextureLoader::new();
        let mut binder = ScreenTextureBinder::new();
        let mut model = DeviceModel::builtin_phone();
        let mut config = SceneConfiguration::default();
        binder.apply(&loaded(1, "old.png", 2), Some(&mut model), &mut config);

        binder.restore(Some("/missing/project.png"), Some(&mut model), &mut loader);
        assert_eq!(model.screen().texture().unwrap().reference, "old.png");
        assert_eq!(binder.pending_reference(), Some("/missing/project.png"));
    }

    fn loader_sequence(binder: &ScreenTextureBinder) -> u64 {
        binder.requested.as_ref().map(|(s, _)| *s).unwrap_or(0)
    }
}

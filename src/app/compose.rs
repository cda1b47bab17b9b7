use crate::assets::loader::{LoadSlot, LoadedImage, TextureLoader};
use crate::assets::DeviceModel;
use crate::render::background::{self, BackgroundPlan, TextureTransform, GRADIENT_RESOLUTION};
use crate::render::camera::CameraRig;
use crate::render::preview::{BackgroundFill, DerivedFrame, EnvironmentLook, Lights};
use crate::scene::{
    BackgroundFit, EnvironmentSettings, LightingSettings, SceneConfiguration, Srgba,
};
use glam::{Mat4, Quat, Vec2};
use image::RgbaImage;
use std::sync::Arc;

/// Ambient and directional intensities scale with the environment intensity;
/// the directional light orbits the Y axis with the environment rotation.
pub fn derive_lights(lighting: &LightingSettings, environment: &EnvironmentSettings) -> Lights {
    Lights {
        ambient: lighting.ambient_intensity * environment.intensity,
        directional: lighting.directional_intensity * environment.intensity,
        directional_position: Quat::from_rotation_y(environment.rotation)
            * lighting.directional_position,
    }
}

fn differs<T: PartialEq>(
    previous: Option<&SceneConfiguration>,
    current: &SceneConfiguration,
    field: impl Fn(&SceneConfiguration) -> T,
) -> bool {
    previous.map_or(true, |p| field(p) != field(current))
}

#[derive(Debug, Clone)]
enum BackgroundState {
    Color(Srgba),
    Gradient(Arc<RgbaImage>),
    Image(Arc<RgbaImage>),
}

/// Watches the scene configuration and keeps the derived render state in step.
pub struct SceneComposer {
    last: Option<SceneConfiguration>,
    rig: CameraRig,
    background: BackgroundState,
    background_fit: BackgroundFit,
    pending_background: Option<u64>,
    lights: Lights,
    environment: EnvironmentLook,
    environment_intensity: f32,
    model_matrix: Mat4,
}

impl SceneComposer {
    pub fn new(config: &SceneConfiguration) -> Self {
        Self {
            last: None,
            rig: CameraRig::new(&config.camera),
            background: BackgroundState::Color(crate::scene::background::FALLBACK_COLOR),
            background_fit: config.background.fit,
            pending_background: None,
            lights: derive_lights(&config.lighting, &config.environment),
            environment: EnvironmentLook::for_preset(config.environment.preset),
            environment_intensity: config.environment.intensity,
            model_matrix: config.model.matrix(),
        }
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut CameraRig {
        &mut self.rig
    }

    /// Forgets the last observed configuration so the next `sync` re-derives
    /// everything, e.g. after a new model was loaded.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Rebuilds the camera rig from `config` and re-derives everything.
    pub fn reload(&mut self, config: &SceneConfiguration) {
        self.rig = CameraRig::new(&config.camera);
        self.invalidate();
    }

    pub fn has_pending_background(&self) -> bool {
        self.pending_background.is_some()
    }

    /// Re-derives rendering state for whatever changed since the last call.
    /// Returns true if anything was re-derived.
    pub fn sync(
        &mut self,
        config: &SceneConfiguration,
        model: Option<&mut DeviceModel>,
        loader: &mut TextureLoader,
    ) -> bool {
        if self.last.as_ref() == Some(config) {
            return false;
        }
        let previous = self.last.take();
        let previous = previous.as_ref();

        let camera = &config.camera;
        if differs(previous, config, |c| c.camera.camera_type) {
            self.rig.switch_to(camera.camera_type, camera.limits());
        } else if differs(previous, config, |c| c.camera.limits()) {
            self.rig.set_limits(camera.limits());
        }
        // The rig was built from this configuration; only later edits move it.
        if previous.is_some() && differs(previous, config, |c| c.camera.position) {
            self.rig.place(camera.position);
        }

        if differs(previous, config, |c| c.background.source.clone()) {
            log::debug!("Background source now {}", config.background.source.label());
            self.apply_plan(
                background::generate(&config.background.source, GRADIENT_RESOLUTION),
                loader,
            );
        }
        self.background_fit = config.background.fit;

        if let Some(model) = model {
            let params = config.material.params();
            if *model.body().material() != params {
                model.body_mut().set_material(params);
            }
        }

        self.lights = derive_lights(&config.lighting, &config.environment);
        self.environment = EnvironmentLook::for_preset(config.environment.preset);
        self.environment_intensity = config.environment.intensity;
        self.model_matrix = config.model.matrix();

        log::debug!("Scene re-derived");
        self.last = Some(config.clone());
        true
    }

    fn apply_plan(&mut self, plan: BackgroundPlan, loader: &mut TextureLoader) {
        match plan {
            BackgroundPlan::Color(color) => {
                loader.supersede(LoadSlot::Background);
                self.pending_background = None;
                self.background = BackgroundState::Color(color);
            }
            BackgroundPlan::Texture(image) => {
                loader.supersede(LoadSlot::Background);
                self.pending_background = None;
                self.background = BackgroundState::Gradient(image);
            }
            // The previous background stays up until the image arrives.
            BackgroundPlan::Load(url) => {
                self.pending_background = Some(loader.request(LoadSlot::Background, &url));
            }
        }
    }

    /// Takes an accepted background completion. Other slots are ignored.
    pub fn apply_background(&mut self, loaded: &LoadedImage) -> bool {
        if loaded.slot != LoadSlot::Background {
            return false;
        }
        self.background = BackgroundState::Image(loaded.image.clone());
        self.pending_background = None;
        true
    }

    /// Moves the live camera to its default spot and records it in `config`.
    pub fn reset_camera(&mut self, config: &mut SceneConfiguration) {
        config.camera.position = self.rig.reset();
    }

    /// Copies the orbited camera position into `config` without re-placing the
    /// rig, so pan and target survive until the next explicit change.
    pub fn record_camera(&mut self, config: &mut SceneConfiguration) {
        let position = self.rig.position();
        config.camera.position = position;
        if let Some(last) = &mut self.last {
            last.camera.position = position;
        }
    }

    /// Per-frame controller synchronization.
    pub fn update(&mut self) {
        self.rig.update();
    }

    pub fn frame(&self, viewport: Vec2) -> DerivedFrame {
        let background = match &self.background {
            BackgroundState::Color(color) => BackgroundFill::Color(*color),
            BackgroundState::Gradient(image) => BackgroundFill::Texture {
                image: image.clone(),
                transform: TextureTransform::IDENTITY,
            },
            BackgroundState::Image(image) => {
                let (w, h) = image.dimensions();
                BackgroundFill::Texture {
                    image: image.clone(),
                    transform: background::fit_transform([w, h], viewport, self.background_fit),
                }
            }
        };
        let position = self.rig.position();
        DerivedFrame {
            view_projection: self.rig.view_projection(viewport),
            camera_position: position,
            camera_forward: (self.rig.target() - position).normalize_or_zero(),
            background,
            lights: self.lights,
            environment: self.environment,
            environment_intensity: self.environment_intensity,
            model_matrix: self.model_matrix,
        }
    }
}

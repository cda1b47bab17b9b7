pub mod background;
pub mod serialization;

pub use background::{Background, BackgroundFit, BackgroundSource, Srgba};

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Which of the two rig cameras is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    Perspective,
    #[default]
    Orthographic,
}

impl CameraType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Perspective => "Perspective",
            Self::Orthographic => "Orthographic",
        }
    }
}

/// Orbit/zoom/pan constraints for one camera type.
///
/// `min_zoom`/`max_zoom` bound the orbit distance for the perspective camera
/// and the zoom factor for the orthographic one.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraLimits {
    /// Radians either side of the front view, for both polar and azimuth.
    pub rotation_limit: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub pan_limit: f32,
}

impl CameraLimits {
    pub const PERSPECTIVE: Self = Self {
        rotation_limit: std::f32::consts::FRAC_PI_6,
        min_zoom: 0.15,
        max_zoom: 0.25,
        pan_limit: 0.05,
    };

    pub const ORTHOGRAPHIC: Self = Self {
        rotation_limit: std::f32::consts::FRAC_PI_6,
        min_zoom: 3000.0,
        max_zoom: 8000.0,
        pan_limit: 0.1,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub camera_type: CameraType,
    pub position: Vec3,
    pub perspective: CameraLimits,
    pub orthographic: CameraLimits,
}

impl CameraSettings {
    pub fn limits(&self) -> CameraLimits {
        self.limits_for(self.camera_type)
    }

    pub fn limits_for(&self, camera_type: CameraType) -> CameraLimits {
        match camera_type {
            CameraType::Perspective => self.perspective,
            CameraType::Orthographic => self.orthographic,
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            camera_type: CameraType::Orthographic,
            position: Vec3::new(0.0, 0.0, 0.20),
            perspective: CameraLimits::PERSPECTIVE,
            orthographic: CameraLimits::ORTHOGRAPHIC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingSettings {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub directional_position: Vec3,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.0,
            directional_intensity: 10.0,
            directional_position: Vec3::new(2.0, 2.0, 2.0),
        }
    }
}

/// Named lighting/reflection map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    Apartment,
    City,
    Dawn,
    Forest,
    Lobby,
    Night,
    Park,
    Studio,
    #[default]
    Sunset,
    Warehouse,
}

impl EnvironmentPreset {
    /// Sidebar order.
    pub const ALL: [Self; 10] = [
        Self::Sunset,
        Self::Dawn,
        Self::Night,
        Self::Warehouse,
        Self::Forest,
        Self::Apartment,
        Self::Studio,
        Self::City,
        Self::Park,
        Self::Lobby,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Apartment => "Apartment",
            Self::City => "City",
            Self::Dawn => "Dawn",
            Self::Forest => "Forest",
            Self::Lobby => "Lobby",
            Self::Night => "Night",
            Self::Park => "Park",
            Self::Studio => "Studio",
            Self::Sunset => "Sunset",
            Self::Warehouse => "Warehouse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSettings {
    pub preset: EnvironmentPreset,
    pub intensity: f32,
    /// Rotation of the light rig about Y, radians.
    pub rotation: f32,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            preset: EnvironmentPreset::Sunset,
            intensity: 1.0,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum MockupMaterial {
    #[default]
    #[serde(rename = "glass")]
    Glass,
    #[serde(rename = "platinum")]
    Platinum,
    #[serde(rename = "clay light")]
    ClayLight,
    #[serde(rename = "clay dark")]
    ClayDark,
}

impl MockupMaterial {
    pub const ALL: [Self; 4] = [Self::Glass, Self::Platinum, Self::ClayLight, Self::ClayDark];

    pub fn label(self) -> &'static str {
        match self {
            Self::Glass => "Glass",
            Self::Platinum => "Platinum",
            Self::ClayLight => "Clay Light",
            Self::ClayDark => "Clay Dark",
        }
    }
}

/// Device placement. The sidebar keeps position in [-0.1, 0.1] and rotation
/// in [-30°, 30°] per axis; values outside are accepted here.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelTransform {
    pub position: Vec3,
    /// XYZ Euler angles, radians.
    pub rotation: Vec3,
}

impl ModelTransform {
    pub const POSITION_LIMIT: f32 = 0.1;
    pub const ROTATION_LIMIT_DEG: f32 = 30.0;

    pub fn matrix(&self) -> Mat4 {
        compose_transform_matrix(self.position, self.rotation, Vec3::ONE)
    }
}

/// Everything the editor session lets the user change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneConfiguration {
    pub camera: CameraSettings,
    pub lighting: LightingSettings,
    pub environment: EnvironmentSettings,
    pub background: Background,
    pub material: MockupMaterial,
    pub model: ModelTransform,
    /// File path or `data:` URL of the screenshot bound to the screen.
    pub screen_image: Option<String>,
}

impl SceneConfiguration {
    pub fn with_limits(perspective: CameraLimits, orthographic: CameraLimits) -> Self {
        let mut config = Self::default();
        config.camera.perspective = perspective;
        config.camera.orthographic = orthographic;
        config
    }

    /// Applies a named starting point on top of the current settings.
    /// Returns false for unknown names.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        match name {
            "phone-1" => {
                self.background.source = BackgroundSource::LinearGradient {
                    angle_deg: 45.0,
                    stops: vec![Srgba::from_hex_u32(0xD5CCFF), Srgba::from_hex_u32(0x6B75FF)],
                };
                self.environment.preset = EnvironmentPreset::Studio;
                self.camera.camera_type = CameraType::Orthographic;
                self.material = MockupMaterial::Glass;
                self.model = ModelTransform {
                    position: Vec3::ZERO,
                    rotation: Vec3::new(-15.0, -30.0, -15.0) * (std::f32::consts::PI / 180.0),
                };
                true
            }
            _ => false,
        }
    }
}

/// Translation * XYZ-Euler rotation * scale.
pub fn compose_transform_matrix(position: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

use crate::scene::{
    Background, BackgroundFit, BackgroundSource, CameraType, EnvironmentPreset, MockupMaterial,
    SceneConfiguration,
};
use glam::Vec3;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vec3Data {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(v: Vec3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Scene settings as stored inside a project record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneData {
    pub camera_position: Vec3Data,
    pub ambient_light_intensity: f32,
    pub directional_light_intensity: f32,
    pub directional_light_position: Vec3Data,
    pub environment_preset: EnvironmentPreset,
    pub background_color: String,
    pub camera_type: CameraType,
    pub environment_intensity: f32,
    pub environment_rotation: f32,
    pub mockup_material: MockupMaterial,
    pub model_position: Vec3Data,
    pub model_rotation: Vec3Data,
    pub background_image_fit: BackgroundFit,
    pub screen_image: Option<String>,
}

impl From<&SceneConfiguration> for SceneData {
    fn from(config: &SceneConfiguration) -> Self {
        Self {
            camera_position: config.camera.position.into(),
            ambient_light_intensity: config.lighting.ambient_intensity,
            directional_light_intensity: config.lighting.directional_intensity,
            directional_light_position: config.lighting.directional_position.into(),
            environment_preset: config.environment.preset,
            background_color: config.background.source.to_css(),
            camera_type: config.camera.camera_type,
            environment_intensity: config.environment.intensity,
            environment_rotation: config.environment.rotation,
            mockup_material: config.material,
            model_position: config.model.position.into(),
            model_rotation: config.model.rotation.into(),
            background_image_fit: config.background.fit,
            screen_image: config.screen_image.clone(),
        }
    }
}

impl SceneData {
    /// Rebuilds a configuration. Camera limits are not persisted and come from
    /// `base`.
    pub fn to_configuration(&self, base: &SceneConfiguration) -> SceneConfiguration {
        let mut config = base.clone();
        config.camera.position = self.camera_position.into();
        config.camera.camera_type = self.camera_type;
        config.lighting.ambient_intensity = self.ambient_light_intensity;
        config.lighting.directional_intensity = self.directional_light_intensity;
        config.lighting.directional_position = self.directional_light_position.into();
        config.environment.preset = self.environment_preset;
        config.environment.intensity = self.environment_intensity;
        config.environment.rotation = self.environment_rotation;
        config.background = Background {
            source: BackgroundSource::parse_css(&self.background_color),
            fit: self.background_image_fit,
        };
        config.material = self.mockup_material;
        config.model.position = self.model_position.into();
        config.model.rotation = self.model_rotation.into();
        config.screen_image = self.screen_image.clone();
        config
    }
}

/// A saved project.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub scene_data: SceneData,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub updated_at: u64,
}

impl ProjectRecord {
    pub fn create(
        user_id: &str,
        name: &str,
        category: &str,
        config: &SceneConfiguration,
        now_ms: u64,
    ) -> Self {
        Self {
            id: project_id(user_id, name, now_ms),
            user_id: user_id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            scene_data: SceneData::from(config),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Replaces the stored scene; identity and creation time are kept.
    pub fn update_scene(&mut self, config: &SceneConfiguration, now_ms: u64) {
        self.scene_data = SceneData::from(config);
        self.updated_at = now_ms.max(self.created_at);
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

fn project_id(user_id: &str, name: &str, created_at: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(name.as_bytes());
    hasher.update(created_at.to_le_bytes());
    hasher
        .finalize()
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

pub fn save_project_to_file(project: &ProjectRecord, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_project_from_file(path: &Path) -> Result<ProjectRecord> {
    let json = std::fs::read_to_string(path)?;
    let project: ProjectRecord = serde_json::from_str(&json)?;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ModelTransform, Srgba};

    fn edited_scene() -> SceneConfiguration {
        let mut config = SceneConfiguration::default();
        config.camera.camera_type = CameraType::Perspective;
        config.camera.position = Vec3::new(0.0, 0.01, 0.25);
        config.lighting.ambient_intensity = 0.4;
        config.lighting.directional_position = Vec3::new(-1.0, 3.0, 2.0);
        config.environment.preset = EnvironmentPreset::Night;
        config.environment.intensity = 1.7;
        config.environment.rotation = 2.3;
        config.background = Background {
            source: BackgroundSource::LinearGradient {
                angle_deg: 45.0,
                stops: vec![Srgba::from_hex_u32(0xFF0000), Srgba::from_hex_u32(0x0000FF)],
            },
            fit: BackgroundFit::Fit,
        };
        config.material = MockupMaterial::ClayDark;
        config.model = ModelTransform {
            position: Vec3::new(0.05, -0.1, 0.02),
            rotation: Vec3::new(0.1, -0.52, 0.3),
        };
        config.screen_image = Some("shots/home.png".to_string());
        config
    }

    #[test]
    fn scene_data_uses_persisted_key_names() {
        let data = SceneData::from(&SceneConfiguration::default());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["cameraType"], "orthographic");
        assert_eq!(json["mockupMaterial"], "glass");
        assert_eq!(json["environmentPreset"], "sunset");
        assert_eq!(json["backgroundColor"], "#1E1E1E");
        assert_eq!(json["backgroundImageFit"], "fill");
        assert!(json["screenImage"].is_null());
        assert_eq!(json["cameraPosition"]["z"].as_f64().unwrap() as f32, 0.20);
    }

    #[test]
    fn configuration_round_trips_through_record() {
        let original = edited_scene();
        let record = ProjectRecord::create("u-1", "Launch shot", "phone", &original, 1_000);
        let json = serde_json::to_string_pretty(&record).unwrap();
        let loaded: ProjectRecord = serde_json::from_str(&json).unwrap();
        let restored = loaded
            .scene_data
            .to_configuration(&SceneConfiguration::default());

        assert_eq!(restored.camera.camera_type, original.camera.camera_type);
        assert_eq!(restored.material, original.material);
        assert_eq!(restored.background, original.background);
        assert_eq!(restored.screen_image, original.screen_image);
        assert!((restored.model.position - original.model.position).length() < 1e-6);
        assert!((restored.model.rotation - original.model.rotation).length() < 1e-6);
        assert!((restored.camera.position - original.camera.position).length() < 1e-6);
        assert_eq!(restored, original);
    }

    #[test]
    fn update_keeps_identity() {
        let mut config = SceneConfiguration::default();
        let mut record = ProjectRecord::create("u-1", "Shot", "phone", &config, 5_000);
        let id = record.id.clone();
        config.material = MockupMaterial::Platinum;
        record.update_scene(&config, 9_000);
        assert_eq!(record.id, id);
        assert_eq!(record.created_at, 5_000);
        assert_eq!(record.updated_at, 9_000);
        assert_eq!(record.scene_data.mockup_material, MockupMaterial::Platinum);
    }

    #[test]
    fn project_ids_differ_by_creation_time() {
        let config = SceneConfiguration::default();
        let a = ProjectRecord::create("u", "n", "c", &config, 1);
        let b = ProjectRecord::create("u", "n", "c", &config, 2);
        assert_eq!(a.id.len(), 16);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_save_load_stress_loop_via_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let mut record = ProjectRecord::create("u-1", "Loop", "phone", &edited_scene(), 42);

        for _ in 0..50 {
            save_project_to_file(&record, &path).unwrap();
            record = load_project_from_file(&path).unwrap();
            assert_eq!(record.name, "Loop");
            assert_eq!(record.scene_data.mockup_material, MockupMaterial::ClayDark);
        }
    }

    #[test]
    fn loading_garbage_reports_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_project_from_file(&path),
            Err(SerializationError::Json(_))
        ));
        assert!(matches!(
            load_project_from_file(&dir.path().join("missing.json")),
            Err(SerializationError::Io(_))
        ));
    }
}

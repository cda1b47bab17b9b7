use crate::scene::{CameraLimits, SceneConfiguration};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MOCKUP_STUDIO_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "mockup-studio.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Editor start-up settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub window_size: [f32; 2],
    /// JSON device model; the built-in phone is used when unset.
    pub model_path: Option<PathBuf>,
    pub user_id: String,
    pub perspective: CameraLimits,
    pub orthographic: CameraLimits,
    pub start_preset: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            window_size: [1440.0, 900.0],
            model_path: None,
            user_id: std::env::var("USER")
                .ok()
                .filter(|user| !user.trim().is_empty())
                .unwrap_or_else(|| "local".to_string()),
            perspective: CameraLimits::PERSPECTIVE,
            orthographic: CameraLimits::ORTHOGRAPHIC,
            start_preset: None,
        }
    }
}

impl EditorConfig {
    /// `$MOCKUP_STUDIO_CONFIG`, else `./mockup-studio.json` if present, else
    /// defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(local);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn initial_scene(&self) -> SceneConfiguration {
        let mut scene = SceneConfiguration::with_limits(self.perspective, self.orthographic);
        if let Some(preset) = &self.start_preset {
            if !scene.apply_preset(preset) {
                log::warn!("Unknown start preset {preset:?}; using defaults");
            }
        }
        scene
    }
}

pub mod loader;
pub mod screen;

use crate::render::material::MaterialParams;
use crate::scene::MockupMaterial;
use glam::Vec3;
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

pub const BODY_PART: &str = "PhoneBody";
pub const SCREEN_PART: &str = "Screen";

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model JSON at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("part {part}: index {index} out of range for {vertices} vertices")]
    IndexOutOfRange {
        part: String,
        index: u32,
        vertices: usize,
    },
    #[error("part {part}: {what} count {found} does not match {vertices} positions")]
    AttributeCount {
        part: String,
        what: &'static str,
        found: usize,
        vertices: usize,
    },
}

/// One named triangle list of a device model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshPart {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshPart {
    fn validate(&self) -> Result<(), AssetError> {
        let vertices = self.positions.len();
        for (what, found) in [("normal", self.normals.len()), ("uv", self.uvs.len())] {
            if found != 0 && found != vertices {
                return Err(AssetError::AttributeCount {
                    part: self.name.clone(),
                    what,
                    found,
                    vertices,
                });
            }
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(AssetError::IndexOutOfRange {
                part: self.name.clone(),
                index,
                vertices,
            });
        }
        Ok(())
    }

    pub fn position(&self, index: u32) -> Vec3 {
        Vec3::from_array(self.positions[index as usize])
    }

    /// Falls back to +Z for parts authored without normals.
    pub fn normal(&self, index: u32) -> Vec3 {
        self.normals
            .get(index as usize)
            .map(|n| Vec3::from_array(*n))
            .unwrap_or(Vec3::Z)
    }

    pub fn uv(&self, index: u32) -> [f32; 2] {
        self.uvs.get(index as usize).copied().unwrap_or([0.0, 0.0])
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| [tri[0], tri[1], tri[2]])
    }
}

#[derive(Debug, serde::Deserialize)]
struct ModelDocument {
    parts: Vec<MeshPart>,
}

/// The device body. Owns the material the preview shades it with.
#[derive(Debug, Clone)]
pub struct BodyHandle {
    mesh: MeshPart,
    material: MaterialParams,
}

impl BodyHandle {
    pub fn mesh(&self) -> &MeshPart {
        &self.mesh
    }

    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    pub fn set_material(&mut self, params: MaterialParams) {
        self.material = params;
    }
}

#[derive(Debug, Clone)]
pub struct ScreenTexture {
    pub reference: String,
    pub image: Arc<RgbaImage>,
}

/// The screen surface. Drawn unlit with whatever texture is bound.
#[derive(Debug, Clone)]
pub struct ScreenHandle {
    mesh: MeshPart,
    texture: Option<ScreenTexture>,
}

impl ScreenHandle {
    pub fn mesh(&self) -> &MeshPart {
        &self.mesh
    }

    pub fn texture(&self) -> Option<&ScreenTexture> {
        self.texture.as_ref()
    }

    pub fn bind_texture(&mut self, reference: &str, image: Arc<RgbaImage>) {
        self.texture = Some(ScreenTexture {
            reference: reference.to_string(),
            image,
        });
    }

    pub fn clear_texture(&mut self) {
        self.texture = None;
    }
}

#[derive(Debug, Clone)]
pub struct DeviceModel {
    name: String,
    body: BodyHandle,
    screen: ScreenHandle,
}

impl DeviceModel {
    /// Picks the two attachment parts out of `parts`. Returns `None` when
    /// either is missing; the caller then renders no model.
    pub fn from_parts(name: &str, parts: Vec<MeshPart>) -> Option<Self> {
        let mut body = None;
        let mut screen = None;
        for part in parts {
            match part.name.as_str() {
                BODY_PART => body = Some(part),
                SCREEN_PART => screen = Some(part),
                other => log::debug!("Model {name}: ignoring part {other}"),
            }
        }
        let (Some(body), Some(screen)) = (body, screen) else {
            log::debug!("Model {name} lacks {BODY_PART} or {SCREEN_PART}; nothing to render");
            return None;
        };
        Some(Self {
            name: name.to_string(),
            body: BodyHandle {
                mesh: body,
                material: MockupMaterial::default().params(),
            },
            screen: ScreenHandle {
                mesh: screen,
                texture: None,
            },
        })
    }

    pub fn from_json_str(name: &str, json: &str) -> Result<Option<Self>, AssetError> {
        let document: ModelDocument =
            serde_json::from_str(json).map_err(|source| AssetError::Parse {
                path: name.to_string(),
                source,
            })?;
        for part in &document.parts {
            part.validate()?;
        }
        Ok(Self::from_parts(name, document.parts))
    }

    pub fn load_from_path(path: &Path) -> Result<Option<Self>, AssetError> {
        let json = std::fs::read_to_string(path).map_err(|source| AssetError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("model");
        let model = Self::from_json_str(name, &json)?;
        if let Some(model) = &model {
            log::info!(
                "Loaded model {} ({} body triangles)",
                model.name,
                model.body.mesh.indices.len() / 3
            );
        }
        Ok(model)
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &BodyHandle {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut BodyHandle {
        &mut self.body
    }

    pub fn screen(&self) -> &ScreenHandle {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut ScreenHandle {
        &mut self.screen
    }

    /// A rounded-slab phone, roughly 62 × 128 × 7.5 mm, with a screen quad
    /// floating just above its front face.
    pub fn builtin_phone() -> Self {
        const WIDTH: f32 = 0.062;
        const HEIGHT: f32 = 0.128;
        const DEPTH: f32 = 0.0075;
        const CORNER_RADIUS: f32 = 0.008;
        const BEZEL: f32 = 0.003;

        let body = rounded_slab(BODY_PART, WIDTH, HEIGHT, DEPTH, CORNER_RADIUS, 6);
        let screen = screen_quad(WIDTH - 2.0 * BEZEL, HEIGHT - 2.0 * BEZEL, DEPTH * 0.5 + 0.0002);
        Self {
            name: "builtin-phone".to_string(),
            body: BodyHandle {
                mesh: body,
                material: MockupMaterial::default().params(),
            },
            screen: ScreenHandle {
                mesh: screen,
                texture: None,
            },
        }
    }
}

fn rounded_slab(
    name: &str,
    width: f32,
    height: f32,
    depth: f32,
    radius: f32,
    corner_segments: u32,
) -> MeshPart {
    let half_w = width * 0.5;
    let half_h = height * 0.5;
    let half_d = depth * 0.5;
    let radius = radius.min(half_w).min(half_h);

    // Counter-clockwise outline seen from +Z, with the outward direction of
    // each point.
    let mut outline: Vec<([f32; 2], [f32; 2])> = Vec::new();
    let corners = [
        (half_w - radius, half_h - radius),
        (-(half_w - radius), half_h - radius),
        (-(half_w - radius), -(half_h - radius)),
        (half_w - radius, -(half_h - radius)),
    ];
    for (corner, (cx, cy)) in corners.into_iter().enumerate() {
        for segment in 0..=corner_segments {
            let angle = (corner as f32 + segment as f32 / corner_segments as f32)
                * std::f32::consts::FRAC_PI_2;
            let (sin, cos) = angle.sin_cos();
            outline.push(([cx + radius * cos, cy + radius * sin], [cos, sin]));
        }
    }
    let ring = outline.len() as u32;

    let mut part = MeshPart {
        name: name.to_string(),
        positions: Vec::new(),
        normals: Vec::new(),
        uvs: Vec::new(),
        indices: Vec::new(),
    };
    let uv_of = |p: [f32; 2]| [p[0] / width + 0.5, 0.5 - p[1] / height];

    // Caps: a centre vertex fanned out to the outline.
    for (z, normal_z) in [(half_d, 1.0f32), (-half_d, -1.0)] {
        let base = part.positions.len() as u32;
        part.positions.push([0.0, 0.0, z]);
        part.normals.push([0.0, 0.0, normal_z]);
        part.uvs.push([0.5, 0.5]);
        for (point, _) in &outline {
            part.positions.push([point[0], point[1], z]);
            part.normals.push([0.0, 0.0, normal_z]);
            part.uvs.push(uv_of(*point));
        }
        for i in 0..ring {
            let a = base + 1 + i;
            let b = base + 1 + (i + 1) % ring;
            if normal_z > 0.0 {
                part.indices.extend([base, a, b]);
            } else {
                part.indices.extend([base, b, a]);
            }
        }
    }

    // Side wall with smooth outward normals.
    let front = part.positions.len() as u32;
    for (z, v) in [(half_d, 0.0f32), (-half_d, 1.0)] {
        for (i, (point, dir)) in outline.iter().enumerate() {
            part.positions.push([point[0], point[1], z]);
            part.normals.push([dir[0], dir[1], 0.0]);
            part.uvs.push([i as f32 / ring as f32, v]);
        }
    }
    let back = front + ring;
    for i in 0..ring {
        let j = (i + 1) % ring;
        part.indices
            .extend([front + i, back + i, back + j, front + i, back + j, front + j]);
    }
    part
}

fn screen_quad(width: f32, height: f32, z: f32) -> MeshPart {
    let half_w = width * 0.5;
    let half_h = height * 0.5;
    MeshPart {
        name: SCREEN_PART.to_string(),
        positions: vec![
            [-half_w, half_h, z],
            [half_w, half_h, z],
            [half_w, -half_h, z],
            [-half_w, -half_h, z],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 3, 2, 0, 2, 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(name: &str) -> MeshPart {
        MeshPart {
            name: name.to_string(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![],
            uvs: vec![],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn builtin_phone_has_both_attachments() {
        let model = DeviceModel::builtin_phone();
        assert_eq!(model.body().mesh().name, BODY_PART);
        assert_eq!(model.screen().mesh().name, SCREEN_PART);
        model.body().mesh().validate().unwrap();
        model.screen().mesh().validate().unwrap();
        assert!(model.screen().texture().is_none());
        let max_x = model
            .body()
            .mesh()
            .positions
            .iter()
            .map(|p| p[0])
            .fold(f32::MIN, f32::max);
        assert!((max_x - 0.031).abs() < 1e-5);
    }

    #[test]
    fn screen_quad_faces_forward() {
        let model = DeviceModel::builtin_phone();
        let screen = model.screen().mesh();
        for [a, b, c] in screen.triangles() {
            let normal = (screen.position(b) - screen.position(a))
                .cross(screen.position(c) - screen.position(a));
            assert!(normal.z > 0.0);
        }
    }

    #[test]
    fn missing_parts_yield_no_model() {
        assert!(DeviceModel::from_parts("m", vec![triangle(BODY_PART)]).is_none());
        assert!(DeviceModel::from_parts("m", vec![triangle(SCREEN_PART)]).is_none());
        assert!(DeviceModel::from_parts(
            "m",
            vec![triangle(BODY_PART), triangle("Buttons"), triangle(SCREEN_PART)]
        )
        .is_some());
    }

    #[test]
    fn model_document_parses_and_validates() {
        let json = r#"{ "parts": [
            { "name": "PhoneBody", "positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0,1,2] },
            { "name": "Screen", "positions": [[0,0,0],[1,0,0],[0,1,0]],
              "uvs": [[0,0],[1,0],[0,1]], "indices": [0,1,2] }
        ] }"#;
        let model = DeviceModel::from_json_str("doc", json).unwrap().unwrap();
        assert_eq!(model.screen().mesh().uv(1), [1.0, 0.0]);
        assert_eq!(model.body().mesh().normal(0), Vec3::Z);

        let broken = r#"{ "parts": [
            { "name": "PhoneBody", "positions": [[0,0,0]], "indices": [0,1,2] }
        ] }"#;
        assert!(matches!(
            DeviceModel::from_json_str("doc", broken),
            Err(AssetError::IndexOutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            DeviceModel::from_json_str("doc", "[]"),
            Err(AssetError::Parse { .. })
        ));
    }

    #[test]
    fn load_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = DeviceModel::load_from_path(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(AssetError::Read { .. })));
    }

    #[test]
    fn handles_replace_material_and_texture() {
        let mut model = DeviceModel::builtin_phone();
        model
            .body_mut()
            .set_material(MockupMaterial::Platinum.params());
        assert_eq!(*model.body().material(), MockupMaterial::Platinum.params());

        let image = Arc::new(RgbaImage::new(2, 2));
        model.screen_mut().bind_texture("a.png", image.clone());
        model.screen_mut().bind_texture("b.png", image);
        let bound = model.screen().texture().unwrap();
        assert_eq!(bound.reference, "b.png");
    }
}

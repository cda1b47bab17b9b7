//! CPU preview of the composed scene.
//!
//! The device is projected through the rig camera into egui meshes. Body
//! triangles are shaded per vertex from the material, the light rig and the
//! environment look; the screen is drawn unlit with its bound texture. All
//! triangles are depth sorted back to front and batched by texture.

use crate::assets::{DeviceModel, MeshPart};
use crate::render::background::TextureTransform;
use crate::render::material::MaterialParams;
use crate::scene::{EnvironmentPreset, Srgba};
use egui::epaint::{Vertex, WHITE_UV};
use egui::{pos2, Color32, Mesh, Pos2, Rect, TextureId};
use glam::{Mat3, Mat4, Vec3};
use image::RgbaImage;
use std::sync::Arc;

/// Directional intensity that maps to a unit key light in the preview.
const DIRECTIONAL_REFERENCE: f32 = 10.0;
const EXPOSURE: f32 = 1.6;
const BLANK_SCREEN: Color32 = Color32::from_rgb(0x0B, 0x0B, 0x0D);
/// Pulls the screen ahead of the coplanar front face when sorting.
const SCREEN_DEPTH_BIAS: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lights {
    pub ambient: f32,
    pub directional: f32,
    pub directional_position: Vec3,
}

/// Hemisphere colours and key-light tint standing in for an environment map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentLook {
    pub sky: Srgba,
    pub ground: Srgba,
    pub key_tint: Srgba,
}

impl EnvironmentLook {
    pub fn for_preset(preset: EnvironmentPreset) -> Self {
        let (sky, ground, key_tint) = match preset {
            EnvironmentPreset::Apartment => (0xE8D8C4, 0x5A4A3C, 0xFFE6C8),
            EnvironmentPreset::City => (0xB8C4D0, 0x4A4E55, 0xF2F0EA),
            EnvironmentPreset::Dawn => (0xF4B9A0, 0x3C3550, 0xFFC8A8),
            EnvironmentPreset::Forest => (0xA8C8A0, 0x2E3A24, 0xF0F5DC),
            EnvironmentPreset::Lobby => (0xEDE3D2, 0x6A5E50, 0xFFF0DC),
            EnvironmentPreset::Night => (0x2A3350, 0x0C0E16, 0x9AA8D0),
            EnvironmentPreset::Park => (0xBFD8F0, 0x4E6A3A, 0xFFF6E0),
            EnvironmentPreset::Studio => (0xF2F2F2, 0x8A8A8A, 0xFFFFFF),
            EnvironmentPreset::Sunset => (0xF6A66B, 0x40303A, 0xFFB878),
            EnvironmentPreset::Warehouse => (0xC9C2B5, 0x3E3A35, 0xFFE9CC),
        };
        Self {
            sky: Srgba::from_hex_u32(sky),
            ground: Srgba::from_hex_u32(ground),
            key_tint: Srgba::from_hex_u32(key_tint),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackgroundFill {
    Color(Srgba),
    Texture {
        image: Arc<RgbaImage>,
        transform: TextureTransform,
    },
}

/// Everything the preview needs for one frame.
#[derive(Debug, Clone)]
pub struct DerivedFrame {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub camera_forward: Vec3,
    pub background: BackgroundFill,
    pub lights: Lights,
    pub environment: EnvironmentLook,
    pub environment_intensity: f32,
    pub model_matrix: Mat4,
}

struct CachedTexture {
    source: Arc<RgbaImage>,
    handle: egui::TextureHandle,
}

/// Keeps the GPU copies of the background and screen textures.
#[derive(Default)]
pub struct PreviewRenderer {
    background: Option<CachedTexture>,
    screen: Option<CachedTexture>,
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paint(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        rect: Rect,
        frame: &DerivedFrame,
        model: Option<&DeviceModel>,
    ) {
        match &frame.background {
            BackgroundFill::Color(color) => {
                painter.rect_filled(rect, 0.0, to_color32(*color));
            }
            BackgroundFill::Texture { image, transform } => {
                let id = upload(&mut self.background, ctx, "preview-background", image);
                painter.image(id, rect, background_uv(transform), Color32::WHITE);
            }
        }

        let Some(model) = model else {
            return;
        };
        let screen_texture = model
            .screen()
            .texture()
            .map(|texture| upload(&mut self.screen, ctx, "preview-screen", &texture.image));
        for mesh in device_meshes(model, frame, rect, screen_texture) {
            painter.add(egui::Shape::mesh(mesh));
        }
    }
}

fn upload(
    slot: &mut Option<CachedTexture>,
    ctx: &egui::Context,
    name: &str,
    image: &Arc<RgbaImage>,
) -> TextureId {
    if let Some(cached) = slot {
        if Arc::ptr_eq(&cached.source, image) {
            return cached.handle.id();
        }
    }
    let (w, h) = image.dimensions();
    let color_image =
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], image.as_raw());
    let handle = match slot.take() {
        Some(mut cached) => {
            cached.handle.set(color_image, egui::TextureOptions::LINEAR);
            cached.handle
        }
        None => ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR),
    };
    let id = handle.id();
    *slot = Some(CachedTexture {
        source: image.clone(),
        handle,
    });
    id
}

/// UV window for a background texture. Texture offsets count from the
/// bottom edge, egui UVs from the top.
pub fn background_uv(transform: &TextureTransform) -> Rect {
    let TextureTransform { repeat, offset } = *transform;
    Rect::from_min_max(
        pos2(offset.x, 1.0 - offset.y - repeat.y),
        pos2(offset.x + repeat.x, 1.0 - offset.y),
    )
}

/// Maps a world point to a position inside `rect`. Points outside the
/// depth range are rejected.
pub fn project(view_projection: &Mat4, point: Vec3, rect: Rect) -> Option<Pos2> {
    let clip = *view_projection * point.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if !(-1.0..=1.0).contains(&ndc.z) {
        return None;
    }
    let x = rect.left() + (ndc.x * 0.5 + 0.5) * rect.width();
    let y = rect.top() + (0.5 - ndc.y * 0.5) * rect.height();
    Some(pos2(x, y))
}

struct Triangle {
    depth: f32,
    texture: TextureId,
    vertices: [Vertex; 3],
}

struct Projected {
    screen: [Pos2; 3],
    depth: f32,
    world: [Vec3; 3],
}

/// Depth is the centroid's distance along the view direction.
fn project_triangle(
    part: &MeshPart,
    tri: [u32; 3],
    frame: &DerivedFrame,
    rect: Rect,
) -> Option<Projected> {
    let world = tri.map(|i| frame.model_matrix.transform_point3(part.position(i)));
    let mut screen = [Pos2::ZERO; 3];
    for (slot, point) in screen.iter_mut().zip(world) {
        *slot = project(&frame.view_projection, point, rect)?;
    }
    let centroid = (world[0] + world[1] + world[2]) / 3.0;
    let depth = (centroid - frame.camera_position).dot(frame.camera_forward);
    Some(Projected {
        screen,
        depth,
        world,
    })
}

/// Counter-clockwise triangles in NDC come out clockwise with egui's y-down
/// axis, so front faces have a negative signed area here.
fn is_front_facing(screen: &[Pos2; 3]) -> bool {
    let ab = screen[1] - screen[0];
    let ac = screen[2] - screen[0];
    ab.x * ac.y - ab.y * ac.x < 0.0
}

/// Depth-sorted, texture-batched meshes for the body and screen.
pub fn device_meshes(
    model: &DeviceModel,
    frame: &DerivedFrame,
    rect: Rect,
    screen_texture: Option<TextureId>,
) -> Vec<Mesh> {
    let normal_matrix = Mat3::from_mat4(frame.model_matrix).inverse().transpose();
    let material = model.body().material();
    let cull_back = !material.double_sided;
    let mut triangles = Vec::new();

    let body = model.body().mesh();
    for tri in body.triangles() {
        let Some(projected) = project_triangle(body, tri, frame, rect) else {
            continue;
        };
        if cull_back && !is_front_facing(&projected.screen) {
            continue;
        }
        let mut vertices = [Vertex::default(); 3];
        for k in 0..3 {
            let normal = (normal_matrix * body.normal(tri[k])).normalize_or_zero();
            vertices[k] = Vertex {
                pos: projected.screen[k],
                uv: WHITE_UV,
                color: shade(frame, material, projected.world[k], normal),
            };
        }
        triangles.push(Triangle {
            depth: projected.depth,
            texture: TextureId::default(),
            vertices,
        });
    }

    let screen = model.screen().mesh();
    for tri in screen.triangles() {
        let Some(projected) = project_triangle(screen, tri, frame, rect) else {
            continue;
        };
        if !is_front_facing(&projected.screen) {
            continue;
        }
        let mut vertices = [Vertex::default(); 3];
        for k in 0..3 {
            let [u, v] = screen.uv(tri[k]);
            vertices[k] = match screen_texture {
                Some(_) => Vertex {
                    pos: projected.screen[k],
                    uv: pos2(u, v),
                    color: Color32::WHITE,
                },
                None => Vertex {
                    pos: projected.screen[k],
                    uv: WHITE_UV,
                    color: BLANK_SCREEN,
                },
            };
        }
        triangles.push(Triangle {
            depth: projected.depth - SCREEN_DEPTH_BIAS,
            texture: screen_texture.unwrap_or_default(),
            vertices,
        });
    }

    triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    batch(triangles)
}

fn batch(triangles: Vec<Triangle>) -> Vec<Mesh> {
    let mut meshes: Vec<Mesh> = Vec::new();
    for tri in triangles {
        let start_new = meshes
            .last()
            .map_or(true, |mesh| mesh.texture_id != tri.texture);
        if start_new {
            meshes.push(Mesh::with_texture(tri.texture));
        }
        if let Some(mesh) = meshes.last_mut() {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend(tri.vertices);
            mesh.indices.extend([base, base + 1, base + 2]);
        }
    }
    meshes
}

fn linear(color: Srgba) -> Vec3 {
    let [r, g, b, _] = color.0;
    let c = Vec3::new(r as f32, g as f32, b as f32) / 255.0;
    c * c
}

fn encode(channel: f32) -> u8 {
    let mapped = 1.0 - (-channel.max(0.0) * EXPOSURE).exp();
    (mapped.sqrt() * 255.0).round().clamp(0.0, 255.0) as u8
}

fn to_color32(color: Srgba) -> Color32 {
    let [r, g, b, a] = color.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Blinn-Phong with a hemisphere ambient term and a cheap clearcoat lobe.
/// Colours are approximated in a gamma-2 space.
fn shade(frame: &DerivedFrame, material: &MaterialParams, position: Vec3, normal: Vec3) -> Color32 {
    let view = (frame.camera_position - position).normalize_or_zero();
    let mut n = normal;
    if n.dot(view) < 0.0 {
        n = -n;
    }

    let base = linear(material.base_color);
    let sky = linear(frame.environment.sky);
    let ground = linear(frame.environment.ground);
    let env = frame.environment_intensity.max(0.0);
    let hemisphere = ground.lerp(sky, n.y * 0.5 + 0.5) * env;

    let light_dir = frame.lights.directional_position.normalize_or_zero();
    let key = linear(frame.environment.key_tint) * (frame.lights.directional / DIRECTIONAL_REFERENCE);
    let n_dot_l = n.dot(light_dir).max(0.0);
    let n_dot_v = n.dot(view).max(0.0);

    let diffuse_weight = (1.0 - material.metalness) * (1.0 - 0.9 * material.transmission);
    let diffuse = base
        * (Vec3::splat(frame.lights.ambient) + hemisphere * 0.8 + key * n_dot_l)
        * diffuse_weight;

    let half = (light_dir + view).normalize_or_zero();
    let n_dot_h = n.dot(half).max(0.0);
    let exponent = 2.0 + (1.0 - material.roughness).powi(2) * 254.0;
    let f0 = Vec3::splat(0.08 * material.reflectivity).lerp(base, material.metalness);
    let specular = f0 * key * n_dot_h.powf(exponent) * ((exponent + 2.0) / 8.0).min(16.0);

    let reflected = reflect(-view, n);
    let env_reflection = ground.lerp(sky, reflected.y * 0.5 + 0.5)
        * env
        * f0
        * (1.0 - 0.8 * material.roughness);

    let coat_exponent = 2.0 + (1.0 - material.clearcoat_roughness).powi(2) * 254.0;
    let coat = key * (material.clearcoat * 0.04 * n_dot_h.powf(coat_exponent) * coat_exponent.min(64.0) / 8.0);

    let fresnel = (1.0 - n_dot_v).powi(5);
    let rim = hemisphere * (fresnel * 0.25 * material.reflectivity.max(material.clearcoat * 0.25));

    let color = diffuse + specular + env_reflection + coat + rim;
    let coverage = material.coverage();
    let alpha = coverage + (1.0 - coverage) * fresnel;
    Color32::from_rgba_unmultiplied(
        encode(color.x),
        encode(color.y),
        encode(color.z),
        (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

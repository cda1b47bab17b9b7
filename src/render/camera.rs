//! Orbit camera rig with one perspective and one orthographic camera.
//!
//! Angles follow the usual orbit-control convention: the azimuth is measured
//! around +Y starting at +Z, the polar angle from +Y, so the front view of
//! the device is azimuth 0, polar π/2.

use crate::scene::{CameraLimits, CameraSettings, CameraType};
use glam::{Mat4, Vec2, Vec3};

pub const PERSPECTIVE_FOV_DEG: f32 = 50.0;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 1000.0;
pub const PERSPECTIVE_RESET_Z: f32 = 0.25;
pub const ORTHOGRAPHIC_RESET_Z: f32 = 5.0;
pub const ORTHOGRAPHIC_START_ZOOM: f32 = 5000.0;
const PAN_SPEED: f32 = 0.5;
const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigCamera {
    pub position: Vec3,
    /// Orthographic zoom (pixels per world unit). Unused by the perspective camera.
    pub zoom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub polar: f32,
    pub azimuth: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius < EPSILON {
            return Self {
                radius: 0.0,
                polar: std::f32::consts::FRAC_PI_2,
                azimuth: 0.0,
            };
        }
        Self {
            radius,
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        Vec3::new(
            self.radius * sin_polar * sin_azimuth,
            self.radius * cos_polar,
            self.radius * sin_polar * cos_azimuth,
        )
    }
}

#[derive(Debug, Clone)]
pub struct CameraRig {
    active: CameraType,
    perspective: RigCamera,
    orthographic: RigCamera,
    limits: CameraLimits,
    target: Vec3,
    pan_offset: Vec2,
    pinned_z: f32,
}

impl CameraRig {
    pub fn new(settings: &CameraSettings) -> Self {
        let mut rig = Self {
            active: settings.camera_type,
            // The configured position belongs to the perspective camera; the
            // orthographic one always starts on its default spot.
            perspective: RigCamera {
                position: settings.position,
                zoom: 1.0,
            },
            orthographic: RigCamera {
                position: Vec3::new(0.0, 0.0, ORTHOGRAPHIC_RESET_Z),
                zoom: ORTHOGRAPHIC_START_ZOOM,
            },
            limits: ordered(settings.limits()),
            target: Vec3::ZERO,
            pan_offset: Vec2::ZERO,
            pinned_z: 0.0,
        };
        rig.pinned_z = rig.position().z;
        rig.constrain();
        rig
    }

    pub fn active_type(&self) -> CameraType {
        self.active
    }

    pub fn camera(&self) -> &RigCamera {
        match self.active {
            CameraType::Perspective => &self.perspective,
            CameraType::Orthographic => &self.orthographic,
        }
    }

    fn camera_mut(&mut self) -> &mut RigCamera {
        match self.active {
            CameraType::Perspective => &mut self.perspective,
            CameraType::Orthographic => &mut self.orthographic,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.camera().position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    #[cfg(test)]
    pub fn pan_offset(&self) -> Vec2 {
        self.pan_offset
    }

    #[cfg(test)]
    pub fn pinned_z(&self) -> f32 {
        self.pinned_z
    }

    #[cfg(test)]
    pub fn limits(&self) -> CameraLimits {
        self.limits
    }

    pub fn spherical(&self) -> Spherical {
        Spherical::from_offset(self.position() - self.target)
    }

    /// Makes the other camera live. The orbit target returns to the origin
    /// and the new camera's limits take over.
    pub fn switch_to(&mut self, camera_type: CameraType, limits: CameraLimits) {
        if camera_type != self.active {
            log::debug!("Camera switched to {}", camera_type.label());
            self.active = camera_type;
            self.target = Vec3::ZERO;
            self.pan_offset = Vec2::ZERO;
            self.pinned_z = self.position().z;
        }
        self.set_limits(limits);
    }

    pub fn set_limits(&mut self, limits: CameraLimits) {
        self.limits = ordered(limits);
        self.constrain();
    }

    /// Moves the live camera to `position`, looking at the origin, and pins
    /// pans to its z.
    pub fn place(&mut self, position: Vec3) {
        self.camera_mut().position = position;
        self.target = Vec3::ZERO;
        self.pan_offset = Vec2::ZERO;
        self.pinned_z = position.z;
        self.constrain();
    }

    pub fn default_position(camera_type: CameraType) -> Vec3 {
        match camera_type {
            CameraType::Perspective => Vec3::new(0.0, 0.0, PERSPECTIVE_RESET_Z),
            CameraType::Orthographic => Vec3::new(0.0, 0.0, ORTHOGRAPHIC_RESET_Z),
        }
    }

    /// Shallow reset: only the live camera's position moves; zoom is kept.
    pub fn reset(&mut self) -> Vec3 {
        let position = Self::default_position(self.active);
        self.place(position);
        position
    }

    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        let mut spherical = self.spherical();
        spherical.azimuth += d_azimuth;
        spherical.polar += d_polar;
        let spherical = self.clamp_spherical(spherical);
        self.camera_mut().position = self.target + spherical.to_offset();
    }

    /// `factor > 1` zooms in: the perspective camera moves closer, the
    /// orthographic one magnifies.
    pub fn dolly(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        match self.active {
            CameraType::Perspective => {
                let mut spherical = self.spherical();
                spherical.radius /= factor;
                let spherical = self.clamp_spherical(spherical);
                self.camera_mut().position = self.target + spherical.to_offset();
            }
            CameraType::Orthographic => {
                let limits = self.limits;
                let camera = self.camera_mut();
                camera.zoom = (camera.zoom * factor).clamp(limits.min_zoom, limits.max_zoom);
            }
        }
    }

    /// Screen-space pan by a drag of (`dx`, `dy`) world units. The summed
    /// offset is clamped to the pan limit; the target stays on z = 0 and the
    /// camera on the pinned z.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let limit = self.limits.pan_limit.max(0.0);
        let next = Vec2::new(
            (self.pan_offset.x - dx * PAN_SPEED).clamp(-limit, limit),
            (self.pan_offset.y + dy * PAN_SPEED).clamp(-limit, limit),
        );
        let delta = next - self.pan_offset;
        self.pan_offset = next;

        let (right, up) = self.screen_axes();
        let shift = right * delta.x + up * delta.y;
        self.target += shift;
        self.target.z = 0.0;
        let pinned_z = self.pinned_z;
        let camera = self.camera_mut();
        camera.position += shift;
        camera.position.z = pinned_z;
        self.constrain();
    }

    /// Per-frame synchronization: re-applies every constraint to the live camera.
    pub fn update(&mut self) {
        self.constrain();
    }

    /// Size of one viewport pixel at the target, in world units.
    pub fn world_units_per_pixel(&self, viewport_height: f32) -> f32 {
        let height = viewport_height.max(1.0);
        match self.active {
            CameraType::Perspective => {
                let distance = (self.position() - self.target).length();
                2.0 * distance * (PERSPECTIVE_FOV_DEG.to_radians() * 0.5).tan() / height
            }
            CameraType::Orthographic => 1.0 / self.camera().zoom.max(EPSILON),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, viewport: Vec2) -> Mat4 {
        let width = viewport.x.max(1.0);
        let height = viewport.y.max(1.0);
        match self.active {
            CameraType::Perspective => Mat4::perspective_rh_gl(
                PERSPECTIVE_FOV_DEG.to_radians(),
                width / height,
                NEAR_PLANE,
                FAR_PLANE,
            ),
            CameraType::Orthographic => {
                let zoom = self.camera().zoom.max(EPSILON);
                let half_w = width * 0.5 / zoom;
                let half_h = height * 0.5 / zoom;
                Mat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, NEAR_PLANE, FAR_PLANE)
            }
        }
    }

    pub fn view_projection(&self, viewport: Vec2) -> Mat4 {
        self.projection_matrix(viewport) * self.view_matrix()
    }

    fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        if right == Vec3::ZERO {
            return (Vec3::X, Vec3::Y);
        }
        let up = right.cross(forward).normalize_or_zero();
        (right, up)
    }

    fn clamp_spherical(&self, spherical: Spherical) -> Spherical {
        let limit = self.limits.rotation_limit.abs();
        let half_pi = std::f32::consts::FRAC_PI_2;
        let mut out = spherical;
        out.azimuth = spherical.azimuth.clamp(-limit, limit);
        out.polar = spherical
            .polar
            .clamp(half_pi - limit, half_pi + limit)
            .clamp(EPSILON, std::f32::consts::PI - EPSILON);
        if self.active == CameraType::Perspective {
            out.radius = spherical
                .radius
                .clamp(self.limits.min_zoom, self.limits.max_zoom);
        }
        out
    }

    /// Pulls the live camera back inside its limits. Returns true if
    /// anything moved.
    fn constrain(&mut self) -> bool {
        let limits = self.limits;
        let mut changed = false;
        if self.active == CameraType::Orthographic {
            let camera = self.camera_mut();
            let zoom = camera.zoom.clamp(limits.min_zoom, limits.max_zoom);
            if zoom != camera.zoom {
                camera.zoom = zoom;
                changed = true;
            }
        }

        let current = self.spherical();
        let clamped = self.clamp_spherical(current);
        let moved = (clamped.azimuth - current.azimuth).abs() > EPSILON
            || (clamped.polar - current.polar).abs() > EPSILON
            || (clamped.radius - current.radius).abs() > EPSILON;
        if moved {
            let target = self.target;
            self.camera_mut().position = target + clamped.to_offset();
            changed = true;
        }
        changed
    }
}

/// Limits read from a config file may come with the zoom bounds swapped.
fn ordered(limits: CameraLimits) -> CameraLimits {
    if limits.min_zoom <= limits.max_zoom {
        return limits;
    }
    log::warn!(
        "Camera zoom limits inverted ({} > {}); swapping",
        limits.min_zoom,
        limits.max_zoom
    );
    CameraLimits {
        min_zoom: limits.max_zoom,
        max_zoom: limits.min_zoom,
        ..limits
    }
}

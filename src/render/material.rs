use crate::scene::{MockupMaterial, Srgba};

/// Physically based parameters for the device body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub base_color: Srgba,
    pub metalness: f32,
    pub roughness: f32,
    pub transmission: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub ior: f32,
    pub thickness: f32,
    pub reflectivity: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub double_sided: bool,
}

impl MaterialParams {
    const OPAQUE: Self = Self {
        base_color: Srgba::WHITE,
        metalness: 0.0,
        roughness: 1.0,
        transmission: 0.0,
        opacity: 1.0,
        transparent: false,
        ior: 1.5,
        thickness: 0.0,
        reflectivity: 0.5,
        clearcoat: 0.0,
        clearcoat_roughness: 0.0,
        double_sided: true,
    };

    /// Alpha the preview uses for the body surface.
    pub fn coverage(&self) -> f32 {
        if !self.transparent {
            return 1.0;
        }
        (self.opacity * (1.0 - 0.8 * self.transmission)).clamp(0.05, 1.0)
    }
}

impl MockupMaterial {
    pub fn params(self) -> MaterialParams {
        match self {
            Self::Glass => MaterialParams {
                base_color: Srgba::from_hex_u32(0xFFFFFF),
                metalness: 0.0,
                roughness: 0.0,
                transmission: 1.0,
                opacity: 0.99,
                transparent: true,
                ior: 1.5,
                thickness: 0.25,
                reflectivity: 0.25,
                clearcoat: 1.0,
                clearcoat_roughness: 0.25,
                double_sided: true,
            },
            Self::Platinum => MaterialParams {
                base_color: Srgba::from_hex_u32(0xD9D9D9),
                metalness: 1.0,
                roughness: 0.24,
                ..MaterialParams::OPAQUE
            },
            Self::ClayLight => MaterialParams {
                base_color: Srgba::from_hex_u32(0xA1A1A1),
                ..clay()
            },
            Self::ClayDark => MaterialParams {
                base_color: Srgba::from_hex_u32(0x272727),
                ..clay()
            },
        }
    }
}

fn clay() -> MaterialParams {
    MaterialParams {
        metalness: 0.0,
        roughness: 0.95,
        reflectivity: 0.0,
        clearcoat: 0.1,
        clearcoat_roughness: 0.9,
        ..MaterialParams::OPAQUE
    }
}

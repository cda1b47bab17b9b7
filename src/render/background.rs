//! Background texture generation.
//!
//! Gradients are rasterized on the CPU into a square RGBA image; image
//! backgrounds are handed back as a load request and scaled with
//! [`fit_transform`] once their pixels arrive.

use crate::scene::background::FALLBACK_COLOR;
use crate::scene::{BackgroundFit, BackgroundSource, Srgba};
use glam::Vec2;
use image::RgbaImage;
use std::sync::Arc;

/// Edge length of generated gradient rasters.
pub const GRADIENT_RESOLUTION: u32 = 1024;

/// What the generator decided for a background source.
#[derive(Debug, Clone)]
pub enum BackgroundPlan {
    Color(Srgba),
    Texture(Arc<RgbaImage>),
    /// The image has to be fetched first; `url` is the reference to load.
    Load(String),
}

impl BackgroundPlan {
    #[cfg(test)]
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Texture(_))
    }
}

/// UV scale and offset applied to a background texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub repeat: Vec2,
    pub offset: Vec2,
}

impl TextureTransform {
    pub const IDENTITY: Self = Self {
        repeat: Vec2::ONE,
        offset: Vec2::ZERO,
    };
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub fn generate(source: &BackgroundSource, resolution: u32) -> BackgroundPlan {
    match source {
        BackgroundSource::Solid(color) => BackgroundPlan::Color(*color),
        BackgroundSource::LinearGradient { angle_deg, stops } => {
            match flat_color_for(stops) {
                Some(color) => BackgroundPlan::Color(color),
                None => BackgroundPlan::Texture(Arc::new(linear_gradient(
                    *angle_deg, stops, resolution,
                ))),
            }
        }
        BackgroundSource::RadialGradient { stops } => match flat_color_for(stops) {
            Some(color) => BackgroundPlan::Color(color),
            None => BackgroundPlan::Texture(Arc::new(radial_gradient(stops, resolution))),
        },
        BackgroundSource::Image { url } if url.trim().is_empty() => {
            BackgroundPlan::Color(FALLBACK_COLOR)
        }
        BackgroundSource::Image { url } => BackgroundPlan::Load(url.clone()),
    }
}

/// A gradient needs two stops; with fewer it degrades to a flat fill.
fn flat_color_for(stops: &[Srgba]) -> Option<Srgba> {
    match stops {
        [] => Some(FALLBACK_COLOR),
        [only] => Some(*only),
        _ => None,
    }
}

/// Samples evenly spaced stops at `t` in [0, 1].
fn sample_stops(stops: &[Srgba], t: f32) -> Srgba {
    match stops {
        [] => FALLBACK_COLOR,
        [only] => *only,
        _ => {
            let segments = (stops.len() - 1) as f32;
            let scaled = t.clamp(0.0, 1.0) * segments;
            let index = (scaled.floor() as usize).min(stops.len() - 2);
            stops[index].lerp(stops[index + 1], scaled - index as f32)
        }
    }
}

/// Angle is measured from +x towards +y in raster space (y points down).
pub fn linear_gradient(angle_deg: f32, stops: &[Srgba], resolution: u32) -> RgbaImage {
    let size = resolution.max(1) as f32;
    let angle = if angle_deg.is_finite() {
        angle_deg.to_radians()
    } else {
        0.0
    };
    let center = Vec2::splat(size * 0.5);
    let direction = Vec2::new(angle.cos(), angle.sin());
    let start = center - direction * size * 0.5;
    let span = direction * size;
    let span_len_sq = span.length_squared().max(f32::EPSILON);

    RgbaImage::from_fn(resolution.max(1), resolution.max(1), |x, y| {
        let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        let t = (p - start).dot(span) / span_len_sq;
        image::Rgba(sample_stops(stops, t).0)
    })
}

pub fn radial_gradient(stops: &[Srgba], resolution: u32) -> RgbaImage {
    let size = resolution.max(1) as f32;
    let center = Vec2::splat(size * 0.5);
    let radius = size * 0.5;

    RgbaImage::from_fn(resolution.max(1), resolution.max(1), |x, y| {
        let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        let t = p.distance(center) / radius;
        image::Rgba(sample_stops(stops, t).0)
    })
}

/// Aspect-aware UV transform for an image background.
///
/// Fill maps the texture 1:1. Fit keeps the image aspect by narrowing the
/// sampled window on the axis where the viewport is relatively shorter and
/// centring it.
pub fn fit_transform(image_size: [u32; 2], viewport_size: Vec2, fit: BackgroundFit) -> TextureTransform {
    if fit == BackgroundFit::Fill {
        return TextureTransform::IDENTITY;
    }
    let [image_w, image_h] = image_size;
    if image_w == 0 || image_h == 0 || viewport_size.x <= 0.0 || viewport_size.y <= 0.0 {
        return TextureTransform::IDENTITY;
    }
    let image_aspect = image_w as f32 / image_h as f32;
    let viewport_aspect = viewport_size.x / viewport_size.y;

    if viewport_aspect > image_aspect {
        let repeat_y = image_aspect / viewport_aspect;
        TextureTransform {
            repeat: Vec2::new(1.0, repeat_y),
            offset: Vec2::new(0.0, (1.0 - repeat_y) / 2.0),
        }
    } else {
        let repeat_x = viewport_aspect / image_aspect;
        TextureTransform {
            repeat: Vec2::new(repeat_x, 1.0),
            offset: Vec2::new((1.0 - repeat_x) / 2.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Srgba = Srgba::rgb(0xFF, 0, 0);
    const BLUE: Srgba = Srgba::rgb(0, 0, 0xFF);

    fn pixel(image: &RgbaImage, x: u32, y: u32) -> Srgba {
        Srgba(image.get_pixel(x, y).0)
    }

    #[test]
    fn diagonal_linear_gradient_produces_texture() {
        let source = BackgroundSource::LinearGradient {
            angle_deg: 45.0,
            stops: vec![RED, BLUE],
        };
        let BackgroundPlan::Texture(image) = generate(&source, 64) else {
            panic!("expected a texture");
        };
        assert_eq!(image.dimensions(), (64, 64));
        let top_left = pixel(&image, 0, 0);
        let bottom_right = pixel(&image, 63, 63);
        assert!(top_left.0[0] > 200 && top_left.0[2] < 60);
        assert!(bottom_right.0[2] > 200 && bottom_right.0[0] < 60);
    }

    #[test]
    fn radial_gradient_runs_centre_to_edge() {
        let image = radial_gradient(&[RED, BLUE], 65);
        let centre = pixel(&image, 32, 32);
        assert!(centre.0[0] > 240);
        let corner = pixel(&image, 0, 0);
        assert_eq!(corner, BLUE);
    }

    #[test]
    fn three_stops_are_evenly_spaced() {
        let green = Srgba::rgb(0, 0xFF, 0);
        assert_eq!(sample_stops(&[RED, green, BLUE], 0.5), green);
        assert_eq!(sample_stops(&[RED, green, BLUE], 0.0), RED);
        assert_eq!(sample_stops(&[RED, green, BLUE], 1.0), BLUE);
        assert_eq!(sample_stops(&[RED, green, BLUE], 7.0), BLUE);
    }

    #[test]
    fn malformed_stops_degrade_to_flat_color() {
        let cases = [
            BackgroundSource::LinearGradient {
                angle_deg: f32::NAN,
                stops: vec![],
            },
            BackgroundSource::LinearGradient {
                angle_deg: 10.0,
                stops: vec![RED],
            },
            BackgroundSource::RadialGradient { stops: vec![] },
            BackgroundSource::RadialGradient { stops: vec![BLUE] },
            BackgroundSource::Image { url: "  ".into() },
            BackgroundSource::parse_css("linear-gradient(90deg, nope)"),
            BackgroundSource::parse_css("radial-gradient("),
            BackgroundSource::parse_css("#zzzzzz"),
        ];
        for source in cases {
            assert!(
                matches!(generate(&source, 8), BackgroundPlan::Color(_)),
                "{source:?} should degrade to a color"
            );
        }
        assert!(matches!(
            generate(&BackgroundSource::RadialGradient { stops: vec![BLUE] }, 8),
            BackgroundPlan::Color(c) if c == BLUE
        ));
    }

    #[test]
    fn non_finite_angle_with_stops_still_rasterizes() {
        let source = BackgroundSource::LinearGradient {
            angle_deg: f32::INFINITY,
            stops: vec![RED, BLUE],
        };
        assert!(generate(&source, 4).is_texture());
    }

    #[test]
    fn image_source_requests_load() {
        let plan = generate(
            &BackgroundSource::Image {
                url: "bg.png".into(),
            },
            8,
        );
        assert!(matches!(plan, BackgroundPlan::Load(url) if url == "bg.png"));
    }

    #[test]
    fn fill_is_identity() {
        let t = fit_transform([400, 100], Vec2::new(800.0, 800.0), BackgroundFit::Fill);
        assert_eq!(t, TextureTransform::IDENTITY);
    }

    #[test]
    fn fit_on_wide_viewport_scales_vertically() {
        let t = fit_transform([100, 100], Vec2::new(200.0, 100.0), BackgroundFit::Fit);
        assert_eq!(t.repeat, Vec2::new(1.0, 0.5));
        assert_eq!(t.offset, Vec2::new(0.0, 0.25));
    }

    #[test]
    fn fit_on_tall_viewport_scales_horizontally() {
        let t = fit_transform([200, 100], Vec2::new(100.0, 100.0), BackgroundFit::Fit);
        assert_eq!(t.repeat, Vec2::new(0.5, 1.0));
        assert_eq!(t.offset, Vec2::new(0.25, 0.0));
    }

    #[test]
    fn fit_ignores_degenerate_sizes() {
        let t = fit_transform([0, 100], Vec2::new(100.0, 100.0), BackgroundFit::Fit);
        assert_eq!(t, TextureTransform::IDENTITY);
        let t = fit_transform([10, 10], Vec2::new(100.0, 0.0), BackgroundFit::Fit);
        assert_eq!(t, TextureTransform::IDENTITY);
    }
}

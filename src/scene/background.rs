//! Background description and its CSS-like string form.
//!
//! The persisted project stores the background as a single string
//! (`#1E1E1E`, `linear-gradient(45deg, #D5CCFF, #6B75FF)`,
//! `radial-gradient(circle, ...)`, `url(...)`). That string is decoded once,
//! here, into a [`BackgroundSource`]; nothing downstream inspects prefixes.

use std::fmt;

/// Flat color used whenever a background value cannot be understood.
pub const FALLBACK_COLOR: Srgba = Srgba([0x1E, 0x1E, 0x1E, 0xFF]);

/// Angle used for `linear-gradient(...)` values that carry no `deg` token.
pub const DEFAULT_LINEAR_ANGLE_DEG: f32 = 45.0;

/// 8-bit sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Srgba(pub [u8; 4]);

impl Srgba {
    pub const WHITE: Self = Self([0xFF, 0xFF, 0xFF, 0xFF]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 0xFF])
    }

    pub const fn from_hex_u32(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the leading `#` is required).
    pub fn parse_hex(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let mut out = [0xFF; 4];
                for (i, c) in digits.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    out[i] = v * 17;
                }
                Some(Self(out))
            }
            6 => Some(Self([
                byte(&digits[0..2])?,
                byte(&digits[2..4])?,
                byte(&digits[4..6])?,
                0xFF,
            ])),
            8 => Some(Self([
                byte(&digits[0..2])?,
                byte(&digits[2..4])?,
                byte(&digits[4..6])?,
                byte(&digits[6..8])?,
            ])),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 0xFF {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// Linear interpolation in sRGB space, the way a 2D canvas blends stops.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0u8; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let a = self.0[i] as f32;
            let b = other.0[i] as f32;
            *slot = (a + (b - a) * t).round().clamp(0.0, 255.0) as u8;
        }
        Self(out)
    }
}

impl fmt::Display for Srgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// How an image background is scaled against the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFit {
    #[default]
    Fill,
    Fit,
}

/// What is drawn behind the device model.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSource {
    Solid(Srgba),
    LinearGradient { angle_deg: f32, stops: Vec<Srgba> },
    RadialGradient { stops: Vec<Srgba> },
    Image { url: String },
}

impl Default for BackgroundSource {
    fn default() -> Self {
        Self::Solid(FALLBACK_COLOR)
    }
}

impl BackgroundSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Solid(_) => "Solid",
            Self::LinearGradient { .. } => "Linear Gradient",
            Self::RadialGradient { .. } => "Radial Gradient",
            Self::Image { .. } => "Image",
        }
    }

    /// Decodes the persisted string form. Never fails: anything unreadable
    /// becomes [`FALLBACK_COLOR`].
    pub fn parse_css(value: &str) -> Self {
        let value = value.trim();
        if let Some(body) = strip_function(value, "linear-gradient") {
            let angle_deg = parse_angle(body).unwrap_or(DEFAULT_LINEAR_ANGLE_DEG);
            return Self::LinearGradient {
                angle_deg,
                stops: hex_tokens(body),
            };
        }
        if let Some(body) = strip_function(value, "radial-gradient") {
            return Self::RadialGradient {
                stops: hex_tokens(body),
            };
        }
        if let Some(body) = strip_function(value, "url") {
            let url = body.trim().trim_matches(|c| c == '"' || c == '\'');
            return Self::Image {
                url: url.to_string(),
            };
        }
        match Srgba::parse_hex(value) {
            Some(color) => Self::Solid(color),
            None => {
                log::warn!(
                    "Unrecognized background value {:?}; using {}",
                    value,
                    FALLBACK_COLOR
                );
                Self::Solid(FALLBACK_COLOR)
            }
        }
    }

    pub fn to_css(&self) -> String {
        match self {
            Self::Solid(color) => color.to_hex(),
            Self::LinearGradient { angle_deg, stops } => {
                let mut out = format!("linear-gradient({angle_deg}deg");
                for stop in stops {
                    out.push_str(", ");
                    out.push_str(&stop.to_hex());
                }
                out.push(')');
                out
            }
            Self::RadialGradient { stops } => {
                let mut out = String::from("radial-gradient(circle");
                for stop in stops {
                    out.push_str(", ");
                    out.push_str(&stop.to_hex());
                }
                out.push(')');
                out
            }
            Self::Image { url } => format!("url({url})"),
        }
    }
}

/// Background as edited in the sidebar: a source plus the image fit policy.
/// `fit` is carried for every source and only consulted for images.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Background {
    pub source: BackgroundSource,
    pub fit: BackgroundFit,
}

fn strip_function<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    let rest = value.strip_prefix(name)?.trim_start();
    let rest = rest.strip_prefix('(')?;
    Some(rest.strip_suffix(')').unwrap_or(rest))
}

fn parse_angle(body: &str) -> Option<f32> {
    body.split(',')
        .map(str::trim)
        .find_map(|token| token.strip_suffix("deg")?.trim().parse::<f32>().ok())
        .filter(|angle| angle.is_finite())
}

fn hex_tokens(body: &str) -> Vec<Srgba> {
    body.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| token.starts_with('#'))
        .filter_map(Srgba::parse_hex)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_variants() {
        assert_eq!(Srgba::parse_hex("#FF0000"), Some(Srgba::rgb(255, 0, 0)));
        assert_eq!(Srgba::parse_hex("#0f0"), Some(Srgba::rgb(0, 255, 0)));
        assert_eq!(
            Srgba::parse_hex("#00000080"),
            Some(Srgba([0, 0, 0, 0x80]))
        );
        assert_eq!(Srgba::parse_hex("FF0000"), None);
        assert_eq!(Srgba::parse_hex("#GG0000"), None);
        assert_eq!(Srgba::parse_hex("#12345"), None);
    }

    #[test]
    fn decodes_preset_gradient() {
        let source = BackgroundSource::parse_css("linear-gradient(45deg, #D5CCFF, #6B75FF)");
        assert_eq!(
            source,
            BackgroundSource::LinearGradient {
                angle_deg: 45.0,
                stops: vec![Srgba::from_hex_u32(0xD5CCFF), Srgba::from_hex_u32(0x6B75FF)],
            }
        );
    }

    #[test]
    fn linear_gradient_without_angle_uses_default() {
        let source = BackgroundSource::parse_css("linear-gradient(#000000, #FFFFFF)");
        match source {
            BackgroundSource::LinearGradient { angle_deg, stops } => {
                assert_eq!(angle_deg, DEFAULT_LINEAR_ANGLE_DEG);
                assert_eq!(stops.len(), 2);
            }
            other => panic!("expected linear gradient, got {other:?}"),
        }
    }

    #[test]
    fn malformed_gradient_keeps_recognized_stops_only() {
        let source = BackgroundSource::parse_css("radial-gradient(circle, red, #12)");
        assert_eq!(source, BackgroundSource::RadialGradient { stops: vec![] });
    }

    #[test]
    fn decodes_url_with_quotes() {
        assert_eq!(
            BackgroundSource::parse_css("url('shots/bg.png')"),
            BackgroundSource::Image {
                url: "shots/bg.png".to_string()
            }
        );
        assert_eq!(
            BackgroundSource::parse_css("url(data:image/png;base64,AAAA)"),
            BackgroundSource::Image {
                url: "data:image/png;base64,AAAA".to_string()
            }
        );
    }

    #[test]
    fn unknown_solid_falls_back() {
        assert_eq!(
            BackgroundSource::parse_css("rebeccapurple"),
            BackgroundSource::Solid(FALLBACK_COLOR)
        );
    }

    #[test]
    fn css_string_survives_reparse() {
        let sources = [
            BackgroundSource::Solid(Srgba([1, 2, 3, 4])),
            BackgroundSource::LinearGradient {
                angle_deg: 127.5,
                stops: vec![Srgba::rgb(1, 2, 3), Srgba::rgb(4, 5, 6), Srgba::rgb(7, 8, 9)],
            },
            BackgroundSource::RadialGradient {
                stops: vec![Srgba::rgb(10, 20, 30), Srgba::rgb(40, 50, 60)],
            },
            BackgroundSource::Image {
                url: "/tmp/a b.png".to_string(),
            },
        ];
        for source in sources {
            assert_eq!(BackgroundSource::parse_css(&source.to_css()), source);
        }
    }
}

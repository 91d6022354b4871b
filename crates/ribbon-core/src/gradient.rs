//! Piecewise-linear colour ramps.
//!
//! Colours are stored as normalised sRGB channels in [0, 1] and written in
//! configuration files as `#RRGGBB` strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from 8-bit channels.
    pub fn from_u8(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0] as f32 / 255.0, rgb[1] as f32 / 255.0, rgb[2] as f32 / 255.0)
    }

    /// Channel-wise linear interpolation; `t` is not clamped.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        Rgb {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseColorError {
    #[error("expected #RRGGBB, got {0:?}")]
    Format(String),
    #[error("bad hex digits in {0:?}")]
    Digits(String),
}

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .filter(|h| h.len() == 6)
            .ok_or_else(|| ParseColorError::Format(s.to_string()))?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseColorError::Digits(s.to_string()));
        }
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ParseColorError::Digits(s.to_string()))
        };
        Ok(Rgb::from_u8([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_u8();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One stop of a colour ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub t: f32,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f32, color: Rgb) -> Self {
        Self { t, color }
    }
}

/// Sample a ramp at `t`.
///
/// `t` is clamped to [0, 1] and matched against the first adjacent pair with
/// `a.t <= t <= b.t`. When no pair covers `t` (values past the last stop, or
/// a ramp that is not ascending) the last stop's colour is returned as is.
/// A pair of coincident stops yields the first stop's colour. An empty ramp
/// samples as black.
pub fn sample_gradient(t: f32, stops: &[ColorStop]) -> Rgb {
    let t = t.clamp(0.0, 1.0);

    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.t && t <= b.t {
            let span = b.t - a.t;
            let local_t = if span > 0.0 { (t - a.t) / span } else { 0.0 };
            return a.color.lerp(b.color, local_t);
        }
    }

    last_stop_color(stops)
}

/// Fallback colour for any `t` not covered by an ascending pair.
pub fn last_stop_color(stops: &[ColorStop]) -> Rgb {
    stops.last().map(|s| s.color).unwrap_or(Rgb::BLACK)
}

/// True when stops are strictly increasing in `t`.
pub fn is_ascending(stops: &[ColorStop]) -> bool {
    stops.windows(2).all(|p| p[0].t < p[1].t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn black_to_white() -> Vec<ColorStop> {
        vec![ColorStop::new(0.0, Rgb::BLACK), ColorStop::new(1.0, Rgb::WHITE)]
    }

    #[test]
    fn midpoint_is_mid_gray() {
        let c = sample_gradient(0.5, &black_to_white());
        assert_abs_diff_eq!(c.r, 0.5);
        assert_abs_diff_eq!(c.g, 0.5);
        assert_abs_diff_eq!(c.b, 0.5);
    }

    #[test]
    fn out_of_range_is_clamped() {
        let stops = black_to_white();
        assert_eq!(sample_gradient(-1.0, &stops), sample_gradient(0.0, &stops));
        assert_eq!(sample_gradient(2.0, &stops), Rgb::WHITE);
    }

    #[test]
    fn t_beyond_short_ramp_uses_last_stop() {
        let stops = vec![
            ColorStop::new(0.0, Rgb::BLACK),
            ColorStop::new(0.5, Rgb::new(1.0, 0.0, 0.0)),
        ];
        assert_eq!(sample_gradient(0.75, &stops), Rgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn unsorted_ramp_falls_back_to_last_stop() {
        let last = Rgb::new(0.0, 0.0, 1.0);
        let stops = vec![
            ColorStop::new(0.8, Rgb::BLACK),
            ColorStop::new(0.2, Rgb::WHITE),
            ColorStop::new(0.6, last),
        ];
        assert!(!is_ascending(&stops));
        assert_eq!(sample_gradient(0.1, &stops), last);
    }

    #[test]
    fn coincident_stops_take_first_color() {
        let stops = vec![
            ColorStop::new(0.0, Rgb::BLACK),
            ColorStop::new(0.5, Rgb::WHITE),
            ColorStop::new(0.5, Rgb::new(1.0, 0.0, 0.0)),
            ColorStop::new(1.0, Rgb::BLACK),
        ];
        assert_eq!(sample_gradient(0.5, &stops), Rgb::WHITE);
    }

    #[test]
    fn empty_ramp_is_black() {
        assert_eq!(sample_gradient(0.3, &[]), Rgb::BLACK);
    }

    #[test]
    fn hex_parse_and_display() {
        let c: Rgb = "#FA4CFB".parse().unwrap();
        assert_eq!(c.to_u8(), [0xfa, 0x4c, 0xfb]);
        assert_eq!(c.to_string(), "#fa4cfb");
        assert!("FA4CFB".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn signed_hex_pairs_are_rejected() {
        assert!(matches!("#+f+f+f".parse::<Rgb>(), Err(ParseColorError::Digits(_))));
        assert!(matches!("#-10000".parse::<Rgb>(), Err(ParseColorError::Digits(_))));
    }

    #[test]
    fn deserializes_from_json_string() {
        let stop: ColorStop = serde_json::from_str(r##"{"t":0.25,"color":"#ffffff"}"##).unwrap();
        assert_eq!(stop.color, Rgb::WHITE);
        assert!(serde_json::from_str::<ColorStop>(r##"{"t":0,"color":"white"}"##).is_err());
    }
}

//! Effect settings: one tagged union per effect family.
//!
//! The wire form is an internally tagged JSON object whose `shaderType`
//! discriminant selects the parameter set. Every parameter carries a
//! default, so a record with absent fields deserializes into a fully
//! specified settings value in one step — there is no per-read-site
//! fallback logic anywhere else in the engine.
//!
//! Numeric parameters are NOT clamped or validated here or anywhere
//! downstream: out-of-documented-range values reach the shader verbatim
//! and produce shader-defined visuals.

use serde::{Deserialize, Serialize};

/// The closed set of effect families the engine ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectType {
    Halftone,
    Vhs,
    Ascii,
    MatrixDither,
    Upscale,
    Dither,
    Duotone,
}

impl EffectType {
    /// All effect families, in registry order.
    pub const ALL: [EffectType; 7] = [
        EffectType::Halftone,
        EffectType::Vhs,
        EffectType::Ascii,
        EffectType::MatrixDither,
        EffectType::Upscale,
        EffectType::Dither,
        EffectType::Duotone,
    ];
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EffectType::Halftone => "halftone",
            EffectType::Vhs => "vhs",
            EffectType::Ascii => "ascii",
            EffectType::MatrixDither => "matrixDither",
            EffectType::Upscale => "upscale",
            EffectType::Dither => "dither",
            EffectType::Duotone => "duotone",
        };
        write!(f, "{}", name)
    }
}

/// Rendering kernel variant for the halftone family. One visual family,
/// three fragment shaders, one shared parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HalftoneShape {
    Ellipse,
    Square,
    Lines,
}

impl std::fmt::Display for HalftoneShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HalftoneShape::Ellipse => "ellipse",
            HalftoneShape::Square => "square",
            HalftoneShape::Lines => "lines",
        };
        write!(f, "{}", name)
    }
}

/// Halftone parameters.
///
/// `dot_size` and `spacing` are in output pixels; `angle` is the screen
/// rotation in radians. `threshold` scales dot growth; `invert` swaps
/// ink and paper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HalftoneParams {
    pub shape: HalftoneShape,
    pub dot_size: f32,
    pub angle: f32,
    pub contrast: f32,
    pub spacing: f32,
    pub threshold: f32,
    pub invert: bool,
}

impl Default for HalftoneParams {
    fn default() -> Self {
        Self {
            shape: HalftoneShape::Ellipse,
            dot_size: 5.0,
            angle: 0.0,
            contrast: 1.0,
            spacing: 2.0,
            threshold: 1.0,
            invert: false,
        }
    }
}

/// VHS tape degradation parameters. `time` (seconds) drives the wave and
/// noise animation and is the only time-varying uniform in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VhsParams {
    pub tape_wave_intensity: f32,
    pub scanline_intensity: f32,
    pub noise_intensity: f32,
    pub chroma_shift: f32,
    pub time: f32,
}

impl Default for VhsParams {
    fn default() -> Self {
        Self {
            tape_wave_intensity: 0.08,
            scanline_intensity: 0.35,
            noise_intensity: 0.15,
            chroma_shift: 0.004,
            time: 0.0,
        }
    }
}

/// ASCII-art parameters. `cell_size` is the glyph cell edge in output
/// pixels; `monochrome` renders white glyphs on black instead of tinting
/// glyphs with the source color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AsciiParams {
    pub cell_size: f32,
    pub contrast: f32,
    pub invert: bool,
    pub monochrome: bool,
}

impl Default for AsciiParams {
    fn default() -> Self {
        Self {
            cell_size: 8.0,
            contrast: 1.0,
            invert: false,
            monochrome: true,
        }
    }
}

/// Dot-matrix display parameters: a grid of round LEDs whose quantized
/// brightness tracks the cell's luminance, tinted `tint`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatrixDitherParams {
    pub cell_size: f32,
    pub brightness: f32,
    pub tint: [f32; 3],
}

impl Default for MatrixDitherParams {
    fn default() -> Self {
        Self {
            cell_size: 6.0,
            brightness: 1.0,
            tint: [0.25, 1.0, 0.35],
        }
    }
}

/// Bicubic-style upscale parameters. The kernel resamples the source with
/// a Catmull-Rom filter; `sharpness` blends between plain bilinear (0) and
/// the full cubic result (1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpscaleParams {
    pub sharpness: f32,
}

impl Default for UpscaleParams {
    fn default() -> Self {
        Self { sharpness: 0.5 }
    }
}

/// Ordered (Bayer 4x4) dithering parameters. `levels` is the number of
/// quantization steps per channel; `scale` grows the matrix cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DitherParams {
    pub levels: f32,
    pub scale: f32,
}

impl Default for DitherParams {
    fn default() -> Self {
        Self {
            levels: 4.0,
            scale: 1.0,
        }
    }
}

/// Duotone parameters: luminance remapped onto a shadow-to-highlight
/// color ramp, mixed with the original by `intensity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuotoneParams {
    pub shadow_color: [f32; 3],
    pub highlight_color: [f32; 3],
    pub intensity: f32,
}

impl Default for DuotoneParams {
    fn default() -> Self {
        Self {
            shadow_color: [0.0, 0.0, 0.0],
            highlight_color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

/// A fully specified settings record for one render call.
///
/// Ephemeral: constructed per call, never persisted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shaderType", rename_all = "camelCase")]
pub enum EffectSettings {
    Halftone(HalftoneParams),
    Vhs(VhsParams),
    Ascii(AsciiParams),
    MatrixDither(MatrixDitherParams),
    Upscale(UpscaleParams),
    Dither(DitherParams),
    Duotone(DuotoneParams),
}

impl EffectSettings {
    /// The effect family this record selects.
    pub fn effect_type(&self) -> EffectType {
        match self {
            EffectSettings::Halftone(_) => EffectType::Halftone,
            EffectSettings::Vhs(_) => EffectType::Vhs,
            EffectSettings::Ascii(_) => EffectType::Ascii,
            EffectSettings::MatrixDither(_) => EffectType::MatrixDither,
            EffectSettings::Upscale(_) => EffectType::Upscale,
            EffectSettings::Dither(_) => EffectType::Dither,
            EffectSettings::Duotone(_) => EffectType::Duotone,
        }
    }

    /// Whether repeated renders with these settings can differ over time.
    pub fn is_time_varying(&self) -> bool {
        matches!(self, EffectSettings::Vhs(_))
    }

    /// Return a copy with the time-varying uniform advanced to `secs`.
    /// Settings without a time axis are returned unchanged; the video
    /// transcoder calls this once per frame.
    pub fn at_time(&self, secs: f32) -> Self {
        match *self {
            EffectSettings::Vhs(mut p) => {
                p.time = secs;
                EffectSettings::Vhs(p)
            }
            other => other,
        }
    }

    /// Default settings for an effect family.
    pub fn default_for(effect: EffectType) -> Self {
        match effect {
            EffectType::Halftone => EffectSettings::Halftone(HalftoneParams::default()),
            EffectType::Vhs => EffectSettings::Vhs(VhsParams::default()),
            EffectType::Ascii => EffectSettings::Ascii(AsciiParams::default()),
            EffectType::MatrixDither => EffectSettings::MatrixDither(MatrixDitherParams::default()),
            EffectType::Upscale => EffectSettings::Upscale(UpscaleParams::default()),
            EffectType::Dither => EffectSettings::Dither(DitherParams::default()),
            EffectType::Duotone => EffectSettings::Duotone(DuotoneParams::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminant_only_yields_defaults() {
        let s: EffectSettings = serde_json::from_str(r#"{"shaderType": "halftone"}"#).unwrap();
        assert_eq!(s, EffectSettings::Halftone(HalftoneParams::default()));
    }

    #[test]
    fn test_explicit_value_overrides_default() {
        let s: EffectSettings =
            serde_json::from_str(r#"{"shaderType": "halftone", "dotSize": 9.0}"#).unwrap();
        match s {
            EffectSettings::Halftone(p) => {
                assert_eq!(p.dot_size, 9.0);
                // Untouched fields keep their defaults.
                assert_eq!(p.spacing, 2.0);
                assert_eq!(p.shape, HalftoneShape::Ellipse);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_camel_case_discriminants() {
        let s: EffectSettings = serde_json::from_str(r#"{"shaderType": "matrixDither"}"#).unwrap();
        assert_eq!(s.effect_type(), EffectType::MatrixDither);

        let json = serde_json::to_string(&EffectSettings::default_for(EffectType::Duotone)).unwrap();
        assert!(json.contains(r#""shaderType":"duotone""#));
        assert!(json.contains("shadowColor"));
    }

    #[test]
    fn test_unknown_discriminant_rejected() {
        let r: Result<EffectSettings, _> = serde_json::from_str(r#"{"shaderType": "plasma"}"#);
        assert!(r.is_err());
    }

    #[test]
    fn test_at_time_only_touches_vhs() {
        let vhs = EffectSettings::default_for(EffectType::Vhs).at_time(2.5);
        match vhs {
            EffectSettings::Vhs(p) => assert_eq!(p.time, 2.5),
            _ => panic!("wrong variant"),
        }

        let halftone = EffectSettings::default_for(EffectType::Halftone);
        assert_eq!(halftone.at_time(2.5), halftone);
        assert!(!halftone.is_time_varying());
        assert!(vhs.is_time_varying());
    }

    #[test]
    fn test_display_names_match_wire_form() {
        assert_eq!(EffectType::MatrixDither.to_string(), "matrixDither");
        assert_eq!(EffectType::Vhs.to_string(), "vhs");
        assert_eq!(HalftoneShape::Ellipse.to_string(), "ellipse");
    }

    #[test]
    fn test_default_for_covers_every_family() {
        for effect in EffectType::ALL {
            assert_eq!(EffectSettings::default_for(effect).effect_type(), effect);
        }
    }
}

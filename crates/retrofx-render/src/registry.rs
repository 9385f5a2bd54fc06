//! Shader program registry: a pure lookup table from `(effect, variant)`
//! to the WGSL module for that kernel.
//!
//! Every kernel is independent and stateless; adding an effect means one
//! new entry here plus one packer arm in [`crate::uniforms`] — no other
//! component changes. The halftone family is a single schema with three
//! fragment bodies selected by the variant axis.

use retrofx_core::settings::{EffectSettings, EffectType, HalftoneShape};

/// Cache key for one compiled program: effect family plus the halftone
/// variant axis (None for single-kernel families).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub effect: EffectType,
    pub variant: Option<HalftoneShape>,
}

impl ProgramKey {
    /// The key a settings record resolves to.
    pub fn for_settings(settings: &EffectSettings) -> Self {
        match settings {
            EffectSettings::Halftone(p) => Self {
                effect: EffectType::Halftone,
                variant: Some(p.shape),
            },
            other => Self {
                effect: other.effect_type(),
                variant: None,
            },
        }
    }

    /// Every valid key, in registry order.
    pub fn all() -> Vec<ProgramKey> {
        let mut keys = vec![
            ProgramKey {
                effect: EffectType::Halftone,
                variant: Some(HalftoneShape::Ellipse),
            },
            ProgramKey {
                effect: EffectType::Halftone,
                variant: Some(HalftoneShape::Square),
            },
            ProgramKey {
                effect: EffectType::Halftone,
                variant: Some(HalftoneShape::Lines),
            },
        ];
        for effect in EffectType::ALL {
            if effect != EffectType::Halftone {
                keys.push(ProgramKey {
                    effect,
                    variant: None,
                });
            }
        }
        keys
    }
}

impl std::fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variant {
            Some(v) => write!(f, "{}:{}", self.effect, v),
            None => write!(f, "{}", self.effect),
        }
    }
}

/// One registered effect kernel.
pub struct KernelSpec {
    pub label: &'static str,
    pub fragment: &'static str,
}

impl KernelSpec {
    /// Full WGSL module text: shared preamble plus the kernel body.
    pub fn module_source(&self) -> String {
        format!("{}\n{}", COMMON_WGSL, self.fragment)
    }
}

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");

const HALFTONE_ELLIPSE: KernelSpec = KernelSpec {
    label: "halftone_ellipse",
    fragment: include_str!("shaders/halftone_ellipse.wgsl"),
};
const HALFTONE_SQUARE: KernelSpec = KernelSpec {
    label: "halftone_square",
    fragment: include_str!("shaders/halftone_square.wgsl"),
};
const HALFTONE_LINES: KernelSpec = KernelSpec {
    label: "halftone_lines",
    fragment: include_str!("shaders/halftone_lines.wgsl"),
};
const VHS: KernelSpec = KernelSpec {
    label: "vhs",
    fragment: include_str!("shaders/vhs.wgsl"),
};
const ASCII: KernelSpec = KernelSpec {
    label: "ascii",
    fragment: include_str!("shaders/ascii.wgsl"),
};
const MATRIX_DITHER: KernelSpec = KernelSpec {
    label: "matrix_dither",
    fragment: include_str!("shaders/matrix_dither.wgsl"),
};
const UPSCALE: KernelSpec = KernelSpec {
    label: "upscale",
    fragment: include_str!("shaders/upscale.wgsl"),
};
const DITHER: KernelSpec = KernelSpec {
    label: "dither",
    fragment: include_str!("shaders/dither.wgsl"),
};
const DUOTONE: KernelSpec = KernelSpec {
    label: "duotone",
    fragment: include_str!("shaders/duotone.wgsl"),
};

/// Look up the kernel for a key. Returns None for keys outside the
/// registry (a halftone key without a variant, or a variant on a
/// single-kernel family); callers surface that as a compilation-class
/// failure before any GPU work.
pub fn kernel(key: ProgramKey) -> Option<&'static KernelSpec> {
    match (key.effect, key.variant) {
        (EffectType::Halftone, Some(HalftoneShape::Ellipse)) => Some(&HALFTONE_ELLIPSE),
        (EffectType::Halftone, Some(HalftoneShape::Square)) => Some(&HALFTONE_SQUARE),
        (EffectType::Halftone, Some(HalftoneShape::Lines)) => Some(&HALFTONE_LINES),
        (EffectType::Vhs, None) => Some(&VHS),
        (EffectType::Ascii, None) => Some(&ASCII),
        (EffectType::MatrixDither, None) => Some(&MATRIX_DITHER),
        (EffectType::Upscale, None) => Some(&UPSCALE),
        (EffectType::Dither, None) => Some(&DITHER),
        (EffectType::Duotone, None) => Some(&DUOTONE),
        _ => None,
    }
}

/// Full WGSL module text for a key.
pub fn module_source(key: ProgramKey) -> Option<String> {
    kernel(key).map(|spec| spec.module_source())
}

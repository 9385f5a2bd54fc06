//! Uniform packing: a dispatch table from the settings variant to the
//! byte image of that kernel's `Params` uniform block.
//!
//! Each arm is a pure, total function of the settings record. Values are
//! passed through verbatim — no clamping, no validation; out-of-range
//! parameters produce shader-defined visuals. Struct layouts mirror the
//! WGSL `Params` declarations (std140-style 16-byte multiples).

use bytemuck::{Pod, Zeroable};

use retrofx_core::settings::EffectSettings;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct HalftoneUniforms {
    dot_size: f32,
    angle: f32,
    contrast: f32,
    spacing: f32,
    threshold: f32,
    invert: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct VhsUniforms {
    tape_wave_intensity: f32,
    scanline_intensity: f32,
    noise_intensity: f32,
    chroma_shift: f32,
    time: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct AsciiUniforms {
    cell_size: f32,
    contrast: f32,
    invert: f32,
    monochrome: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MatrixDitherUniforms {
    cell_size: f32,
    brightness: f32,
    _pad: [f32; 2],
    tint: [f32; 3],
    _pad2: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct UpscaleUniforms {
    sharpness: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DitherUniforms {
    levels: f32,
    scale: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DuotoneUniforms {
    shadow_color: [f32; 3],
    intensity: f32,
    highlight_color: [f32; 3],
    _pad: f32,
}

/// Pack the effect-specific uniform block for a settings record.
pub fn pack(settings: &EffectSettings) -> Vec<u8> {
    match *settings {
        EffectSettings::Halftone(p) => bytemuck::bytes_of(&HalftoneUniforms {
            dot_size: p.dot_size,
            angle: p.angle,
            contrast: p.contrast,
            spacing: p.spacing,
            threshold: p.threshold,
            invert: p.invert as u32 as f32,
            _pad: [0.0; 2],
        })
        .to_vec(),
        EffectSettings::Vhs(p) => bytemuck::bytes_of(&VhsUniforms {
            tape_wave_intensity: p.tape_wave_intensity,
            scanline_intensity: p.scanline_intensity,
            noise_intensity: p.noise_intensity,
            chroma_shift: p.chroma_shift,
            time: p.time,
            _pad: [0.0; 3],
        })
        .to_vec(),
        EffectSettings::Ascii(p) => bytemuck::bytes_of(&AsciiUniforms {
            cell_size: p.cell_size,
            contrast: p.contrast,
            invert: p.invert as u32 as f32,
            monochrome: p.monochrome as u32 as f32,
        })
        .to_vec(),
        EffectSettings::MatrixDither(p) => bytemuck::bytes_of(&MatrixDitherUniforms {
            cell_size: p.cell_size,
            brightness: p.brightness,
            _pad: [0.0; 2],
            tint: p.tint,
            _pad2: 0.0,
        })
        .to_vec(),
        EffectSettings::Upscale(p) => bytemuck::bytes_of(&UpscaleUniforms {
            sharpness: p.sharpness,
            _pad: [0.0; 3],
        })
        .to_vec(),
        EffectSettings::Dither(p) => bytemuck::bytes_of(&DitherUniforms {
            levels: p.levels,
            scale: p.scale,
            _pad: [0.0; 2],
        })
        .to_vec(),
        EffectSettings::Duotone(p) => bytemuck::bytes_of(&DuotoneUniforms {
            shadow_color: p.shadow_color,
            intensity: p.intensity,
            highlight_color: p.highlight_color,
            _pad: 0.0,
        })
        .to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrofx_core::settings::{DuotoneParams, EffectType, HalftoneParams};

    #[test]
    fn test_block_sizes_are_16_byte_multiples() {
        for effect in EffectType::ALL {
            let block = pack(&EffectSettings::default_for(effect));
            assert!(!block.is_empty());
            assert_eq!(block.len() % 16, 0, "unaligned block for {}", effect);
        }
    }

    #[test]
    fn test_halftone_field_order() {
        let block = pack(&EffectSettings::Halftone(HalftoneParams {
            dot_size: 5.0,
            angle: 0.25,
            invert: true,
            ..Default::default()
        }));
        assert_eq!(block.len(), 32);
        let floats: &[f32] = bytemuck::cast_slice(&block);
        assert_eq!(floats[0], 5.0);
        assert_eq!(floats[1], 0.25);
        assert_eq!(floats[5], 1.0); // invert flag
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let block = pack(&EffectSettings::Halftone(HalftoneParams {
            dot_size: -3.0,
            ..Default::default()
        }));
        let floats: &[f32] = bytemuck::cast_slice(&block);
        assert_eq!(floats[0], -3.0);
    }

    #[test]
    fn test_duotone_color_layout() {
        let block = pack(&EffectSettings::Duotone(DuotoneParams {
            shadow_color: [0.1, 0.0, 0.2],
            highlight_color: [0.3, 0.9, 0.9],
            intensity: 1.0,
        }));
        assert_eq!(block.len(), 32);
        let floats: &[f32] = bytemuck::cast_slice(&block);
        assert_eq!(&floats[0..3], &[0.1, 0.0, 0.2]);
        assert_eq!(floats[3], 1.0);
        assert_eq!(&floats[4..7], &[0.3, 0.9, 0.9]);
    }
}

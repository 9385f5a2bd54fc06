//! Source texture cache.
//!
//! The engine keeps exactly one live source texture, keyed by the source
//! identity string plus its pixel dimensions. Interactive parameter
//! tweaks re-render against the cached upload; only a new source (or the
//! same source at new dimensions) pays the upload cost again.

use retrofx_core::FrameBuffer;

use crate::gpu::GpuContext;

/// The currently resident source texture.
pub struct CachedTexture {
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub struct TextureCache {
    current: Option<CachedTexture>,
    upload_count: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            current: None,
            upload_count: 0,
        }
    }

    /// Upload `frame` under `key`, unless the resident texture already
    /// matches `(key, width, height)` — then the cached handle is
    /// returned unchanged. The previous texture is destroyed on replace;
    /// the same key never maps to two uploads.
    pub fn upload_if_changed(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameBuffer,
        key: &str,
    ) -> &CachedTexture {
        let matches = self
            .current
            .as_ref()
            .is_some_and(|c| c.key == key && c.width == frame.width && c.height == frame.height);

        if !matches {
            if let Some(old) = self.current.take() {
                old.texture.destroy();
            }

            tracing::debug!(key, frame.width, frame.height, "uploading source texture");
            let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("source_texture"),
                size: wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });

            gpu.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &frame.data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(frame.width * 4),
                    rows_per_image: Some(frame.height),
                },
                wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
            );

            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.current = Some(CachedTexture {
                key: key.to_string(),
                width: frame.width,
                height: frame.height,
                texture,
                view,
            });
            self.upload_count += 1;
        }

        // Unconditionally populated above on miss.
        self.current.as_ref().expect("texture cache populated")
    }

    /// Number of uploads performed over the cache lifetime. Observable so
    /// tests can assert that unchanged sources skip the upload.
    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

//! Texture-backed color attachments.
//!
//! A texture attachment is the sampleable alternative to a color
//! renderbuffer. It always uses unsized `RGBA` storage with
//! `UNSIGNED_BYTE` texels, which both desktop GL and GLES 2 accept for
//! `glTexImage2D`.

use super::diagnostics::{created, gl_stage};
use crate::config::RenderableApi;
use crate::error::RenderError;

/// Parameters for allocating a color texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// GL internal format passed to `glTexImage2D`.
    pub internal_format: u32,
    /// Min and mag filter.
    pub filter: u32,
    /// Wrap mode on both axes.
    pub wrap: u32,
}

impl TextureConfig {
    /// RGBA8 attachment with `NEAREST` filtering.
    ///
    /// Desktop GL clamps to the border; GLES 2 has no border clamp and
    /// falls back to clamping to the edge.
    pub fn color_attachment(width: u32, height: u32, api: RenderableApi) -> Self {
        let wrap = match api {
            RenderableApi::OpenGl => glow::CLAMP_TO_BORDER,
            RenderableApi::OpenGlEs2 => glow::CLAMP_TO_EDGE,
        };
        Self {
            width,
            height,
            internal_format: glow::RGBA,
            filter: glow::NEAREST,
            wrap,
        }
    }
}

/// Allocates an uninitialized texture described by `config`.
///
/// The texture is left unbound.
///
/// # Errors
///
/// Returns `GraphicsOperationFailed` if the driver rejects the allocation
/// (e.g. `GL_OUT_OF_MEMORY`). The texture is deleted again in that case.
#[allow(unsafe_code)]
pub fn create_texture(
    gl: &glow::Context,
    config: &TextureConfig,
) -> Result<glow::Texture, RenderError> {
    use glow::HasContext;

    // SAFETY: glow wraps raw GL calls as unsafe; a context is current.
    let texture = created("texture", unsafe { gl.create_texture() })?;

    let allocated = gl_stage(gl, "glTexImage2D", |gl| {
        // SAFETY: `texture` was just created; all parameters are valid enums.
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                config.filter as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                config.filter as i32,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, config.wrap as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, config.wrap as i32);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                config.internal_format as i32,
                config.width as i32,
                config.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    });

    if let Err(e) = allocated {
        // SAFETY: `texture` is a valid handle owned by this function.
        unsafe { gl.delete_texture(texture) };
        return Err(e);
    }
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_attachment_sets_dimensions() {
        let config = TextureConfig::color_attachment(1024, 768, RenderableApi::OpenGl);
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 768);
    }

    #[test]
    fn color_attachment_is_rgba_nearest() {
        let config = TextureConfig::color_attachment(8, 8, RenderableApi::OpenGl);
        assert_eq!(config.internal_format, glow::RGBA);
        assert_eq!(config.filter, glow::NEAREST);
    }

    #[test]
    fn desktop_clamps_to_border_es_to_edge() {
        let desktop = TextureConfig::color_attachment(8, 8, RenderableApi::OpenGl);
        let es = TextureConfig::color_attachment(8, 8, RenderableApi::OpenGlEs2);
        assert_eq!(desktop.wrap, glow::CLAMP_TO_BORDER);
        assert_eq!(es.wrap, glow::CLAMP_TO_EDGE);
    }

    #[test]
    fn texture_config_debug_format_is_readable() {
        let config = TextureConfig::color_attachment(100, 200, RenderableApi::OpenGl);
        let debug = format!("{config:?}");
        assert!(debug.contains("100"), "missing width in debug: {debug}");
        assert!(debug.contains("200"), "missing height in debug: {debug}");
    }
}

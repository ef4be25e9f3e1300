//! Framebuffer render targets with color and depth attachments.
//!
//! A `FramebufferTarget` is where the scene is actually drawn and where
//! pixels are read back from; the session's pbuffer is never used for
//! either. Provisioning follows a fixed order: size check, framebuffer,
//! color attachment, depth attachment, completeness check. Any failure
//! after the size check drops the partly built target, which deletes
//! whatever was created and rebinds the default framebuffer.

use super::context::RenderSession;
use super::diagnostics::{check_gl_error, created, gl_stage};
use super::texture::{create_texture, TextureConfig};
use crate::config::{AttachmentKind, ColorFormat, DepthFormat, RenderableApi, TargetConfig};
use crate::error::RenderError;
use crate::pixel::PixelBuffer;

/// Rejects sizes the driver cannot back with a renderbuffer.
///
/// Both edges must be non-zero and strictly below `max`.
pub fn check_target_size(width: u32, height: u32, max: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions);
    }
    if width >= max || height >= max {
        return Err(RenderError::MaxRenderbufferSizeExceeded { width, height, max });
    }
    Ok(())
}

/// Renderbuffer internal format for a color storage choice.
pub fn color_internal_format(format: ColorFormat) -> u32 {
    match format {
        ColorFormat::Rgba8 => glow::RGBA8,
        ColorFormat::Rgb565 => glow::RGB565,
    }
}

/// Renderbuffer internal format for a depth storage choice.
pub fn depth_internal_format(format: DepthFormat) -> u32 {
    match format {
        DepthFormat::Depth16 => glow::DEPTH_COMPONENT16,
        DepthFormat::Depth24 => glow::DEPTH_COMPONENT24,
    }
}

/// Storage backing the color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorAttachment {
    Renderbuffer(glow::Renderbuffer),
    Texture(glow::Texture),
}

/// An off-screen framebuffer sized to the output image.
///
/// Borrows the session it was created in, so it cannot outlive the
/// context. GPU objects are deleted by [`FramebufferTarget::release`], or
/// on drop if release was never called.
pub struct FramebufferTarget<'s> {
    session: &'s RenderSession,
    fbo: glow::Framebuffer,
    color: Option<ColorAttachment>,
    depth: Option<glow::Renderbuffer>,
    width: u32,
    height: u32,
    released: bool,
}

impl<'s> FramebufferTarget<'s> {
    /// Builds a complete framebuffer for `config`.
    ///
    /// # Errors
    ///
    /// `InvalidDimensions` or `MaxRenderbufferSizeExceeded` before any GL
    /// object exists; `IncompleteFramebuffer` or a GL error afterwards.
    pub fn provision(
        session: &'s RenderSession,
        config: &TargetConfig,
    ) -> Result<Self, RenderError> {
        check_target_size(config.width, config.height, session.max_renderbuffer_size())?;

        let mut target = Self::create_framebuffer(session, config.width, config.height)?;
        match config.attachment {
            AttachmentKind::Renderbuffer => target.attach_color(config.color)?,
            AttachmentKind::Texture => target.attach_color_texture()?,
        }
        target.attach_depth(config.depth)?;
        target.validate()?;

        log::debug!(
            "framebuffer {}x{} ready ({:?} color, {:?} depth)",
            config.width,
            config.height,
            config.attachment,
            config.depth
        );
        Ok(target)
    }

    /// Creates the empty framebuffer object and binds it.
    #[allow(unsafe_code)]
    pub fn create_framebuffer(
        session: &'s RenderSession,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        use glow::HasContext;

        let gl = session.gl();
        // SAFETY: a context is current for as long as `session` lives.
        let fbo = created("framebuffer", unsafe { gl.create_framebuffer() })?;
        let target = Self {
            session,
            fbo,
            color: None,
            depth: None,
            width,
            height,
            released: false,
        };
        gl_stage(gl, "glBindFramebuffer", |gl| {
            // SAFETY: `fbo` is a freshly created framebuffer name.
            unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo)) };
            Ok(())
        })?;
        Ok(target)
    }

    /// Allocates renderbuffer color storage and attaches it at
    /// `COLOR_ATTACHMENT0`.
    pub fn attach_color(&mut self, format: ColorFormat) -> Result<(), RenderError> {
        let rb = self.attach_renderbuffer(
            "color renderbuffer",
            color_internal_format(format),
            glow::COLOR_ATTACHMENT0,
        )?;
        self.color = Some(ColorAttachment::Renderbuffer(rb));
        Ok(())
    }

    /// Allocates an RGBA texture and attaches it at `COLOR_ATTACHMENT0`.
    #[allow(unsafe_code)]
    pub fn attach_color_texture(&mut self) -> Result<(), RenderError> {
        use glow::HasContext;

        let gl = self.session.gl();
        let config = TextureConfig::color_attachment(self.width, self.height, self.session.api());
        let texture = create_texture(gl, &config)?;
        // Owned from here so a failed attach still deletes it.
        self.color = Some(ColorAttachment::Texture(texture));

        gl_stage(gl, "glFramebufferTexture2D", |gl| {
            // SAFETY: `self.fbo` and `texture` are live names on this context.
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }
            Ok(())
        })
    }

    /// Allocates depth renderbuffer storage and attaches it.
    pub fn attach_depth(&mut self, format: DepthFormat) -> Result<(), RenderError> {
        let rb = self.attach_renderbuffer(
            "depth renderbuffer",
            depth_internal_format(format),
            glow::DEPTH_ATTACHMENT,
        )?;
        self.depth = Some(rb);
        Ok(())
    }

    #[allow(unsafe_code)]
    fn attach_renderbuffer(
        &mut self,
        what: &str,
        internal_format: u32,
        attachment: u32,
    ) -> Result<glow::Renderbuffer, RenderError> {
        use glow::HasContext;

        let gl = self.session.gl();
        // SAFETY: a context is current for as long as the session lives.
        let rb = created(what, unsafe { gl.create_renderbuffer() })?;
        let (width, height) = (self.width as i32, self.height as i32);

        let attached = gl_stage(gl, "glFramebufferRenderbuffer", |gl| {
            // SAFETY: `rb` and `self.fbo` are live names; the size was
            // checked against GL_MAX_RENDERBUFFER_SIZE.
            unsafe {
                gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rb));
                gl.renderbuffer_storage(glow::RENDERBUFFER, internal_format, width, height);
                gl.bind_renderbuffer(glow::RENDERBUFFER, None);
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::RENDERBUFFER,
                    Some(rb),
                );
            }
            Ok(())
        });

        if let Err(e) = attached {
            // SAFETY: `rb` is owned here and not referenced by anything else.
            unsafe { gl.delete_renderbuffer(rb) };
            return Err(e);
        }
        Ok(rb)
    }

    /// Fails unless the driver reports `FRAMEBUFFER_COMPLETE`.
    #[allow(unsafe_code)]
    pub fn validate(&self) -> Result<(), RenderError> {
        use glow::HasContext;

        let status = gl_stage(self.session.gl(), "glCheckFramebufferStatus", |gl| {
            // SAFETY: `self.fbo` is a live framebuffer name.
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
                Ok(gl.check_framebuffer_status(glow::FRAMEBUFFER))
            }
        })?;
        if status != glow::FRAMEBUFFER_COMPLETE {
            return Err(RenderError::IncompleteFramebuffer { status });
        }
        Ok(())
    }

    fn draw_binding(&self) -> u32 {
        match self.session.api() {
            RenderableApi::OpenGl => glow::DRAW_FRAMEBUFFER,
            RenderableApi::OpenGlEs2 => glow::FRAMEBUFFER,
        }
    }

    fn read_binding(&self) -> u32 {
        match self.session.api() {
            RenderableApi::OpenGl => glow::READ_FRAMEBUFFER,
            RenderableApi::OpenGlEs2 => glow::FRAMEBUFFER,
        }
    }

    /// Redirects draw calls to this target and sets the viewport to cover it.
    #[allow(unsafe_code)]
    pub fn bind_as_draw_target(&self) -> Result<(), RenderError> {
        use glow::HasContext;

        let binding = self.draw_binding();
        gl_stage(self.session.gl(), "bind draw framebuffer", |gl| {
            // SAFETY: `self.fbo` is a live, complete framebuffer.
            unsafe {
                gl.bind_framebuffer(binding, Some(self.fbo));
                gl.viewport(0, 0, self.width as i32, self.height as i32);
            }
            Ok(())
        })
    }

    /// Redirects pixel reads to this target.
    #[allow(unsafe_code)]
    pub fn bind_as_read_source(&self) -> Result<(), RenderError> {
        use glow::HasContext;

        let binding = self.read_binding();
        gl_stage(self.session.gl(), "bind read framebuffer", |gl| {
            // SAFETY: `self.fbo` is a live, complete framebuffer.
            unsafe { gl.bind_framebuffer(binding, Some(self.fbo)) };
            Ok(())
        })
    }

    /// Reads the whole target back into `buffer` as RGB8, bottom row first.
    ///
    /// Blocks until pending rendering has finished. `buffer` is resized to
    /// the target's dimensions. GLES 2 only guarantees `RGBA` reads, so
    /// there the pixels go through a scratch buffer and lose their alpha.
    #[allow(unsafe_code)]
    pub fn read_pixels(&self, buffer: &mut PixelBuffer) -> Result<(), RenderError> {
        use glow::HasContext;

        self.bind_as_read_source()?;
        buffer.resize(self.width, self.height)?;
        let (width, height) = (self.width as i32, self.height as i32);

        match self.session.api() {
            RenderableApi::OpenGl => gl_stage(self.session.gl(), "glReadPixels", |gl| {
                // SAFETY: the buffer holds exactly width*height*3 bytes and
                // PACK_ALIGNMENT 1 means rows are tightly packed.
                unsafe {
                    gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
                    gl.read_pixels(
                        0,
                        0,
                        width,
                        height,
                        glow::RGB,
                        glow::UNSIGNED_BYTE,
                        glow::PixelPackData::Slice(Some(buffer.data_mut())),
                    );
                }
                Ok(())
            }),
            RenderableApi::OpenGlEs2 => {
                let mut rgba = vec![0u8; self.width as usize * self.height as usize * 4];
                gl_stage(self.session.gl(), "glReadPixels", |gl| {
                    // SAFETY: `rgba` holds width*height*4 bytes; RGBA rows
                    // are always 4-byte aligned.
                    unsafe {
                        gl.read_pixels(
                            0,
                            0,
                            width,
                            height,
                            glow::RGBA,
                            glow::UNSIGNED_BYTE,
                            glow::PixelPackData::Slice(Some(&mut rgba)),
                        );
                    }
                    Ok(())
                })?;
                for (dst, src) in buffer
                    .data_mut()
                    .chunks_exact_mut(3)
                    .zip(rgba.chunks_exact(4))
                {
                    dst.copy_from_slice(&src[..3]);
                }
                Ok(())
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_attachment(&self) -> Option<ColorAttachment> {
        self.color
    }

    /// Deletes attachments and the framebuffer, reporting any GL error.
    pub fn release(mut self) -> Result<(), RenderError> {
        self.delete_objects();
        check_gl_error(self.session.gl(), "release framebuffer")
    }

    #[allow(unsafe_code)]
    fn delete_objects(&mut self) {
        use glow::HasContext;

        if self.released {
            return;
        }
        self.released = true;
        let gl = self.session.gl();
        // SAFETY: every name below was created on this session's context
        // and is deleted exactly once thanks to the `released` flag.
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            match self.color.take() {
                Some(ColorAttachment::Renderbuffer(rb)) => gl.delete_renderbuffer(rb),
                Some(ColorAttachment::Texture(tex)) => gl.delete_texture(tex),
                None => {}
            }
            if let Some(rb) = self.depth.take() {
                gl.delete_renderbuffer(rb);
            }
            gl.delete_framebuffer(self.fbo);
        }
    }
}

impl Drop for FramebufferTarget<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.delete_objects();
            if let Err(e) = check_gl_error(self.session.gl(), "drop framebuffer") {
                log::warn!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_below_max_is_accepted() {
        assert!(check_target_size(500, 500, 16384).is_ok());
        assert!(check_target_size(16383, 1, 16384).is_ok());
    }

    #[test]
    fn size_at_max_is_rejected() {
        let err = check_target_size(16384, 10, 16384).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MaxRenderbufferSizeExceeded {
                width: 16384,
                height: 10,
                max: 16384
            }
        ));
    }

    #[test]
    fn height_over_max_is_rejected() {
        assert!(matches!(
            check_target_size(10, 40000, 8192),
            Err(RenderError::MaxRenderbufferSizeExceeded { .. })
        ));
    }

    #[test]
    fn zero_size_is_invalid() {
        assert!(matches!(
            check_target_size(0, 10, 8192),
            Err(RenderError::InvalidDimensions)
        ));
    }

    #[test]
    fn zero_max_rejects_everything() {
        assert!(check_target_size(1, 1, 0).is_err());
    }

    #[test]
    fn storage_formats_come_from_renderbuffer_enumeration() {
        assert_eq!(color_internal_format(ColorFormat::Rgb565), glow::RGB565);
        assert_eq!(color_internal_format(ColorFormat::Rgba8), glow::RGBA8);
        assert_eq!(
            depth_internal_format(DepthFormat::Depth16),
            glow::DEPTH_COMPONENT16
        );
        assert_eq!(
            depth_internal_format(DepthFormat::Depth24),
            glow::DEPTH_COMPONENT24
        );
    }
}

//! End-to-end offscreen render.
//!
//! [`render_frame`] runs the stages in order: open the session, provision
//! the framebuffer, build the scene, draw one or more frames, read the
//! pixels back, then release everything in reverse order. The first failing
//! stage aborts the rest; objects already created are still released.

use super::context::RenderSession;
use super::scene::TriangleScene;
use super::target::FramebufferTarget;
use crate::config::FrameConfig;
use crate::error::RenderError;
use crate::model::{ModelState, SceneModel};
use crate::pixel::PixelBuffer;

/// Pixels of the final frame plus what produced them.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    /// RGB8, bottom row first.
    pub pixels: PixelBuffer,
    /// Model state the exported frame was drawn with.
    pub state: ModelState,
    /// EGL `(major, minor)` reported by `eglInitialize`.
    pub egl_version: (i32, i32),
    /// `GL_VERSION` string of the context.
    pub gl_version: String,
}

/// Renders the triangle off-screen and returns the final frame.
///
/// With `config.max_frames == None` a single frame is drawn at angle 0.
/// Otherwise the model is stepped and redrawn until it reports a terminal
/// frame count, and the last frame is read back.
///
/// # Errors
///
/// Whatever the first failing stage reports. Validation errors are returned
/// before any driver call.
pub fn render_frame(config: &FrameConfig) -> Result<RenderedFrame, RenderError> {
    config.validate()?;

    let session = RenderSession::open(&config.surface)?;
    let (pixels, state) = render_in_session(&session, config)?;
    let frame = RenderedFrame {
        pixels,
        state,
        egl_version: session.egl_version(),
        gl_version: session.gl_version().to_string(),
    };
    session.teardown()?;
    Ok(frame)
}

fn render_in_session(
    session: &RenderSession,
    config: &FrameConfig,
) -> Result<(PixelBuffer, ModelState), RenderError> {
    let target = FramebufferTarget::provision(session, &config.target)?;
    target.bind_as_draw_target()?;

    let aspect = config.target.width as f32 / config.target.height as f32;
    let scene = TriangleScene::new(session, config.clear_color, aspect)?;

    let mut model = SceneModel::new(config.delta_angle, config.max_frames.unwrap_or(0));
    model.init();
    match config.max_frames {
        None => scene.draw(model.state())?,
        Some(_) => {
            log::debug!("rendering up to {} frames", model.max_frames());
            // A zero budget is terminal immediately; the initial state is
            // still drawn so there is a frame to export.
            if model.is_terminal() {
                scene.draw(model.state())?;
            }
            while !model.is_terminal() {
                model.update();
                let state = model.state();
                scene.draw(state)?;
                log::trace!("frame {} at {:.1} deg", state.frame_count, state.angle);
            }
        }
    }

    let mut pixels = PixelBuffer::new(target.width(), target.height())?;
    target.read_pixels(&mut pixels)?;
    scene.release()?;
    target.release()?;

    Ok((pixels, *model.state()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttachmentKind, RenderableApi, SurfaceConfig, TargetConfig};
    use crate::render::target::ColorAttachment;

    // Everything below needs a working EGL implementation (e.g. Mesa with
    // the surfaceless or device platform). Run with
    // `cargo test -p eglframe-core -- --ignored` on such a machine.

    fn square(size: u32) -> FrameConfig {
        FrameConfig {
            target: TargetConfig::renderbuffer(size, size),
            ..FrameConfig::default()
        }
    }

    /// Four black corners and a non-black blend at the triangle centroid.
    fn assert_triangle_on_black(frame: &RenderedFrame) {
        let pixels = &frame.pixels;
        let (w, h) = (pixels.width(), pixels.height());
        for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
            assert_eq!(pixels.get(x, y), [0, 0, 0], "corner ({x}, {y})");
        }

        let (cx, cy) = crate::render::scene::triangle_centroid();
        let px = ((cx + 1.0) * 0.5 * w as f32) as u32;
        let py = ((cy + 1.0) * 0.5 * h as f32) as u32;
        let [r, g, b] = pixels.get(px, py);
        assert!(r > 0 && g > 0 && b > 0, "centroid ({px}, {py}) = {:?}", [r, g, b]);
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn single_frame_has_black_corners_and_blended_centroid() {
        let frame = render_frame(&square(500)).unwrap();
        assert_eq!((frame.pixels.width(), frame.pixels.height()), (500, 500));
        assert_triangle_on_black(&frame);
        assert_eq!(frame.state.frame_count, 0);
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn gles2_readback_matches_desktop_layout() {
        let mut config = square(128);
        config.surface.api = RenderableApi::OpenGlEs2;
        let frame = render_frame(&config).unwrap();
        assert_triangle_on_black(&frame);

        let desktop = render_frame(&square(128)).unwrap();
        assert_eq!(frame.pixels, desktop.pixels);
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn gles2_texture_attachment_renders() {
        let mut config = square(64);
        config.surface.api = RenderableApi::OpenGlEs2;
        config.target.attachment = AttachmentKind::Texture;
        let frame = render_frame(&config).unwrap();
        assert_triangle_on_black(&frame);
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn multi_frame_run_stops_at_budget() {
        let config = FrameConfig {
            max_frames: Some(128),
            ..square(64)
        };
        let frame = render_frame(&config).unwrap();
        assert_eq!(frame.state.frame_count, 128);
        assert!((frame.state.angle - 128.0).abs() < 1e-3);
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn texture_attachment_renders_the_same_corners() {
        let mut config = square(32);
        config.target.attachment = AttachmentKind::Texture;
        config.clear_color = [1.0, 0.0, 0.0, 1.0];
        let frame = render_frame(&config).unwrap();
        assert_eq!(frame.pixels.get(0, 0), [255, 0, 0]);
    }

    #[allow(unsafe_code)]
    fn framebuffer_binding(session: &RenderSession) -> i32 {
        use glow::HasContext;
        // SAFETY: plain state query on the session's current context.
        unsafe { session.gl().get_parameter_i32(glow::FRAMEBUFFER_BINDING) }
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn provisioning_respects_max_renderbuffer_size() {
        let session = RenderSession::open(&SurfaceConfig::default()).unwrap();
        let max = session.max_renderbuffer_size();

        let target = FramebufferTarget::provision(&session, &TargetConfig::renderbuffer(64, 64))
            .unwrap();
        assert!(matches!(
            target.color_attachment(),
            Some(ColorAttachment::Renderbuffer(_))
        ));
        target.release().unwrap();

        let bound_before = framebuffer_binding(&session);
        let over = max.saturating_add(1);
        for (width, height) in [(max, 1), (1, max), (over, over)] {
            let config = TargetConfig::renderbuffer(width, height);
            let err = FramebufferTarget::provision(&session, &config).err().unwrap();
            assert!(
                matches!(err, RenderError::MaxRenderbufferSizeExceeded { .. }),
                "got: {err}"
            );
            assert_eq!(
                framebuffer_binding(&session),
                bound_before,
                "binding changed after {width}x{height}"
            );
        }
        session.teardown().unwrap();
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn texture_target_reports_texture_attachment() {
        let session = RenderSession::open(&SurfaceConfig::default()).unwrap();
        let config = TargetConfig {
            attachment: AttachmentKind::Texture,
            ..TargetConfig::renderbuffer(16, 16)
        };
        let target = FramebufferTarget::provision(&session, &config).unwrap();
        assert!(matches!(
            target.color_attachment(),
            Some(ColorAttachment::Texture(_))
        ));
        target.release().unwrap();
        session.teardown().unwrap();
    }

    #[test]
    #[ignore = "requires EGL display"]
    fn impossible_depth_size_has_no_config() {
        let mut config = square(16);
        config.surface.depth_bits = 255;
        assert!(matches!(
            render_frame(&config),
            Err(RenderError::NoCompatibleConfig)
        ));
    }

    #[test]
    fn zero_size_fails_before_touching_the_driver() {
        assert!(matches!(
            render_frame(&square(0)),
            Err(RenderError::InvalidDimensions)
        ));
    }
}

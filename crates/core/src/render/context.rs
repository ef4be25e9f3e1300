//! Headless EGL context management.
//!
//! `RenderSession` owns the whole EGL side of a run: the display
//! connection, a 9x9 pbuffer used only as a binding anchor, the context
//! made current on the calling thread, and the `glow::Context` loaded
//! from it. Everything GPU-side in this crate
//! borrows a session, so the borrow checker guarantees that framebuffers
//! and programs are released before [`RenderSession::teardown`] runs.
//!
//! `libEGL` is loaded at runtime. On machines without a GPU, Mesa's
//! surfaceless platform works with `EGL_PLATFORM=surfaceless`.

use std::ffi::c_void;
use std::marker::PhantomData;

use khronos_egl as egl;

use super::diagnostics::{check_egl_error, check_gl_error, egl_code, egl_failure};
use crate::config::{RenderableApi, SurfaceConfig, PBUFFER_SIZE};
use crate::error::RenderError;

/// EGL 1.4 entry points loaded from the system `libEGL`.
pub type Egl = egl::DynamicInstance<egl::EGL1_4>;

/// Attribute list handed to `eglChooseConfig` for a surface descriptor.
pub fn config_attribs(surface: &SurfaceConfig) -> [egl::Int; 13] {
    let renderable = match surface.api {
        RenderableApi::OpenGl => egl::OPENGL_BIT,
        RenderableApi::OpenGlEs2 => egl::OPENGL_ES2_BIT,
    };
    [
        egl::SURFACE_TYPE,
        egl::PBUFFER_BIT,
        egl::BLUE_SIZE,
        egl::Int::from(surface.blue_bits),
        egl::GREEN_SIZE,
        egl::Int::from(surface.green_bits),
        egl::RED_SIZE,
        egl::Int::from(surface.red_bits),
        egl::DEPTH_SIZE,
        egl::Int::from(surface.depth_bits),
        egl::RENDERABLE_TYPE,
        renderable,
        egl::NONE,
    ]
}

/// Attribute list for the anchor pbuffer.
pub fn pbuffer_attribs() -> [egl::Int; 5] {
    let edge = PBUFFER_SIZE as egl::Int;
    [egl::WIDTH, edge, egl::HEIGHT, edge, egl::NONE]
}

/// Attribute list for `eglCreateContext`.
pub fn context_attribs(api: RenderableApi) -> &'static [egl::Int] {
    match api {
        RenderableApi::OpenGl => &[egl::NONE],
        RenderableApi::OpenGlEs2 => &[egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE],
    }
}

fn api_enum(api: RenderableApi) -> egl::Enum {
    match api {
        RenderableApi::OpenGl => egl::OPENGL_API,
        RenderableApi::OpenGlEs2 => egl::OPENGL_ES_API,
    }
}

/// Loads `libEGL` and opens the default display.
///
/// # Errors
///
/// `DisplayUnavailable` if the library cannot be loaded or it has no
/// default display.
#[allow(unsafe_code)]
pub fn acquire_display() -> Result<(Egl, egl::Display), RenderError> {
    // SAFETY: loading libEGL runs its initialisers; nothing else in this
    // process has loaded a conflicting EGL implementation.
    let egl = unsafe { Egl::load_required() }
        .map_err(|e| RenderError::DisplayUnavailable(format!("cannot load libEGL: {e}")))?;

    // SAFETY: EGL_DEFAULT_DISPLAY is always a valid native display id.
    let display = unsafe { egl.get_display(egl::DEFAULT_DISPLAY) }.ok_or_else(|| {
        RenderError::DisplayUnavailable("eglGetDisplay returned EGL_NO_DISPLAY".into())
    })?;
    Ok((egl, display))
}

/// Initializes the display and returns the negotiated EGL version.
pub fn initialize(egl: &Egl, display: egl::Display) -> Result<(i32, i32), RenderError> {
    let (major, minor) = egl
        .initialize(display)
        .map_err(|e| RenderError::InitializationFailed { code: egl_code(e) })?;
    log::debug!("EGL {major}.{minor} initialized");
    Ok((major, minor))
}

/// Selects the first config matching `surface`. A degraded match is never
/// accepted: zero matches is an error.
pub fn choose_config(
    egl: &Egl,
    display: egl::Display,
    surface: &SurfaceConfig,
) -> Result<egl::Config, RenderError> {
    let attribs = config_attribs(surface);
    let config = egl
        .choose_first_config(display, &attribs)
        .map_err(|e| egl_failure("eglChooseConfig", e))?
        .ok_or(RenderError::NoCompatibleConfig)?;

    if log::log_enabled!(log::Level::Debug) {
        let attr = |a: egl::Int| egl.get_config_attrib(display, config, a).unwrap_or(-1);
        log::debug!(
            "EGL config: r{} g{} b{} depth{}",
            attr(egl::RED_SIZE),
            attr(egl::GREEN_SIZE),
            attr(egl::BLUE_SIZE),
            attr(egl::DEPTH_SIZE)
        );
    }
    Ok(config)
}

/// Creates the anchor pbuffer. It is never the render destination.
pub fn create_offscreen_surface(
    egl: &Egl,
    display: egl::Display,
    config: egl::Config,
) -> Result<egl::Surface, RenderError> {
    egl.create_pbuffer_surface(display, config, &pbuffer_attribs())
        .map_err(|e| egl_failure("eglCreatePbufferSurface", e))
}

/// Selects which client API subsequent contexts expose.
pub fn bind_rendering_api(egl: &Egl, api: RenderableApi) -> Result<(), RenderError> {
    egl.bind_api(api_enum(api))
        .map_err(|e| RenderError::UnsupportedApi {
            api: api.name().to_string(),
            code: egl_code(e),
        })
}

/// Creates an unshared context for `config`.
pub fn create_context(
    egl: &Egl,
    display: egl::Display,
    config: egl::Config,
    api: RenderableApi,
) -> Result<egl::Context, RenderError> {
    egl.create_context(display, config, None, context_attribs(api))
        .map_err(|e| egl_failure("eglCreateContext", e))
}

/// Makes `context` current on this thread with `surface` as draw and read.
pub fn make_current(
    egl: &Egl,
    display: egl::Display,
    surface: egl::Surface,
    context: egl::Context,
) -> Result<(), RenderError> {
    egl.make_current(display, Some(surface), Some(surface), Some(context))
        .map_err(|e| RenderError::BindFailed { code: egl_code(e) })
}

/// Unbinds and destroys whatever exists, then terminates the display.
///
/// Every step runs even if an earlier one failed; the first failure is
/// returned.
fn release_egl(
    egl: &Egl,
    display: egl::Display,
    surface: Option<egl::Surface>,
    context: Option<egl::Context>,
) -> Result<(), RenderError> {
    let mut first: Option<RenderError> = None;
    let mut note = |result: Result<(), egl::Error>, operation: &str| {
        if let Err(e) = result {
            first.get_or_insert_with(|| egl_failure(operation, e));
        }
    };

    if context.is_some() {
        note(egl.make_current(display, None, None, None), "eglMakeCurrent");
    }
    if let Some(context) = context {
        note(egl.destroy_context(display, context), "eglDestroyContext");
    }
    if let Some(surface) = surface {
        note(egl.destroy_surface(display, surface), "eglDestroySurface");
    }
    note(egl.terminate(display), "eglTerminate");
    note(egl.release_thread(), "eglReleaseThread");

    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Releases a half-built session if setup fails part way.
struct SetupGuard<'e> {
    egl: &'e Egl,
    display: egl::Display,
    surface: Option<egl::Surface>,
    context: Option<egl::Context>,
    armed: bool,
}

impl Drop for SetupGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = release_egl(self.egl, self.display, self.surface, self.context) {
                log::warn!("cleanup after failed setup: {e}");
            }
        }
    }
}

struct Established {
    surface: egl::Surface,
    context: egl::Context,
    version: (i32, i32),
}

fn establish(
    egl: &Egl,
    display: egl::Display,
    surface_config: &SurfaceConfig,
) -> Result<Established, RenderError> {
    let version = initialize(egl, display)?;
    let mut guard = SetupGuard {
        egl,
        display,
        surface: None,
        context: None,
        armed: true,
    };

    let config = choose_config(egl, display, surface_config)?;
    let surface = create_offscreen_surface(egl, display, config)?;
    guard.surface = Some(surface);

    bind_rendering_api(egl, surface_config.api)?;
    let context = create_context(egl, display, config, surface_config.api)?;
    guard.context = Some(context);

    make_current(egl, display, surface, context)?;

    guard.armed = false;
    Ok(Established {
        surface,
        context,
        version,
    })
}

/// A live headless context, current on the thread that opened it.
///
/// Not `Send`: EGL contexts are bound per thread.
pub struct RenderSession {
    egl: Egl,
    display: egl::Display,
    surface: egl::Surface,
    context: egl::Context,
    gl: glow::Context,
    api: RenderableApi,
    egl_version: (i32, i32),
    gl_version: String,
    max_renderbuffer_size: u32,
    live: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl RenderSession {
    /// Runs the full context setup: acquire display, initialize, choose
    /// config, create the pbuffer, bind the API, create the context, make
    /// it current, then load GL entry points.
    ///
    /// # Errors
    ///
    /// The first failing step's error. Anything created before the
    /// failure is released again.
    #[allow(unsafe_code)]
    pub fn open(surface_config: &SurfaceConfig) -> Result<Self, RenderError> {
        let (egl, display) = acquire_display()?;
        let est = establish(&egl, display, surface_config)?;

        // SAFETY: the context is current on this thread, so every pointer
        // eglGetProcAddress returns belongs to it.
        let gl = unsafe {
            glow::Context::from_loader_function(|name| {
                egl.get_proc_address(name)
                    .map_or(std::ptr::null(), |f| f as *const c_void)
            })
        };

        let mut session = Self {
            egl,
            display,
            surface: est.surface,
            context: est.context,
            gl,
            api: surface_config.api,
            egl_version: est.version,
            gl_version: String::new(),
            max_renderbuffer_size: 0,
            live: true,
            _thread_bound: PhantomData,
        };
        // From here on, `session`'s Drop releases EGL on early return.
        check_egl_error(&session.egl, "eglGetProcAddress")?;
        session.query_limits()?;
        log::info!(
            "{} context ready: {} (max renderbuffer {})",
            session.api.name(),
            session.gl_version,
            session.max_renderbuffer_size
        );
        Ok(session)
    }

    #[allow(unsafe_code)]
    fn query_limits(&mut self) -> Result<(), RenderError> {
        use glow::HasContext;

        // SAFETY: plain state queries on the current context.
        let (version, max) = unsafe {
            (
                self.gl.get_parameter_string(glow::VERSION),
                self.gl.get_parameter_i32(glow::MAX_RENDERBUFFER_SIZE),
            )
        };
        check_gl_error(&self.gl, "glGetIntegerv(GL_MAX_RENDERBUFFER_SIZE)")?;
        self.gl_version = version;
        self.max_renderbuffer_size = u32::try_from(max).unwrap_or(0);
        Ok(())
    }

    /// The GL function table for the current context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn api(&self) -> RenderableApi {
        self.api
    }

    /// EGL version reported by `eglInitialize`.
    pub fn egl_version(&self) -> (i32, i32) {
        self.egl_version
    }

    /// `GL_VERSION` string of the context.
    pub fn gl_version(&self) -> &str {
        &self.gl_version
    }

    /// `GL_MAX_RENDERBUFFER_SIZE`. Targets must stay strictly below it.
    pub fn max_renderbuffer_size(&self) -> u32 {
        self.max_renderbuffer_size
    }

    /// Destroys the context and pbuffer explicitly, then terminates the
    /// display. Must be the last call of a run.
    ///
    /// Taking `self` by value means nothing borrowing the session can be
    /// alive here:
    ///
    /// ```compile_fail
    /// use eglframe_core::config::{SurfaceConfig, TargetConfig};
    /// use eglframe_core::render::{FramebufferTarget, RenderSession};
    ///
    /// let session = RenderSession::open(&SurfaceConfig::default()).unwrap();
    /// let target = FramebufferTarget::provision(&session, &TargetConfig::default()).unwrap();
    /// session.teardown().unwrap();
    /// target.release().unwrap();
    /// ```
    pub fn teardown(mut self) -> Result<(), RenderError> {
        self.live = false;
        log::debug!("tearing down EGL session");
        release_egl(
            &self.egl,
            self.display,
            Some(self.surface),
            Some(self.context),
        )
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if self.live {
            self.live = false;
            if let Err(e) = release_egl(
                &self.egl,
                self.display,
                Some(self.surface),
                Some(self.context),
            ) {
                log::warn!("implicit session teardown: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_attribs_follow_descriptor() {
        let surface = SurfaceConfig {
            red_bits: 5,
            green_bits: 6,
            blue_bits: 5,
            depth_bits: 16,
            ..SurfaceConfig::default()
        };
        let attribs = config_attribs(&surface);
        assert_eq!(attribs[0], egl::SURFACE_TYPE);
        assert_eq!(attribs[1], egl::PBUFFER_BIT);
        assert_eq!(&attribs[2..4], &[egl::BLUE_SIZE, 5]);
        assert_eq!(&attribs[4..6], &[egl::GREEN_SIZE, 6]);
        assert_eq!(&attribs[6..8], &[egl::RED_SIZE, 5]);
        assert_eq!(&attribs[8..10], &[egl::DEPTH_SIZE, 16]);
        assert_eq!(&attribs[10..12], &[egl::RENDERABLE_TYPE, egl::OPENGL_BIT]);
        assert_eq!(attribs[12], egl::NONE);
    }

    #[test]
    fn config_attribs_select_es2_bit() {
        let surface = SurfaceConfig {
            api: RenderableApi::OpenGlEs2,
            ..SurfaceConfig::default()
        };
        let attribs = config_attribs(&surface);
        assert_eq!(attribs[11], egl::OPENGL_ES2_BIT);
    }

    #[test]
    fn pbuffer_is_nine_pixels_square() {
        assert_eq!(
            pbuffer_attribs(),
            [egl::WIDTH, 9, egl::HEIGHT, 9, egl::NONE]
        );
    }

    #[test]
    fn context_attribs_are_none_terminated() {
        for api in [RenderableApi::OpenGl, RenderableApi::OpenGlEs2] {
            assert_eq!(context_attribs(api).last(), Some(&egl::NONE));
        }
        assert_eq!(
            context_attribs(RenderableApi::OpenGlEs2),
            &[egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE]
        );
    }

    #[test]
    fn api_enum_maps_to_bind_api_values() {
        assert_eq!(api_enum(RenderableApi::OpenGl), egl::OPENGL_API);
        assert_eq!(api_enum(RenderableApi::OpenGlEs2), egl::OPENGL_ES_API);
    }

    #[test]
    fn render_session_exposes_context_queries() {
        fn _assert_api(session: &RenderSession) {
            let _gl: &glow::Context = session.gl();
            let _max: u32 = session.max_renderbuffer_size();
            let _v: (i32, i32) = session.egl_version();
        }
    }
}

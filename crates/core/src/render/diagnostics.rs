//! Driver error-state checks.
//!
//! Every group of GL calls runs inside [`gl_stage`], which reads
//! `glGetError` once the group finishes and turns a non-zero code into
//! [`RenderError::GraphicsOperationFailed`]. EGL calls report their own
//! failures through `khronos_egl::Error`; [`egl_failure`] converts those,
//! and [`check_egl_error`] covers the calls that only signal through
//! `eglGetError`.

use super::context::Egl;
use crate::error::{GraphicsApi, RenderError};
use khronos_egl as egl;

/// Builds the structured failure for an EGL error code.
pub fn egl_failure(operation: &str, error: egl::Error) -> RenderError {
    RenderError::GraphicsOperationFailed {
        api: GraphicsApi::Egl,
        operation: operation.to_string(),
        code: egl_code(error),
    }
}

/// Numeric EGL error code, as `eglGetError` would return it.
pub fn egl_code(error: egl::Error) -> u32 {
    egl::Int::from(error) as u32
}

/// Reads `eglGetError` and fails if it is not `EGL_SUCCESS`.
pub fn check_egl_error(egl: &Egl, operation: &str) -> Result<(), RenderError> {
    match egl.get_error() {
        None => Ok(()),
        Some(error) => Err(egl_failure(operation, error)),
    }
}

/// Reads `glGetError` and fails if it is not `GL_NO_ERROR`.
#[allow(unsafe_code)]
pub fn check_gl_error(gl: &glow::Context, operation: &str) -> Result<(), RenderError> {
    use glow::HasContext;

    // SAFETY: glGetError has no preconditions beyond a current context,
    // which every caller holds through a live RenderSession.
    let code = unsafe { gl.get_error() };
    if code == glow::NO_ERROR {
        Ok(())
    } else {
        Err(RenderError::GraphicsOperationFailed {
            api: GraphicsApi::Gl,
            operation: operation.to_string(),
            code,
        })
    }
}

/// Converts glow's `create_*` failure string into a typed error.
pub fn created<T>(object: &str, result: Result<T, String>) -> Result<T, RenderError> {
    result.map_err(|reason| RenderError::ObjectCreationFailed {
        object: object.to_string(),
        reason,
    })
}

/// Runs one group of GL calls and checks the driver error state at its end.
///
/// An error returned by `calls` itself wins over the driver state. A value
/// produced by `calls` is discarded if the check fails, so groups that
/// create GL objects should hand them to an owner with a `Drop` impl
/// inside the closure.
pub fn gl_stage<T, F>(gl: &glow::Context, operation: &str, calls: F) -> Result<T, RenderError>
where
    F: FnOnce(&glow::Context) -> Result<T, RenderError>,
{
    let value = calls(gl)?;
    check_gl_error(gl, operation)?;
    log::trace!("{operation}: ok");
    Ok(value)
}

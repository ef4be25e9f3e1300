//! Shader compilation and linking.
//!
//! The scene needs exactly one program, so this module exposes a single
//! [`build_program`] entry point plus the info-log formatter it uses for
//! compile errors. Sources are GLSL 1.20 on desktop GL and GLSL ES 1.00 on
//! GLES 2; [`versioned_source`] prepends the right header.

use crate::config::RenderableApi;
use crate::error::ShaderError;

/// Prefixes a shader body with the `#version` line (and, for GLES
/// fragment shaders, a default float precision) for `api`.
pub fn versioned_source(api: RenderableApi, stage: u32, body: &str) -> String {
    let header = match (api, stage) {
        (RenderableApi::OpenGl, _) => "#version 120\n",
        (RenderableApi::OpenGlEs2, glow::FRAGMENT_SHADER) => "#version 100\nprecision mediump float;\n",
        (RenderableApi::OpenGlEs2, _) => "#version 100\n",
    };
    format!("{header}{body}")
}

/// Numbers each source line and appends the driver log, so the line
/// references in the log can be matched against the GLSL.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();
    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, _) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

fn stage_name(stage: u32) -> &'static str {
    match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

#[allow(unsafe_code)]
fn compile_stage(
    gl: &glow::Context,
    stage: u32,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    use glow::HasContext;

    let compile_error = |log: String| ShaderError::CompileError {
        stage: stage_name(stage).to_string(),
        log,
    };

    // SAFETY: `stage` is VERTEX_SHADER or FRAGMENT_SHADER and the shader
    // handle is deleted on the failure path.
    unsafe {
        let shader = gl.create_shader(stage).map_err(compile_error)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            Err(compile_error(format_shader_error(source, &log)))
        }
    }
}

/// Compiles both stages and links them into a program.
///
/// Shader objects are deleted before returning whatever the outcome; the
/// linked program keeps what it needs.
///
/// # Errors
///
/// `ShaderError::CompileError` for the first stage that fails to compile,
/// `ShaderError::LinkError` if linking fails.
#[allow(unsafe_code)]
pub fn build_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    let vertex = compile_stage(gl, glow::VERTEX_SHADER, vertex_src)?;
    let fragment = match compile_stage(gl, glow::FRAGMENT_SHADER, fragment_src) {
        Ok(f) => f,
        Err(e) => {
            // SAFETY: `vertex` compiled successfully above.
            unsafe { gl.delete_shader(vertex) };
            return Err(e);
        }
    };

    // SAFETY: both shader handles are valid; the program is deleted on
    // link failure and the shaders are always detached and deleted.
    unsafe {
        let program = match gl.create_program() {
            Ok(p) => p,
            Err(e) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(ShaderError::LinkError(e));
            }
        };
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if gl.get_program_link_status(program) {
            Ok(program)
        } else {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            Err(ShaderError::LinkError(log))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_sources_use_glsl_120() {
        let src = versioned_source(RenderableApi::OpenGl, glow::FRAGMENT_SHADER, "void main() {}");
        assert!(src.starts_with("#version 120\n"), "got:\n{src}");
        assert!(!src.contains("precision"), "got:\n{src}");
    }

    #[test]
    fn es_fragment_sources_declare_precision() {
        let src = versioned_source(RenderableApi::OpenGlEs2, glow::FRAGMENT_SHADER, "void main() {}");
        assert!(src.starts_with("#version 100\nprecision mediump float;\n"), "got:\n{src}");
        let vs = versioned_source(RenderableApi::OpenGlEs2, glow::VERTEX_SHADER, "void main() {}");
        assert!(!vs.contains("precision"), "got:\n{vs}");
    }

    #[test]
    fn format_shader_error_prepends_line_numbers() {
        let formatted = format_shader_error("#version 120\nvoid main() {\n}\n", "0:2: syntax error");
        assert!(formatted.contains("1: #version 120"), "got:\n{formatted}");
        assert!(formatted.contains("2: void main() {"), "got:\n{formatted}");
        assert!(formatted.ends_with("0:2: syntax error"), "got:\n{formatted}");
    }

    #[test]
    fn format_shader_error_right_aligns_line_numbers() {
        let source = (1..=12)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let formatted = format_shader_error(&source, "");
        let lines: Vec<&str> = formatted.lines().collect();
        assert!(lines[0].starts_with(" 1: "), "got: '{}'", lines[0]);
        assert!(lines[9].starts_with("10: "), "got: '{}'", lines[9]);
    }

    #[test]
    fn format_shader_error_handles_empty_inputs() {
        assert_eq!(format_shader_error("", "only log"), "only log");
        assert!(format_shader_error("", "").is_empty());
    }

    #[test]
    fn stage_names_are_readable() {
        assert_eq!(stage_name(glow::VERTEX_SHADER), "vertex");
        assert_eq!(stage_name(glow::FRAGMENT_SHADER), "fragment");
        assert_eq!(stage_name(0), "unknown");
    }
}

//! The one-triangle scene.
//!
//! `TriangleScene` owns a shader program and a vertex buffer holding a
//! red/green/blue triangle. `draw` clears the bound draw target, rotates
//! the triangle about the view axis by the model angle and submits it.

use glam::Mat4;

use super::context::RenderSession;
use super::diagnostics::{check_gl_error, created, gl_stage};
use super::shader::{build_program, versioned_source};
use crate::error::RenderError;
use crate::model::ModelState;

/// Interleaved `x, y, r, g, b` for the three vertices, in local space.
pub const TRIANGLE_VERTICES: [f32; 15] = [
    -0.6, -0.4, 1.0, 0.0, 0.0, //
    0.6, -0.4, 0.0, 1.0, 0.0, //
    0.0, 0.6, 0.0, 0.0, 1.0,
];

const FLOATS_PER_VERTEX: i32 = 5;

const VERTEX_BODY: &str = r#"attribute vec2 a_position;
attribute vec3 a_color;
uniform mat4 u_transform;
varying vec3 v_color;
void main() {
    v_color = a_color;
    gl_Position = u_transform * vec4(a_position, 0.0, 1.0);
}
"#;

const FRAGMENT_BODY: &str = r#"varying vec3 v_color;
void main() {
    gl_FragColor = vec4(v_color, 1.0);
}
"#;

/// Centroid of the untransformed triangle.
pub fn triangle_centroid() -> (f32, f32) {
    let x = (TRIANGLE_VERTICES[0] + TRIANGLE_VERTICES[5] + TRIANGLE_VERTICES[10]) / 3.0;
    let y = (TRIANGLE_VERTICES[1] + TRIANGLE_VERTICES[6] + TRIANGLE_VERTICES[11]) / 3.0;
    (x, y)
}

/// Projection times rotation for a frame.
///
/// The projection is `glOrtho(-aspect, aspect, -1, 1, 1, -1)`, which is the
/// identity on a square target; the rotation is `angle` degrees about +Z.
pub fn scene_transform(state: &ModelState, aspect: f32) -> Mat4 {
    let projection = Mat4::orthographic_rh_gl(-aspect, aspect, -1.0, 1.0, 1.0, -1.0);
    projection * Mat4::from_rotation_z(state.angle.to_radians())
}

/// GPU objects for the triangle. Borrows the session like every other GPU
/// resource so it is released before teardown.
pub struct TriangleScene<'s> {
    session: &'s RenderSession,
    program: glow::Program,
    vbo: glow::Buffer,
    vao: Option<glow::VertexArray>,
    transform: Option<glow::UniformLocation>,
    position_attr: u32,
    color_attr: u32,
    clear_color: [f32; 4],
    aspect: f32,
    released: bool,
}

impl<'s> TriangleScene<'s> {
    /// Builds the program and uploads the vertices.
    ///
    /// `aspect` is the draw target's width divided by its height.
    #[allow(unsafe_code)]
    pub fn new(
        session: &'s RenderSession,
        clear_color: [f32; 4],
        aspect: f32,
    ) -> Result<Self, RenderError> {
        use glow::HasContext;

        let gl = session.gl();
        let api = session.api();
        let program = build_program(
            gl,
            &versioned_source(api, glow::VERTEX_SHADER, VERTEX_BODY),
            &versioned_source(api, glow::FRAGMENT_SHADER, FRAGMENT_BODY),
        )?;

        // SAFETY: `program` linked successfully on the current context.
        let (position_attr, color_attr, transform) = unsafe {
            (
                gl.get_attrib_location(program, "a_position"),
                gl.get_attrib_location(program, "a_color"),
                gl.get_uniform_location(program, "u_transform"),
            )
        };
        // SAFETY: a context is current for as long as `session` lives.
        let vbo = match created("buffer", unsafe { gl.create_buffer() }) {
            Ok(vbo) => vbo,
            Err(e) => {
                // SAFETY: `program` is owned here and unused elsewhere.
                unsafe { gl.delete_program(program) };
                return Err(e);
            }
        };

        let mut scene = Self {
            session,
            program,
            vbo,
            vao: None,
            transform,
            position_attr: position_attr.unwrap_or(0),
            color_attr: color_attr.unwrap_or(1),
            clear_color,
            aspect,
            released: false,
        };
        if position_attr.is_none() || color_attr.is_none() {
            return Err(RenderError::Shader(crate::error::ShaderError::LinkError(
                "vertex attributes a_position/a_color not active".into(),
            )));
        }

        // Vertex arrays exist from GL 3.0 / GLES 3.0 on. Older contexts use
        // the default vertex state.
        if gl.version().major >= 3 {
            // SAFETY: creating a VAO has no preconditions beyond GL >= 3.
            scene.vao = Some(created("vertex array", unsafe { gl.create_vertex_array() })?);
        }

        gl_stage(gl, "upload triangle", |gl| {
            // SAFETY: `vbo` is a live buffer; the slice outlives the call.
            unsafe {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(scene.vbo));
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&TRIANGLE_VERTICES),
                    glow::STATIC_DRAW,
                );
            }
            scene.bind_vertex_state(gl);
            Ok(())
        })?;

        Ok(scene)
    }

    #[allow(unsafe_code)]
    fn bind_vertex_state(&self, gl: &glow::Context) {
        use glow::HasContext;

        let stride = FLOATS_PER_VERTEX * std::mem::size_of::<f32>() as i32;
        let color_offset = 2 * std::mem::size_of::<f32>() as i32;
        // SAFETY: `vbo` holds three vertices laid out as described by the
        // stride and offsets; attribute indices come from the linked program.
        unsafe {
            gl.bind_vertex_array(self.vao);
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.vertex_attrib_pointer_f32(self.position_attr, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(self.position_attr);
            gl.vertex_attrib_pointer_f32(
                self.color_attr,
                3,
                glow::FLOAT,
                false,
                stride,
                color_offset,
            );
            gl.enable_vertex_attrib_array(self.color_attr);
        }
    }

    /// Clears color and depth, then draws the triangle rotated by
    /// `state.angle` into whatever framebuffer is bound for drawing.
    #[allow(unsafe_code)]
    pub fn draw(&self, state: &ModelState) -> Result<(), RenderError> {
        use glow::HasContext;

        let matrix = scene_transform(state, self.aspect).to_cols_array();
        let [r, g, b, a] = self.clear_color;
        gl_stage(self.session.gl(), "draw triangle", |gl| {
            // SAFETY: program, buffer and vertex state are live objects of
            // the current context.
            unsafe {
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(glow::LESS);
                gl.clear_color(r, g, b, a);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
                gl.use_program(Some(self.program));
                gl.uniform_matrix_4_f32_slice(self.transform.as_ref(), false, &matrix);
            }
            self.bind_vertex_state(gl);
            // SAFETY: three vertices are bound above.
            unsafe { gl.draw_arrays(glow::TRIANGLES, 0, 3) };
            Ok(())
        })
    }

    /// Deletes the program, buffer and vertex array, reporting any GL error.
    pub fn release(mut self) -> Result<(), RenderError> {
        self.delete_objects();
        check_gl_error(self.session.gl(), "release scene")
    }

    #[allow(unsafe_code)]
    fn delete_objects(&mut self) {
        use glow::HasContext;

        if self.released {
            return;
        }
        self.released = true;
        let gl = self.session.gl();
        // SAFETY: each object was created on this session's context and is
        // deleted once.
        unsafe {
            gl.use_program(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            if let Some(vao) = self.vao.take() {
                gl.bind_vertex_array(None);
                gl.delete_vertex_array(vao);
            }
            gl.delete_buffer(self.vbo);
            gl.delete_program(self.program);
        }
    }
}

impl Drop for TriangleScene<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.delete_objects();
            if let Err(e) = check_gl_error(self.session.gl(), "drop scene") {
                log::warn!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: Mat4, x: f32, y: f32) -> (f32, f32) {
        let v = m * glam::Vec4::new(x, y, 0.0, 1.0);
        (v.x, v.y)
    }

    #[test]
    fn vertices_are_red_green_blue() {
        assert_eq!(&TRIANGLE_VERTICES[2..5], &[1.0, 0.0, 0.0]);
        assert_eq!(&TRIANGLE_VERTICES[7..10], &[0.0, 1.0, 0.0]);
        assert_eq!(&TRIANGLE_VERTICES[12..15], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn centroid_is_inside_below_origin() {
        let (x, y) = triangle_centroid();
        assert!(x.abs() < 1e-6, "x = {x}");
        assert!((y - (-0.4 - 0.4 + 0.6) / 3.0).abs() < 1e-6, "y = {y}");
    }

    #[test]
    fn square_target_at_angle_zero_is_identity() {
        let m = scene_transform(&ModelState::initial(1.0), 1.0);
        let (x, y) = apply(m, 0.6, -0.4);
        assert!((x - 0.6).abs() < 1e-6 && (y + 0.4).abs() < 1e-6, "got ({x}, {y})");
    }

    #[test]
    fn quarter_turn_rotates_counter_clockwise() {
        let state = ModelState {
            angle: 90.0,
            ..ModelState::initial(1.0)
        };
        let (x, y) = apply(scene_transform(&state, 1.0), 1.0, 0.0);
        assert!(x.abs() < 1e-5 && (y - 1.0).abs() < 1e-5, "got ({x}, {y})");
    }

    #[test]
    fn wide_target_squeezes_x() {
        let (x, _) = apply(scene_transform(&ModelState::initial(1.0), 2.0), 1.0, 0.0);
        assert!((x - 0.5).abs() < 1e-6, "got {x}");
    }

    #[test]
    fn shader_bodies_declare_inputs() {
        assert!(VERTEX_BODY.contains("attribute vec2 a_position"));
        assert!(VERTEX_BODY.contains("uniform mat4 u_transform"));
        assert!(FRAGMENT_BODY.contains("gl_FragColor"));
    }
}

//! Animation state for the rotating triangle.
//!
//! `SceneModel` owns a [`ModelState`] and advances it one step per frame.
//! This is pure arithmetic with no GPU dependency; the draw side lives in
//! `render::scene` and only reads the state.

use crate::config::DEFAULT_DELTA_ANGLE;
use serde::Serialize;

/// Per-frame animation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelState {
    /// Rotation about the view axis, in degrees.
    pub angle: f32,
    /// Degrees added by each `update`.
    pub delta_angle: f32,
    /// Number of completed `update` calls.
    pub frame_count: u32,
}

impl ModelState {
    /// State at angle 0 with no frames elapsed.
    pub fn initial(delta_angle: f32) -> Self {
        Self {
            angle: 0.0,
            delta_angle,
            frame_count: 0,
        }
    }
}

impl Default for ModelState {
    fn default() -> Self {
        Self::initial(DEFAULT_DELTA_ANGLE)
    }
}

/// Steps a [`ModelState`] until a terminal frame count.
#[derive(Debug, Clone)]
pub struct SceneModel {
    state: ModelState,
    max_frames: u32,
}

impl SceneModel {
    /// Creates a model already reset to its initial state.
    pub fn new(delta_angle: f32, max_frames: u32) -> Self {
        Self {
            state: ModelState::initial(delta_angle),
            max_frames,
        }
    }

    /// Resets angle and frame count, keeping the configured delta.
    pub fn init(&mut self) {
        self.state = ModelState::initial(self.state.delta_angle);
    }

    /// Advances one frame. Returns `true` once the terminal frame count is reached.
    pub fn update(&mut self) -> bool {
        self.state.angle += self.state.delta_angle;
        self.state.frame_count += 1;
        self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.frame_count >= self.max_frames
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }
}

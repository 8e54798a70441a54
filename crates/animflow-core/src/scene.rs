//! State shared between the simulation thread and the render thread.
//!
//! One mutex guards the published static list, the moving list and the
//! recording accumulator, so a painted frame always sees the two lists from
//! the same instant and never shows an entity in both. A condition variable
//! signals when the current animation has finished, for callers that need a
//! quiescent scene.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::icons::DrawIcon;
use crate::recording::{RecordingAccumulator, StepInfo};
use crate::render::Canvas;

#[derive(Debug)]
struct SceneState {
    static_icons: Vec<Arc<DrawIcon>>,
    moving_icons: Vec<DrawIcon>,
    recording: RecordingAccumulator,
    full_recording: bool,
    animation_done: bool,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            static_icons: Vec::new(),
            moving_icons: Vec::new(),
            recording: RecordingAccumulator::new(),
            full_recording: false,
            animation_done: true,
        }
    }
}

#[derive(Debug)]
struct Scene {
    state: Mutex<SceneState>,
    idle: Condvar,
    icon_size: i32,
}

/// Cheaply clonable handle to the shared scene.
#[derive(Debug, Clone)]
pub struct SceneHandle {
    inner: Arc<Scene>,
}

impl SceneHandle {
    pub fn new(icon_size: i32) -> Self {
        Self {
            inner: Arc::new(Scene {
                state: Mutex::new(SceneState::default()),
                idle: Condvar::new(),
                icon_size,
            }),
        }
    }

    // A panic while holding the lock leaves plain data behind; keep using it.
    fn lock(&self) -> MutexGuard<'_, SceneState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Draw the current lists onto `canvas` and, in full-recording mode,
    /// fold them into the recording. A minimized canvas is not drawn on but
    /// still recorded.
    pub fn paint(&self, canvas: &mut dyn Canvas) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !canvas.is_minimized() {
            canvas.begin_frame();
            for icon in &state.static_icons {
                canvas.draw_icon(icon);
            }
            for icon in &state.moving_icons {
                canvas.draw_icon(icon);
            }
            canvas.end_frame();
        }
        if state.full_recording {
            state.recording.add_frame(&state.static_icons, &state.moving_icons);
        }
    }

    pub fn static_icons(&self) -> Vec<Arc<DrawIcon>> {
        self.lock().static_icons.clone()
    }

    pub fn moving_icons(&self) -> Vec<DrawIcon> {
        self.lock().moving_icons.clone()
    }

    pub(crate) fn publish_static(&self, icons: Vec<Arc<DrawIcon>>) {
        self.lock().static_icons = icons;
    }

    pub(crate) fn publish_moving(&self, icons: Vec<DrawIcon>) {
        self.lock().moving_icons = icons;
    }

    pub(crate) fn clear_moving(&self) {
        self.lock().moving_icons.clear();
    }

    /// Switch full recording on or off. Either way the accumulation starts
    /// over.
    pub(crate) fn set_full_recording(&self, enabled: bool) {
        let mut state = self.lock();
        state.full_recording = enabled;
        state.recording.clear();
    }

    pub fn is_full_recording(&self) -> bool {
        self.lock().full_recording
    }

    pub(crate) fn begin_animation(&self) {
        self.lock().animation_done = false;
    }

    pub(crate) fn finish_animation(&self) {
        self.lock().animation_done = true;
        self.inner.idle.notify_all();
    }

    pub fn is_animation_done(&self) -> bool {
        self.lock().animation_done
    }

    /// Export what was recorded since the last export, once the current
    /// animation (if any) has finished.
    pub fn step_info(&self, time: u64, client_types: &[String]) -> StepInfo {
        let guard = self.lock();
        let mut state = self
            .inner
            .idle
            .wait_while(guard, |s| !s.animation_done)
            .unwrap_or_else(PoisonError::into_inner);
        state
            .recording
            .export(time, self.inner.icon_size, client_types)
    }

    pub(crate) fn reset(&self) {
        let mut state = self.lock();
        let full_recording = state.full_recording;
        *state = SceneState {
            full_recording,
            ..SceneState::default()
        };
        drop(state);
        self.inner.idle.notify_all();
    }
}

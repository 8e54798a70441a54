//! Canvases and the dedicated render thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::icons::DrawIcon;
use crate::scene::SceneHandle;

/// A drawing target. Icons arrive in paint order: static icons first, then
/// moving ones.
pub trait Canvas: Send {
    fn begin_frame(&mut self) {}

    fn draw_icon(&mut self, icon: &DrawIcon);

    fn end_frame(&mut self) {}

    /// A minimized canvas is skipped when painting; recording continues.
    fn is_minimized(&self) -> bool {
        false
    }
}

/// Canvas for headless runs: draws nothing and counts as minimized.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCanvas;

impl Canvas for NullCanvas {
    fn draw_icon(&mut self, _icon: &DrawIcon) {}

    fn is_minimized(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("render thread has stopped")]
    Stopped,
}

enum RenderCommand {
    /// Paint one frame. Frames with an acknowledgement channel are waited
    /// for by the sender and do not occupy the asynchronous slot.
    Paint { ack: Option<mpsc::Sender<()>> },
    Shutdown,
}

/// Owns the render thread and its canvas.
///
/// At most one asynchronous frame is outstanding at any time: a new one is
/// only queued once the previous one has been painted.
pub struct RenderThread {
    sender: mpsc::Sender<RenderCommand>,
    handle: Option<JoinHandle<()>>,
    idle: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl RenderThread {
    pub fn spawn(scene: SceneHandle, mut canvas: Box<dyn Canvas>) -> Result<Self, RenderError> {
        let (sender, receiver) = mpsc::channel::<RenderCommand>();
        let idle = Arc::new(AtomicBool::new(true));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let handle = {
            let idle = Arc::clone(&idle);
            let in_flight = Arc::clone(&in_flight);
            thread::Builder::new()
                .name("animflow-render".into())
                .spawn(move || {
                    info!("render thread started");
                    while let Ok(command) = receiver.recv() {
                        match command {
                            RenderCommand::Paint { ack } => {
                                scene.paint(canvas.as_mut());
                                match ack {
                                    Some(ack) => {
                                        let _ = ack.send(());
                                    }
                                    None => {
                                        in_flight.fetch_sub(1, Ordering::AcqRel);
                                        idle.store(true, Ordering::Release);
                                    }
                                }
                            }
                            RenderCommand::Shutdown => break,
                        }
                    }
                    info!("render thread stopped");
                })?
        };

        Ok(Self {
            sender,
            handle: Some(handle),
            idle,
            in_flight,
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue a frame unless one is still being painted.
    ///
    /// Returns `Ok(false)` when the frame was skipped.
    pub fn try_dispatch(&self) -> Result<bool, RenderError> {
        if self
            .idle
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            if self.handle.as_ref().is_none_or(|h| h.is_finished()) {
                return Err(RenderError::Stopped);
            }
            return Ok(false);
        }

        let outstanding = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(outstanding, Ordering::AcqRel);
        if self.sender.send(RenderCommand::Paint { ack: None }).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            self.idle.store(true, Ordering::Release);
            return Err(RenderError::Stopped);
        }
        Ok(true)
    }

    /// Paint a frame and block until it is on the canvas.
    pub fn paint_and_wait(&self) -> Result<(), RenderError> {
        let (ack, done) = mpsc::channel();
        self.sender
            .send(RenderCommand::Paint { ack: Some(ack) })
            .map_err(|_| RenderError::Stopped)?;
        done.recv().map_err(|_| RenderError::Stopped)
    }

    /// No asynchronous frame is outstanding.
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::Acquire)
    }

    /// Highest number of asynchronous frames ever outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        let _ = self.sender.send(RenderCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for RenderThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThread")
            .field("idle", &self.is_idle())
            .field("peak_in_flight", &self.peak_in_flight())
            .finish()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline lifecycle
//!
//! ```text
//!                 on_surface_created              destroy
//! Uninitialized ─────────────────────► Active ─────────────► Destroyed
//!       │                              │    ▲                    ▲
//!       │ (failure: stay, release)     └────┘                    │
//!       │                          on_surface_changed            │
//!       └────────────────────────────────────────────────────────┘
//!                                 destroy
//! ```
//!
//! Resources are bracketed by the `Active` state: the camera, stream texture,
//! capture bridge, textures and engine binding are created together on entry
//! and torn down together, in a fixed order, on exit.

use super::bridge::{CaptureBridge, RedrawRequester};
use super::mode::ModeCommand;
use super::sequencer::{FrameReport, FrameStages, RenderSequencer};
use super::throttle::RecomputeThrottle;
use crate::backends::camera::{CaptureDevice, Resolution, StreamTexture, choose_preview_size};
use crate::config::Config;
use crate::errors::{PipelineError, PipelineResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Platform services the pipeline needs at surface creation
pub trait RenderBackend {
    type Stages: FrameStages;

    /// Open the capture device
    fn open_camera(&mut self) -> PipelineResult<Box<dyn CaptureDevice>>;

    /// Allocate the texture set and initialise the engine against it
    ///
    /// On failure, anything allocated here must already be released.
    fn create_stages(
        &mut self,
        stream: &Arc<StreamTexture>,
        camera_resolution: Resolution,
        display_resolution: Resolution,
    ) -> PipelineResult<Self::Stages>;
}

/// Startup parameters of a pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub camera_resolution: Resolution,
    pub display_resolution: Resolution,
    pub recompute_interval_secs: f32,
    pub process_hdr: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            camera_resolution: config.camera_resolution,
            display_resolution: config.display_resolution,
            recompute_interval_secs: config.recompute_interval_secs,
            process_hdr: config.process_hdr,
        }
    }
}

/// Lifecycle state, exposed for hosts and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
    Destroyed,
}

struct Session<S> {
    camera: Box<dyn CaptureDevice>,
    stream: Arc<StreamTexture>,
    bridge: Arc<CaptureBridge>,
    stages: S,
    sequencer: RenderSequencer,
}

enum State<S> {
    Uninitialized,
    Active(Session<S>),
    Destroyed,
}

/// The frame pipeline controller
pub struct FramePipeline<B: RenderBackend> {
    backend: B,
    redraw: Arc<dyn RedrawRequester>,
    settings: PipelineSettings,
    process_hdr: bool,
    state: State<B::Stages>,
}

impl<B: RenderBackend> FramePipeline<B> {
    pub fn new(backend: B, redraw: Arc<dyn RedrawRequester>, settings: PipelineSettings) -> Self {
        Self {
            backend,
            redraw,
            settings,
            process_hdr: settings.process_hdr,
            state: State::Uninitialized,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self.state {
            State::Uninitialized => LifecycleState::Uninitialized,
            State::Active(_) => LifecycleState::Active,
            State::Destroyed => LifecycleState::Destroyed,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    pub fn process_hdr(&self) -> bool {
        self.process_hdr
    }

    pub fn camera_resolution(&self) -> Resolution {
        match &self.state {
            State::Active(session) => session.sequencer.camera_resolution(),
            _ => self.settings.camera_resolution,
        }
    }

    pub fn display_resolution(&self) -> Resolution {
        self.settings.display_resolution
    }

    /// Active camera's current preview size
    pub fn preview_size(&self) -> Option<Resolution> {
        match &self.state {
            State::Active(session) => session.camera.preview_size(),
            _ => None,
        }
    }

    /// Render stages of the active session
    pub fn stages(&self) -> Option<&B::Stages> {
        match &self.state {
            State::Active(session) => Some(&session.stages),
            _ => None,
        }
    }

    /// Enter `Active`: acquire the camera, textures and engine, start capture
    ///
    /// Failure leaves the pipeline `Uninitialized` with nothing held.
    pub fn on_surface_created(&mut self) -> PipelineResult<()> {
        match self.state {
            State::Uninitialized => {}
            State::Active(_) => {
                debug!("Surface created while already active");
                return Ok(());
            }
            State::Destroyed => {
                return Err(PipelineError::InvalidState(
                    "pipeline has been destroyed".into(),
                ));
            }
        }

        info!(
            camera = %self.settings.camera_resolution,
            display = %self.settings.display_resolution,
            "Starting frame pipeline"
        );
        let session = self.activate().inspect_err(|e| {
            error!(error = %e, "Frame pipeline failed to start");
        })?;
        self.state = State::Active(session);
        info!("Frame pipeline active");
        Ok(())
    }

    fn activate(&mut self) -> PipelineResult<Session<B::Stages>> {
        let mut camera = self.backend.open_camera()?;
        info!(camera = camera.name(), "Camera opened");

        let camera_resolution = match camera.configure(self.settings.camera_resolution) {
            Ok(applied) => applied,
            Err(e) => {
                camera.release();
                return Err(e.into());
            }
        };
        if camera_resolution != self.settings.camera_resolution {
            warn!(
                requested = %self.settings.camera_resolution,
                applied = %camera_resolution,
                "Camera adjusted the capture resolution"
            );
        }
        apply_preview_size(camera.as_mut(), self.settings.display_resolution);

        let stream = Arc::new(StreamTexture::new());
        let bridge = Arc::new(CaptureBridge::new(Arc::clone(&self.redraw)));
        stream.set_listener(bridge.clone());

        if let Err(e) = camera.attach(Arc::clone(&stream)) {
            stream.clear_listener();
            camera.release();
            return Err(e.into());
        }

        let mut stages = match self.backend.create_stages(
            &stream,
            camera_resolution,
            self.settings.display_resolution,
        ) {
            Ok(stages) => stages,
            Err(e) => {
                stream.clear_listener();
                camera.release();
                return Err(e);
            }
        };

        if let Err(e) = camera.start() {
            bridge.detach();
            stream.clear_listener();
            camera.release();
            stages.release();
            return Err(e.into());
        }

        let sequencer = RenderSequencer::new(
            camera_resolution,
            self.settings.display_resolution,
            RecomputeThrottle::from_secs_f32(self.settings.recompute_interval_secs),
        );

        Ok(Session {
            camera,
            stream,
            bridge,
            stages,
            sequencer,
        })
    }

    /// Track a display size change; never reallocates textures
    pub fn on_surface_changed(&mut self, display_size: Resolution) {
        self.settings.display_resolution = display_size;

        let State::Active(session) = &mut self.state else {
            debug!(display = %display_size, "Display size recorded before activation");
            return;
        };

        apply_preview_size(session.camera.as_mut(), display_size);
        session.sequencer.set_display_resolution(display_size);
        if let Err(e) = session.stages.resize_display(display_size) {
            warn!(error = %e, display = %display_size, "Display resize failed");
        }
        info!(display = %display_size, "Display resolution changed");
    }

    /// Run one render pass; `None` unless `Active`
    pub fn render_frame(&mut self) -> Option<FrameReport> {
        self.render_frame_at(Instant::now())
    }

    /// Run one render pass with an explicit frame timestamp
    pub fn render_frame_at(&mut self, now: Instant) -> Option<FrameReport> {
        let State::Active(session) = &mut self.state else {
            return None;
        };
        Some(session.sequencer.render_frame(
            &mut session.stages,
            &session.bridge,
            self.process_hdr,
            now,
        ))
    }

    /// Host configuration command; ignored unless `Active`
    pub fn set_mode(&mut self, item: i32, option: i32) {
        if !self.is_active() {
            debug!(item, option, "Mode command ignored, pipeline not active");
            return;
        }

        match ModeCommand::from_raw(item, option) {
            ModeCommand::SetHdr(enabled) => {
                if self.process_hdr != enabled {
                    info!(enabled, "HDR processing toggled");
                }
                self.process_hdr = enabled;
            }
            ModeCommand::Ignored { item, option } => {
                debug!(item, option, "Unhandled mode command");
            }
        }
    }

    /// Shorthand for the HDR on/off command
    pub fn set_hdr(&mut self, enabled: bool) {
        use crate::constants::commands;
        let option = if enabled {
            commands::OPTION_ON
        } else {
            commands::OPTION_OFF
        };
        self.set_mode(commands::ITEM_HDR, option);
    }

    /// Tear everything down and enter `Destroyed`. Idempotent.
    ///
    /// Order: stop callbacks, stop and release the camera, then release the
    /// stages (engine shutdown before texture release).
    pub fn destroy(&mut self) {
        match std::mem::replace(&mut self.state, State::Destroyed) {
            State::Active(mut session) => {
                info!("Destroying frame pipeline");
                session.bridge.detach();
                session.stream.clear_listener();
                session.camera.stop();
                session.camera.release();
                session.stages.release();
                info!("Frame pipeline destroyed");
            }
            State::Uninitialized => {
                debug!("Pipeline destroyed before activation");
            }
            State::Destroyed => {
                debug!("Pipeline already destroyed");
            }
        }
    }
}

impl<B: RenderBackend> Drop for FramePipeline<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn apply_preview_size(camera: &mut dyn CaptureDevice, display_size: Resolution) {
    let Some(size) = choose_preview_size(&camera.supported_preview_sizes(), display_size) else {
        debug!(camera = camera.name(), "Camera reports no preview sizes");
        return;
    };
    match camera.set_preview_size(size) {
        Ok(()) => info!(
            camera = camera.name(),
            preview = %size,
            display = %display_size,
            "Preview size selected"
        ),
        Err(e) => warn!(error = %e, preview = %size, "Failed to set preview size"),
    }
}

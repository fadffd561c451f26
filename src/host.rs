// SPDX-License-Identifier: GPL-3.0-only

//! Headless host shell
//!
//! Plays the part of the windowing host: owns the render thread, delivers
//! surface creation, wakes the pipeline on redraw requests and forwards
//! configuration commands between passes. Rendering goes to an offscreen
//! display texture that can be read back as a snapshot.

use crate::backends::camera::Resolution;
use crate::config::Config;
use crate::constants::timing::IDLE_POLL_INTERVAL;
use crate::errors::{PipelineError, PipelineResult, StageError};
use crate::gpu::GpuContext;
use crate::pipeline::{FramePipeline, PipelineSettings, RedrawRequester};
use crate::render::GpuBackend;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Single-slot redraw request; extra requests while one is queued are dropped
pub struct RedrawSignal {
    tx: SyncSender<()>,
}

impl RedrawSignal {
    pub fn channel() -> (Self, Receiver<()>) {
        let (tx, rx) = mpsc::sync_channel(1);
        (Self { tx }, rx)
    }
}

impl RedrawRequester for RedrawSignal {
    fn request_redraw(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => debug!("Redraw requested after host exit"),
        }
    }
}

type SnapshotReply = Sender<Result<(Resolution, Vec<u8>), StageError>>;

enum HostCommand {
    SetMode { item: i32, option: i32 },
    Resize(Resolution),
    Snapshot(SnapshotReply),
    Stop,
}

/// What the render thread did before it exited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSummary {
    pub frames_rendered: u64,
    pub frames_latched: u64,
    /// Most recent completed frame-rate window
    pub last_fps: Option<u32>,
}

pub struct HeadlessHost {
    commands: Sender<HostCommand>,
    frames_rendered: Arc<AtomicU64>,
    thread: Option<JoinHandle<HostSummary>>,
}

impl HeadlessHost {
    /// Spawn the render thread and bring the pipeline to `Active`
    ///
    /// Returns once the pipeline is running, or with the startup error.
    pub fn start(config: Config, gpu: GpuContext) -> PipelineResult<Self> {
        config.validate()?;
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&frames_rendered);

        let thread = thread::Builder::new()
            .name("hdr-render".into())
            .spawn(move || render_thread(config, gpu, command_rx, ready_tx, counter))
            .map_err(|e| PipelineError::InvalidState(format!("Failed to spawn render thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands: command_tx,
                frames_rendered,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PipelineError::InvalidState(
                    "render thread exited during startup".into(),
                ))
            }
        }
    }

    /// Forward a configuration command; applied before the next pass
    pub fn set_mode(&self, item: i32, option: i32) {
        self.send(HostCommand::SetMode { item, option });
    }

    pub fn set_hdr(&self, enabled: bool) {
        use crate::constants::commands;
        let option = if enabled {
            commands::OPTION_ON
        } else {
            commands::OPTION_OFF
        };
        self.set_mode(commands::ITEM_HDR, option);
    }

    /// Report a new display size
    pub fn resize(&self, display: Resolution) {
        self.send(HostCommand::Resize(display));
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Read back the last composited frame (top row first)
    pub fn snapshot(&self) -> PipelineResult<(Resolution, Vec<u8>)> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(HostCommand::Snapshot(reply_tx));
        match reply_rx.recv() {
            Ok(Ok(image)) => Ok(image),
            Ok(Err(e)) => Err(PipelineError::Gpu(e.to_string())),
            Err(_) => Err(PipelineError::InvalidState("render thread has exited".into())),
        }
    }

    /// Destroy the pipeline and join the render thread
    pub fn stop(mut self) -> HostSummary {
        self.shutdown()
    }

    fn send(&self, command: HostCommand) {
        if self.commands.send(command).is_err() {
            warn!("Render thread has exited, command dropped");
        }
    }

    fn shutdown(&mut self) -> HostSummary {
        let _ = self.commands.send(HostCommand::Stop);
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(summary)) => summary,
            Some(Err(e)) => {
                warn!("Render thread panicked: {:?}", e);
                HostSummary::default()
            }
            None => HostSummary::default(),
        }
    }
}

impl Drop for HeadlessHost {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}

fn render_thread(
    config: Config,
    gpu: GpuContext,
    commands: Receiver<HostCommand>,
    ready: Sender<PipelineResult<()>>,
    frames_rendered: Arc<AtomicU64>,
) -> HostSummary {
    let (redraw, redraw_rx) = RedrawSignal::channel();
    let backend = GpuBackend::headless(gpu, &config);
    let mut pipeline = FramePipeline::new(backend, Arc::new(redraw), PipelineSettings::from(&config));

    if let Err(e) = pipeline.on_surface_created() {
        let _ = ready.send(Err(e));
        return HostSummary::default();
    }
    pipeline.on_surface_changed(config.display_resolution);
    let _ = ready.send(Ok(()));

    let mut summary = HostSummary::default();
    'render: loop {
        // Commands are applied between passes, never during one
        loop {
            match commands.try_recv() {
                Ok(HostCommand::SetMode { item, option }) => pipeline.set_mode(item, option),
                Ok(HostCommand::Resize(display)) => pipeline.on_surface_changed(display),
                Ok(HostCommand::Snapshot(reply)) => {
                    let image = pipeline
                        .stages()
                        .ok_or(StageError::Released)
                        .and_then(|stages| stages.snapshot());
                    let _ = reply.send(image);
                }
                Ok(HostCommand::Stop) | Err(mpsc::TryRecvError::Disconnected) => break 'render,
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        match redraw_rx.recv_timeout(IDLE_POLL_INTERVAL) {
            Ok(()) => {
                if let Some(report) = pipeline.render_frame() {
                    summary.frames_rendered += 1;
                    frames_rendered.fetch_add(1, Ordering::Relaxed);
                    if report.fps.is_some() {
                        summary.last_fps = report.fps;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    summary.frames_latched = pipeline.stages().map_or(0, |stages| stages.frames_latched());
    pipeline.destroy();
    info!(
        frames = summary.frames_rendered,
        latched = summary.frames_latched,
        "Render thread finished"
    );
    summary
}

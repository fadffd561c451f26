// SPDX-License-Identifier: GPL-3.0-only

//! State shared by the built-in capture devices
//!
//! Tracks configuration, the attached stream texture and the producer
//! thread. Concrete devices only supply the frame generator.

use super::frame_loop::{CaptureLoopController, LoopAction, frame_period};
use super::stream::StreamTexture;
use super::types::{CameraFrame, Resolution};
use crate::errors::CameraError;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub(crate) struct DeviceCore {
    name: String,
    frame_rate: u32,
    /// Size of produced frames; read by the producer thread every tick
    frame_size: Arc<Mutex<Resolution>>,
    configured: bool,
    stream: Option<Arc<StreamTexture>>,
    capture: Option<CaptureLoopController>,
    released: bool,
}

impl DeviceCore {
    pub fn new(name: impl Into<String>, frame_rate: u32) -> Self {
        Self {
            name: name.into(),
            frame_rate,
            frame_size: Arc::new(Mutex::new(Resolution::default())),
            configured: false,
            stream: None,
            capture: None,
            released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ensure_live(&self) -> Result<(), CameraError> {
        if self.released {
            Err(CameraError::Released)
        } else {
            Ok(())
        }
    }

    pub fn configure(&mut self, resolution: Resolution) -> Result<Resolution, CameraError> {
        self.ensure_live()?;
        if resolution.is_empty() {
            return Err(CameraError::InvalidFormat(format!(
                "capture resolution {} has a zero dimension",
                resolution
            )));
        }
        *self.frame_size.lock().unwrap_or_else(|e| e.into_inner()) = resolution;
        self.configured = true;
        info!(camera = %self.name, %resolution, "Capture resolution configured");
        Ok(resolution)
    }

    pub fn frame_size(&self) -> Option<Resolution> {
        self.configured
            .then(|| *self.frame_size.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn set_frame_size(&mut self, size: Resolution) -> Result<(), CameraError> {
        self.ensure_live()?;
        if size.is_empty() {
            return Err(CameraError::InvalidFormat(format!(
                "preview size {} has a zero dimension",
                size
            )));
        }
        *self.frame_size.lock().unwrap_or_else(|e| e.into_inner()) = size;
        self.configured = true;
        debug!(camera = %self.name, %size, "Preview size changed");
        Ok(())
    }

    pub fn attach(&mut self, stream: Arc<StreamTexture>) -> Result<(), CameraError> {
        self.ensure_live()?;
        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_running())
    }

    /// Spawn the producer thread; `generate` builds one frame per tick
    pub fn start<G>(&mut self, mut generate: G) -> Result<(), CameraError>
    where
        G: FnMut(Resolution, u64) -> CameraFrame + Send + 'static,
    {
        self.ensure_live()?;
        if self.capture.is_some() {
            return Ok(());
        }
        if !self.configured {
            return Err(CameraError::StartFailed(
                "capture resolution not configured".into(),
            ));
        }
        let stream = self.stream.clone().ok_or(CameraError::NotAttached)?;
        let frame_size = Arc::clone(&self.frame_size);
        let mut sequence = 0u64;

        let controller = CaptureLoopController::start(
            &format!("{}-capture", self.name),
            frame_period(self.frame_rate),
            move || {
                let size = *frame_size.lock().unwrap_or_else(|e| e.into_inner());
                stream.publish(generate(size, sequence));
                sequence += 1;
                LoopAction::Continue
            },
        )
        .map_err(CameraError::StartFailed)?;

        self.capture = Some(controller);
        info!(camera = %self.name, frame_rate = self.frame_rate, "Capture started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
            info!(camera = %self.name, "Capture stopped");
        }
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.stop();
        self.stream = None;
        self.released = true;
        info!(camera = %self.name, "Camera released");
    }
}

impl Drop for DeviceCore {
    fn drop(&mut self) {
        self.stop();
    }
}

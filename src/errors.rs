// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the frame pipeline
//!
//! Errors fall into two families:
//! - [`PipelineError`] - fatal, returned from lifecycle transitions and startup
//! - [`StageError`] - per-frame, absorbed and logged at the stage boundary

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline error (aborts the transition that produced it)
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Capture device errors
    Camera(CameraError),
    /// GPU resource allocation failed
    ResourceAllocation(String),
    /// Compute engine could not be initialised
    Engine(EngineError),
    /// GPU device or surface could not be created
    Gpu(String),
    /// Invalid or unreadable configuration
    Config(String),
    /// Storage/filesystem errors
    Io(String),
    /// Lifecycle operation issued in the wrong state
    InvalidState(String),
}

/// Capture device errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Camera source could not be found or opened
    NotFound(String),
    /// Device refused the requested configuration
    InvalidFormat(String),
    /// Device failed to start streaming
    StartFailed(String),
    /// Operation requires an attached stream texture
    NotAttached,
    /// Device has already been released
    Released,
}

/// Compute engine errors
#[derive(Debug, Clone)]
pub enum EngineError {
    /// `init` failed
    InitFailed(String),
    /// `process` called before `init` or after `shutdown`
    NotInitialized,
    /// Per-frame processing failed
    ProcessFailed(String),
}

/// Recoverable per-frame error raised by a render stage
#[derive(Debug, Clone)]
pub enum StageError {
    /// Offscreen framebuffer cannot be rendered to this frame
    FramebufferIncomplete(String),
    /// Latching the newest camera image into the external texture failed
    TextureUpdate(String),
    /// Compute engine failed while processing the frame
    Engine(EngineError),
    /// Display surface could not provide a frame
    Surface(String),
    /// Stage ran after its resources were released
    Released,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Camera(e) => write!(f, "Camera error: {}", e),
            PipelineError::ResourceAllocation(msg) => {
                write!(f, "GPU resource allocation failed: {}", msg)
            }
            PipelineError::Engine(e) => write!(f, "Compute engine error: {}", e),
            PipelineError::Gpu(msg) => write!(f, "GPU error: {}", msg),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::Io(msg) => write!(f, "I/O error: {}", msg),
            PipelineError::InvalidState(msg) => write!(f, "Invalid pipeline state: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NotFound(msg) => write!(f, "Camera not found: {}", msg),
            CameraError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            CameraError::StartFailed(msg) => write!(f, "Failed to start capture: {}", msg),
            CameraError::NotAttached => write!(f, "No stream texture attached"),
            CameraError::Released => write!(f, "Camera already released"),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InitFailed(msg) => write!(f, "Initialization failed: {}", msg),
            EngineError::NotInitialized => write!(f, "Engine not initialized"),
            EngineError::ProcessFailed(msg) => write!(f, "Processing failed: {}", msg),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::FramebufferIncomplete(msg) => write!(f, "Framebuffer incomplete: {}", msg),
            StageError::TextureUpdate(msg) => write!(f, "Texture image update failed: {}", msg),
            StageError::Engine(e) => write!(f, "Engine error: {}", e),
            StageError::Surface(msg) => write!(f, "Surface error: {}", msg),
            StageError::Released => write!(f, "Stage resources already released"),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for CameraError {}
impl std::error::Error for EngineError {}
impl std::error::Error for StageError {}

impl From<CameraError> for PipelineError {
    fn from(err: CameraError) -> Self {
        PipelineError::Camera(err)
    }
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        PipelineError::Engine(err)
    }
}

impl From<EngineError> for StageError {
    fn from(err: EngineError) -> Self {
        StageError::Engine(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_wraps_into_pipeline_error() {
        let err: PipelineError = CameraError::NotFound("/dev/video9".into()).into();
        assert!(matches!(err, PipelineError::Camera(CameraError::NotFound(_))));
        assert_eq!(err.to_string(), "Camera error: Camera not found: /dev/video9");
    }

    #[test]
    fn test_engine_error_maps_to_both_families() {
        let fatal: PipelineError = EngineError::InitFailed("no adapter".into()).into();
        let per_frame: StageError = EngineError::NotInitialized.into();
        assert!(fatal.to_string().contains("no adapter"));
        assert_eq!(per_frame.to_string(), "Engine error: Engine not initialized");
    }

    #[test]
    fn test_json_error_is_config_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(PipelineError::from(json_err), PipelineError::Config(_)));
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! The frame pipeline never talks to capture hardware directly. It drives a
//! [`camera::CaptureDevice`] through its lifecycle and receives frames through
//! the [`camera::StreamTexture`] the device publishes into.

pub mod camera;

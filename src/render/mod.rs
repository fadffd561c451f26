// SPDX-License-Identifier: GPL-3.0-only

//! GPU side of the frame pipeline
//!
//! ```text
//! StreamTexture ──latch──► external ──capture pass──► raw (+mips) ──engine──► processed
//!                                                      │                        │
//!                                                      └──── composite pass ◄───┘
//!                                                                 │
//!                                                                 ▼
//!                                                          DisplayTarget
//! ```

pub mod backend;
pub mod display;
pub mod mipmap;
pub mod quad;
pub mod stages;
pub mod textures;

pub use backend::{GpuBackend, SurfaceTarget};
pub use display::DisplayTarget;
pub use stages::GpuStages;
pub use textures::TextureSet;

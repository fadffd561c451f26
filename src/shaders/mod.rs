// SPDX-License-Identifier: GPL-3.0-only

//! Shader sources and shared GPU helpers
//!
//! WGSL lives next to this module and is embedded at compile time, so the
//! binary carries no loose shader files.

pub mod gpu_processor;

pub use gpu_processor::{CachedDimensions, compute_dispatch_size, read_buffer_async};

/// Full-screen textured quad (capture and composite passes)
pub const QUAD_SHADER: &str = include_str!("quad.wgsl");

/// Mip chain downsample blit
pub const MIPMAP_SHADER: &str = include_str!("mipmap.wgsl");

/// Global Reinhard tone mapping compute shader
pub const REINHARD_GLOBAL_SHADER: &str = include_str!("reinhard_global.wgsl");

/// Create a shader module from embedded WGSL
pub fn create_shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validate that a WGSL shader compiles successfully using naga
    fn validate_shader(name: &str, source: &str) -> naga::Module {
        let result = naga::front::wgsl::parse_str(source);
        match result {
            Ok(module) => {
                let info = naga::valid::Validator::new(
                    naga::valid::ValidationFlags::all(),
                    naga::valid::Capabilities::all(),
                )
                .validate(&module);

                if let Err(e) = info {
                    panic!("Shader '{}' validation failed: {:?}", name, e);
                }
                module
            }
            Err(e) => {
                panic!("Shader '{}' parse failed: {:?}", name, e);
            }
        }
    }

    fn entry_points(module: &naga::Module) -> Vec<&str> {
        let mut names: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_quad_shader_validates() {
        let module = validate_shader("quad", QUAD_SHADER);
        assert_eq!(entry_points(&module), vec!["fs_main", "vs_main"]);
    }

    #[test]
    fn test_mipmap_shader_validates() {
        let module = validate_shader("mipmap", MIPMAP_SHADER);
        assert_eq!(entry_points(&module), vec!["fs_main", "vs_main"]);
    }

    #[test]
    fn test_reinhard_shader_validates() {
        let module = validate_shader("reinhard_global", REINHARD_GLOBAL_SHADER);
        assert_eq!(
            entry_points(&module),
            vec!["compute_log_avg_lum", "final_reduce", "tone_map"]
        );
    }
}

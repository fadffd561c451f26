// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use hdr_camera::backends::camera::Resolution;
use hdr_camera::config::{CameraSource, Config, EngineConfig};
use hdr_camera::errors::PipelineError;
use std::path::PathBuf;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.camera_resolution, Resolution::new(1280, 720));
    assert_eq!(config.recompute_interval_secs, 0.5);
    assert!(!config.process_hdr, "HDR should start disabled");
    assert_eq!(config.camera, CameraSource::Synthetic);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_partial_json_uses_defaults() {
    let config = Config::from_json(r#"{ "process_hdr": true }"#).unwrap();

    assert!(config.process_hdr);
    assert_eq!(config.camera_resolution, Config::default().camera_resolution);
    assert_eq!(config.engine, EngineConfig::default());
}

#[test]
fn test_config_tagged_sources() {
    let json = r#"{
        "camera": { "kind": "image_file", "path": "/tmp/scene.png" },
        "engine": { "kind": "reinhard_global", "key": 0.36 },
        "camera_resolution": { "width": 640, "height": 480 }
    }"#;
    let config = Config::from_json(json).unwrap();

    assert_eq!(
        config.camera,
        CameraSource::ImageFile {
            path: PathBuf::from("/tmp/scene.png")
        }
    );
    match config.engine {
        EngineConfig::ReinhardGlobal { key, saturation } => {
            assert_eq!(key, 0.36);
            assert_eq!(saturation, 1.1, "Missing saturation falls back to default");
        }
        other => panic!("unexpected engine {:?}", other),
    }
    assert_eq!(config.camera_resolution, Resolution::new(640, 480));
}

#[test]
fn test_config_passthrough_engine() {
    let config = Config::from_json(r#"{ "engine": { "kind": "passthrough" } }"#).unwrap();
    assert_eq!(config.engine, EngineConfig::Passthrough);
}

#[test]
fn test_config_json_roundtrip() {
    let config = Config {
        process_hdr: true,
        recompute_interval_secs: 1.5,
        ..Config::default()
    };
    let text = config.to_json_pretty().unwrap();
    assert_eq!(Config::from_json(&text).unwrap(), config);
}

#[test]
fn test_config_rejects_bad_values() {
    let zero_camera = Config {
        camera_resolution: Resolution::new(0, 720),
        ..Config::default()
    };
    assert!(matches!(zero_camera.validate(), Err(PipelineError::Config(_))));

    let negative_interval = Config {
        recompute_interval_secs: -1.0,
        ..Config::default()
    };
    assert!(negative_interval.validate().is_err());

    let nan_interval = Config {
        recompute_interval_secs: f32::NAN,
        ..Config::default()
    };
    assert!(nan_interval.validate().is_err());

    let bad_key = Config {
        engine: EngineConfig::ReinhardGlobal {
            key: 0.0,
            saturation: 1.0,
        },
        ..Config::default()
    };
    assert!(bad_key.validate().is_err());

    let no_frames = Config {
        frame_rate: 0,
        ..Config::default()
    };
    assert!(no_frames.validate().is_err());
}

#[test]
fn test_config_zero_interval_is_valid() {
    // Zero means "recompute every frame"
    let config = Config {
        recompute_interval_secs: 0.0,
        ..Config::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_large_interval_builds_throttle() {
    use hdr_camera::pipeline::RecomputeThrottle;

    let config = Config::from_json(r#"{ "recompute_interval_secs": 1e30 }"#).unwrap();
    assert!(config.validate().is_ok());
    let throttle = RecomputeThrottle::from_secs_f32(config.recompute_interval_secs);
    assert_eq!(throttle.interval(), std::time::Duration::MAX);
}

#[test]
fn test_config_malformed_json() {
    assert!(Config::from_json("{ not json").is_err());
    assert!(Config::from_json(r#"{ "camera": { "kind": "webcam" } }"#).is_err());
}

#[test]
fn test_config_load_missing_explicit_file() {
    let path = std::env::temp_dir().join("hdr-camera-does-not-exist.json");
    let result = Config::load(Some(&path));
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn test_config_load_from_file() {
    let path = std::env::temp_dir().join(format!("hdr-camera-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "frame_rate": 15, "process_hdr": true }"#).unwrap();

    let config = Config::load(Some(&path)).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.frame_rate, 15);
    assert!(config.process_hdr);
}

#[test]
fn test_config_default_path_location() {
    if let Some(path) = Config::default_path() {
        assert!(path.ends_with("hdr-camera/config.json"));
    }
}

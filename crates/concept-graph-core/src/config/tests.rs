use std::io::Write;

use super::*;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    config.validate().expect("default config must validate");
    assert_eq!(config.server.port, 7420);
    assert_eq!(config.index.dimension, 384);
    assert_eq!(config.cache.overlap_threshold, 0.0);
    assert!(config.storage.sync_every_write);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config: Config = toml::from_str(
        r#"
        [server]
        port = 9100

        [index]
        dimension = 8
        "#,
    )
    .expect("parse failed");

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.bind_address, "127.0.0.1");
    assert_eq!(config.index.dimension, 8);
    assert_eq!(config.index.m, 16);
    assert_eq!(config.reasoning.default_max_depth, 4);
}

#[test]
fn test_from_file_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.toml");
    let mut file = std::fs::File::create(&path).expect("create");
    writeln!(file, "[storage]\ndata_dir = \"/var/lib/graph\"\nsync_every_write = false")
        .expect("write");

    let config = Config::from_file(&path).expect("load");
    assert_eq!(config.storage.data_dir, "/var/lib/graph");
    assert!(!config.storage.sync_every_write);
}

#[test]
fn test_from_file_missing_file() {
    let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_zero_dimension_rejected() {
    let mut config = Config::default();
    config.index.dimension = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("index.dimension"));
}

#[test]
fn test_zero_frame_size_rejected() {
    let mut config = Config::default();
    config.server.max_frame_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_overlap_threshold_range() {
    let mut config = Config::default();
    config.cache.overlap_threshold = 1.5;
    assert!(config.validate().is_err());
    config.cache.overlap_threshold = 0.5;
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_depth_above_limit_rejected() {
    let mut config = Config::default();
    config.reasoning.default_max_depth = 40;
    assert!(config.validate().is_err());
}

#[test]
fn test_socket_addr() {
    let server = ServerConfig::default();
    assert_eq!(server.socket_addr(), "127.0.0.1:7420");
}

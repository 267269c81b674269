//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use sgpipeline_rs::{ProcessingModule, Scene};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// The crate's own batch worker binary
pub fn worker_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sgpipeline-rs"))
}

/// Poll interval used by tests that supervise a worker
pub fn test_poll_interval() -> Duration {
    Duration::from_millis(1)
}

/// Engine whose work directory lives below `root`
pub fn test_module(root: &TempDir) -> ProcessingModule {
    let mut module = ProcessingModule::new();
    module.set_work_directory_root(Some(root.path().join("work")));
    module.set_external_batch_path(Some(worker_binary()));
    module.set_poll_interval(test_poll_interval());
    module
}

/// Write `scene` to `dir/name` and return the path
pub fn write_scene(dir: &Path, name: &str, scene: &Scene) -> PathBuf {
    let path = dir.join(name);
    scene.save_to_file(&path).expect("write test scene");
    path
}

/// Write a texture file with some content and return its path
pub fn write_texture(dir: &Path, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create texture dir");
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).expect("write texture");
    path
}

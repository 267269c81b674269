//! Integration tests for out-of-process execution
//!
//! These tests drive the crate's own batch worker binary through the
//! engine, covering staging, progress streaming, worker errors and output
//! recovery.

mod common;

use common::builders::two_child_tree;
use common::mock_helpers::{recording_error_handler, recording_observer};
use common::{test_module, worker_binary, write_scene, write_texture};
use sgpipeline_rs::processing::{MessageParser, PipeMessage};
use sgpipeline_rs::{
    BatchType, ErrorKind, PipelineConfig, PipelineKind, PipelineSerializer, RunMode, Scene,
};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn write_pipeline(dir: &Path, name: &str, kind: PipelineKind) -> PathBuf {
    let path = dir.join(name);
    PipelineSerializer::new()
        .save(&PipelineConfig::new(kind), &path)
        .unwrap();
    path
}

// ============================================================================
// Pipe Protocol
// ============================================================================

#[test]
fn test_progress_lines_delivered_in_order() {
    let mut parser = MessageParser::new();
    assert_eq!(
        parser.feed(b"10\r\n55\r\n90\r\n"),
        vec![
            PipeMessage::Progress(10),
            PipeMessage::Progress(55),
            PipeMessage::Progress(90)
        ]
    );

    let mut parser = MessageParser::new();
    assert_eq!(
        parser.feed(b"30\r\nsomething went wrong\r\n"),
        vec![
            PipeMessage::Progress(30),
            PipeMessage::Error("something went wrong".to_string())
        ]
    );
}

#[test]
fn test_worker_binary_speaks_the_protocol() {
    let dir = TempDir::new().unwrap();
    let pipeline = write_pipeline(dir.path(), "p.json", PipelineKind::Reduction);
    let input = write_scene(dir.path(), "in.sb", &Scene::new("input"));
    let output = dir.path().join("out.sb");

    let result = Command::new(worker_binary())
        .arg("-Progress")
        .arg(&pipeline)
        .arg(&input)
        .arg(&output)
        .output()
        .unwrap();
    assert!(result.status.success());

    let mut parser = MessageParser::new();
    let mut messages = parser.feed(&result.stdout);
    messages.extend(parser.finish());
    assert_eq!(
        messages,
        vec![PipeMessage::Progress(0), PipeMessage::Progress(100)]
    );
    assert!(output.is_file());
}

#[test]
fn test_worker_binary_reports_errors_on_stdout() {
    let dir = TempDir::new().unwrap();
    let result = Command::new(worker_binary())
        .arg("-Progress")
        .arg(dir.path().join("missing.json"))
        .arg(dir.path().join("in.sb"))
        .arg(dir.path().join("out.sb"))
        .output()
        .unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.starts_with("Error: "));
    assert!(stdout.ends_with("\r\n"));
}

// ============================================================================
// Engine Runs
// ============================================================================

#[test]
fn test_run_pipeline_in_new_process() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    let observer = recording_observer();
    module.set_progress_observer(Some(observer.clone()));

    let pipeline = two_child_tree(false);
    let scenes = module
        .run_pipeline(&Scene::new("input"), &pipeline, RunMode::InNewProcess)
        .unwrap();

    let indices: Vec<usize> = scenes.iter().map(|s| s.lod_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(scenes[2].scene.payload["passes"][1]["class"], "IAggregationPipeline");

    // The worker saw the overridden texture paths.
    let pass = &scenes[1].scene.payload["passes"][1];
    assert!(pass["texture_output_path"].as_str().unwrap().ends_with("LOD2"));

    assert_eq!(*observer.reports.borrow(), vec![0.0, 33.0, 66.0, 100.0]);
}

#[test]
fn test_run_pipeline_on_file_in_new_process() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    let texture = write_texture(&dir.path().join("assets"), "leaf.png");
    let input = write_scene(
        dir.path(),
        "bush.sb",
        &Scene::new("bush").with_texture("leaf", texture.to_string_lossy()),
    );
    let output = dir.path().join("out").join("bush.sb");

    let written = module
        .run_pipeline_on_file(&input, &output, &two_child_tree(true), RunMode::InNewProcess)
        .unwrap();

    assert_eq!(
        written,
        vec![
            dir.path().join("out").join("bush_LOD2.sb"),
            dir.path().join("out").join("bush_LOD3.sb"),
        ]
    );
    // Source assets outside the engine's scratch space are never moved.
    assert!(texture.is_file());
    assert!(dir
        .path()
        .join("out")
        .join("Textures")
        .join("LOD3")
        .join("leaf.png")
        .is_file());
}

#[test]
fn test_run_batch_external() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    let pipeline = write_pipeline(dir.path(), "remesh.json", PipelineKind::Remeshing);

    let processed = module
        .run_batch(&Scene::new("rock"), &pipeline, BatchType::External)
        .unwrap();
    assert_eq!(processed.name, "rock");
    assert_eq!(processed.payload["passes"][0]["class"], "IRemeshingPipeline");
}

#[test]
fn test_run_batch_on_file_external() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    let pipeline = write_pipeline(dir.path(), "p.json", PipelineKind::Reduction);
    let texture = write_texture(&dir.path().join("assets"), "stone.png");
    let input = write_scene(
        dir.path(),
        "wall.sb",
        &Scene::new("wall").with_texture("stone", texture.to_string_lossy()),
    );
    let output = dir.path().join("export").join("deep").join("wall.sb");

    let result = module
        .run_batch_on_file(&input, &output, &pipeline, BatchType::External)
        .unwrap();
    assert_eq!(result, output);

    let relocated = dir.path().join("export").join("deep").join("Textures").join("stone.png");
    let scene = Scene::load_from_file(&output).unwrap();
    assert_eq!(
        PathBuf::from(&scene.texture_table.get(0).unwrap().file_path),
        relocated
    );
    assert!(texture.is_file());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_worker_is_process_failure_without_output() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    module.set_external_batch_path(Some(dir.path().join("no-such-worker")));

    let pipeline = write_pipeline(dir.path(), "p.json", PipelineKind::Reduction);
    let input = write_scene(dir.path(), "in.sb", &Scene::new("input"));
    let output = dir.path().join("out.sb");

    let err = module
        .run_pipeline_externally_from_file(&pipeline, &input, &output)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProcessFailure);
    assert!(!output.exists());
}

#[test]
fn test_worker_error_without_handler_fails_run() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    let input = write_scene(dir.path(), "in.sb", &Scene::new("input"));
    let bogus_pipeline = dir.path().join("bogus.json");
    std::fs::write(&bogus_pipeline, r#"{"version":1,"pipeline":{"class":"INopePipeline"}}"#)
        .unwrap();

    // The engine rejects the file itself before any worker starts.
    let err = module
        .run_pipeline_externally_from_file(&bogus_pipeline, &input, &dir.path().join("out.sb"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

    // A worker that cannot read its input reports an error line.
    let pipeline = write_pipeline(dir.path(), "p.json", PipelineKind::Reduction);
    let err = module
        .run_pipeline_externally_from_file(
            &pipeline,
            &dir.path().join("missing.sb"),
            &dir.path().join("out.sb"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProcessFailure);
    assert!(err.to_string().contains("Error: "));
}

#[test]
fn test_worker_error_with_handler_reports_exit_code() {
    let dir = TempDir::new().unwrap();
    let mut module = test_module(&dir);
    let handler = recording_error_handler();
    module.set_error_handler(Some(handler.clone()));

    let pipeline = write_pipeline(dir.path(), "p.json", PipelineKind::Reduction);
    let err = module
        .run_pipeline_externally_from_file(
            &pipeline,
            &dir.path().join("missing.sb"),
            &dir.path().join("out.sb"),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProcessFailure);
    assert!(err.to_string().contains("FailedToRunPipeline"));

    let errors = handler.errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error: Could not load the input scene"));
}

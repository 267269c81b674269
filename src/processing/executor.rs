//! In-process pipeline execution.
//!
//! [`PipelineExecutor`] is the seam between the batch engine and whatever
//! actually optimizes scenes. The engine only relies on the contract:
//! after a successful run every node of the cascade tree holds its
//! processed scene, and progress is reported to the observers attached to
//! the root pipeline.

use crate::error::{Result, SgError};
use crate::pipeline::{preorder, PipelineKind, SharedPipeline};
use crate::scene::Scene;
use std::path::Path;
use tracing::debug;

pub trait PipelineExecutor {
    /// Run the cascade tree rooted at `pipeline` on `scene`.
    fn run_scene(&self, pipeline: &SharedPipeline, scene: &Scene) -> Result<()>;

    /// Run on a scene file. When `output` is given, the root node's
    /// processed scene is also written there.
    fn run_scene_from_file(
        &self,
        pipeline: &SharedPipeline,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<()> {
        let scene = Scene::load_from_file(input)?;
        self.run_scene(pipeline, &scene)?;

        if let Some(output) = output {
            let root = pipeline.borrow();
            let processed = root.processed_scene().ok_or_else(|| {
                SgError::ProcessFailure(
                    "Could not process the given scene, the output scene is null.".to_string(),
                )
            })?;
            processed.save_to_file(output)?;
        }
        Ok(())
    }
}

/// Built-in executor.
///
/// Each node receives its parent's output (the root receives the input
/// scene) and records the pass it applied in the scene payload under
/// `"passes"`. `Passthrough` nodes forward their input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }

    fn apply(&self, node: &SharedPipeline, input: &Scene) -> Scene {
        let node = node.borrow();
        if node.kind() == PipelineKind::Passthrough {
            return input.clone();
        }

        let mut output = input.clone();
        let pass = serde_json::json!({
            "class": node.class_name(),
            "material_casters": node.material_casters().len(),
            "texture_output_path": node.texture_output_path(),
        });

        match output.payload.as_object_mut() {
            Some(object) => {
                let passes = object
                    .entry("passes")
                    .or_insert_with(|| serde_json::Value::Array(Vec::new()));
                match passes.as_array_mut() {
                    Some(list) => list.push(pass),
                    None => *passes = serde_json::Value::Array(vec![pass]),
                }
            }
            None => {
                let original = std::mem::take(&mut output.payload);
                output.payload = serde_json::json!({ "source": original, "passes": [pass] });
            }
        }
        output
    }
}

impl PipelineExecutor for LocalExecutor {
    fn run_scene(&self, pipeline: &SharedPipeline, scene: &Scene) -> Result<()> {
        let nodes = preorder(pipeline);
        for node in &nodes {
            node.borrow_mut().set_processed_scene(None);
        }

        let total = nodes.len();
        let mut completed = 0usize;
        let report = |done: usize| -> Result<()> {
            let percent = done as f64 * 100.0 / total as f64;
            if pipeline.borrow().notify_progress(percent) {
                Ok(())
            } else {
                Err(SgError::ProcessFailure(
                    "Processing was cancelled by a progress observer.".to_string(),
                ))
            }
        };

        report(0)?;

        // Explicit stack keeps pre-order without recursion: (node, input).
        let mut stack = vec![(pipeline.clone(), scene.clone())];
        while let Some((node, input)) = stack.pop() {
            let output = self.apply(&node, &input);
            debug!(
                "Processed {} node ({} children)",
                node.borrow().kind(),
                node.borrow().cascaded_pipeline_count()
            );

            let children = node.borrow().cascaded_pipelines().to_vec();
            for child in children.into_iter().rev() {
                stack.push((child, output.clone()));
            }
            node.borrow_mut().set_processed_scene(Some(output));

            completed += 1;
            report(completed)?;
        }

        Ok(())
    }
}

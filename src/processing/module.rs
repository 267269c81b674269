//! The batch execution engine.
//!
//! [`ProcessingModule`] runs one pipeline tree against one scene, either
//! through its [`PipelineExecutor`] on the calling thread or by staging the
//! scene and pipeline in its work directory and supervising a batch worker
//! process. Every entry point follows the same job lifecycle:
//!
//! ```text
//! Configured -> ParametersOverridden -> Running -> Succeeded | Failed
//!                                                   Succeeded -> OutputsReconciled
//! ```

use super::executor::{LocalExecutor, PipelineExecutor};
use super::handler::ErrorHandler;
use super::job::{BatchJob, BatchType, JobState, ProcessedScene, RunMode};
use super::output::{
    clear_worker_outputs, collect_processed_scenes, export_scenes_to_file, load_worker_outputs,
    TextureRelocator, TransferMode, TEXTURES_DIR,
};
use super::overrides::override_pipeline_parameters;
use super::process::{ExternalProcess, WorkerCommand};
use super::protocol::PipeMessage;
use crate::config::{default_batch_path, EngineConfig, WorkDirectory};
use crate::error::{Result, ResultExt, SgError};
use crate::pipeline::{PipelineSerializer, ProgressObserver, SharedPipeline};
use crate::scene::Scene;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Staged input scene inside the work directory
pub const INPUT_SCENE_FILE: &str = "sgInputScene.sb";
/// Staged output scene inside the work directory
pub const OUTPUT_SCENE_FILE: &str = "sgOutputScene.sb";
/// Staged pipeline definition inside the work directory
pub const PIPELINE_FILE: &str = "sgPipeline.json";

/// Files used by one staged run.
struct StagedFiles {
    input: PathBuf,
    output: PathBuf,
    pipeline: PathBuf,
    scratch: Vec<PathBuf>,
}

pub struct ProcessingModule {
    executor: Box<dyn PipelineExecutor>,
    serializer: PipelineSerializer,
    progress_observer: Option<Rc<dyn ProgressObserver>>,
    error_handler: Option<Rc<dyn ErrorHandler>>,
    texture_output_directory: Option<PathBuf>,
    work_root: Option<PathBuf>,
    work: Option<WorkDirectory>,
    external_batch_path: Option<PathBuf>,
    poll_interval: Duration,
    run_mode: RunMode,
}

impl Default for ProcessingModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingModule {
    pub fn new() -> Self {
        Self::with_executor(Box::new(LocalExecutor::new()))
    }

    /// Engine running in-process jobs through `executor`.
    pub fn with_executor(executor: Box<dyn PipelineExecutor>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            executor,
            serializer: PipelineSerializer::new(),
            progress_observer: None,
            error_handler: None,
            texture_output_directory: None,
            work_root: None,
            work: None,
            external_batch_path: None,
            poll_interval: defaults.poll_interval(),
            run_mode: defaults.run_mode,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut module = Self::new();
        module.work_root = config.work_directory.clone();
        module.texture_output_directory = config.texture_output_directory.clone();
        module.external_batch_path = config.external_batch_path.clone();
        module.poll_interval = config.poll_interval();
        module.run_mode = config.run_mode;
        module
    }

    // ==================== Settings ====================

    pub fn set_progress_observer(&mut self, observer: Option<Rc<dyn ProgressObserver>>) {
        self.progress_observer = observer;
    }

    pub fn set_error_handler(&mut self, handler: Option<Rc<dyn ErrorHandler>>) {
        self.error_handler = handler;
    }

    pub fn texture_output_directory(&self) -> Option<&Path> {
        self.texture_output_directory.as_deref()
    }

    /// Root for baked textures; the work directory's `BakedTextures` when unset.
    pub fn set_texture_output_directory(&mut self, dir: Option<PathBuf>) {
        if let Some(work) = self.work.as_mut() {
            work.set_texture_output_override(dir.clone());
        }
        self.texture_output_directory = dir;
    }

    pub fn work_directory(&self) -> Option<&Path> {
        self.work.as_ref().map(WorkDirectory::path)
    }

    /// Parent directory for the engine's work directory. Discards the
    /// current work directory and everything staged in it.
    pub fn set_work_directory_root(&mut self, root: Option<PathBuf>) {
        self.work = None;
        self.work_root = root;
    }

    pub fn external_batch_path(&self) -> Option<&Path> {
        self.external_batch_path.as_deref()
    }

    pub fn set_external_batch_path(&mut self, path: Option<PathBuf>) {
        self.external_batch_path = path;
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Run mode configured for callers that do not choose one.
    pub fn default_run_mode(&self) -> RunMode {
        self.run_mode
    }

    // ==================== Public Entry Points ====================

    /// Run `pipeline` on `scene` and return the processed scene of every
    /// non-intermediate node in pre-order.
    pub fn run_pipeline(
        &mut self,
        scene: &Scene,
        pipeline: &SharedPipeline,
        mode: RunMode,
    ) -> Result<Vec<ProcessedScene>> {
        self.run_pipeline_inner(scene, pipeline, mode)
            .context("Could not process the given scene")
    }

    /// Run `pipeline` on the scene file `input` and write every
    /// non-intermediate node's output next to `output`. Returns the paths
    /// written, in pre-order.
    pub fn run_pipeline_on_file(
        &mut self,
        input: &Path,
        output: &Path,
        pipeline: &SharedPipeline,
        mode: RunMode,
    ) -> Result<Vec<PathBuf>> {
        self.run_pipeline_on_file_inner(input, output, pipeline, mode)
            .with_context(|| format!("Could not process the given scene file {:?}", input))
    }

    /// Load a pipeline definition and run it in this process from `input`
    /// to `output`.
    pub fn run_pipeline_from_file(
        &mut self,
        pipeline_file: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        self.run_pipeline_from_file_inner(pipeline_file, input, output)
            .with_context(|| format!("Could not run the pipeline from file {:?}", pipeline_file))
    }

    /// Load a pipeline definition, write the overridden parameters back to
    /// the same file and run it in a batch worker from `input` to `output`.
    pub fn run_pipeline_externally_from_file(
        &mut self,
        pipeline_file: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        self.run_pipeline_externally_from_file_inner(pipeline_file, input, output)
            .with_context(|| {
                format!(
                    "Could not run the pipeline externally from file {:?}",
                    pipeline_file
                )
            })
    }

    /// Stage `scene` in the work directory, run the pipeline file on it and
    /// return the root's processed scene.
    pub fn run_batch(
        &mut self,
        scene: &Scene,
        pipeline_file: &Path,
        batch_type: BatchType,
    ) -> Result<Scene> {
        self.run_batch_inner(scene, pipeline_file, batch_type)
            .context("RunProcess - Could not process the given scene")
    }

    /// Run the pipeline file from `input` to `output` and move the output
    /// scene's textures into `<output dir>/Textures`.
    pub fn run_batch_on_file(
        &mut self,
        input: &Path,
        output: &Path,
        pipeline_file: &Path,
        batch_type: BatchType,
    ) -> Result<PathBuf> {
        self.run_batch_on_file_inner(input, output, pipeline_file, batch_type)
            .with_context(|| format!("RunProcess - Could not process the given file {:?}", input))
    }

    // ==================== Jobs ====================

    fn run_pipeline_inner(
        &mut self,
        scene: &Scene,
        pipeline: &SharedPipeline,
        mode: RunMode,
    ) -> Result<Vec<ProcessedScene>> {
        let mut job = BatchJob::new("run_pipeline", mode);
        info!("Processing scene '{}' ({:?})", scene.name, mode);

        let result = self.override_parameters(pipeline);
        job.track(result)?;
        job.advance(JobState::ParametersOverridden);

        job.advance(JobState::Running);
        let result = match mode {
            RunMode::InThisProcess => {
                self.run_in_process(pipeline, |executor| executor.run_scene(pipeline, scene))
            }
            RunMode::InNewProcess => self.run_scene_externally(pipeline, scene),
        };
        job.track(result)?;
        job.advance(JobState::Succeeded);

        let scenes = job.track(collect_processed_scenes(pipeline))?;
        job.advance(JobState::OutputsReconciled);
        info!("Processed scene '{}' into {} output(s)", scene.name, scenes.len());
        Ok(scenes)
    }

    fn run_pipeline_on_file_inner(
        &mut self,
        input: &Path,
        output: &Path,
        pipeline: &SharedPipeline,
        mode: RunMode,
    ) -> Result<Vec<PathBuf>> {
        let mut job = BatchJob::new("run_pipeline_on_file", mode);
        info!("Processing {:?} -> {:?} ({:?})", input, output, mode);

        let result = self.override_parameters(pipeline);
        job.track(result)?;
        job.advance(JobState::ParametersOverridden);

        job.advance(JobState::Running);
        let result = match mode {
            RunMode::InThisProcess => self
                .run_in_process(pipeline, |executor| {
                    executor.run_scene_from_file(pipeline, input, None)
                })
                .map(|()| TextureRelocator::new(TransferMode::Copy)),
            RunMode::InNewProcess => self.run_file_externally(pipeline, input),
        };
        let mut relocator = job.track(result)?;
        job.advance(JobState::Succeeded);

        let result = create_output_folder(output)
            .and_then(|()| export_scenes_to_file(pipeline, output, &mut relocator));
        let written = job.track(result)?;
        job.advance(JobState::OutputsReconciled);
        info!("Wrote {} scene file(s)", written.len());
        Ok(written)
    }

    fn run_pipeline_from_file_inner(
        &mut self,
        pipeline_file: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut job = BatchJob::new("run_pipeline_from_file", RunMode::InThisProcess);
        let pipeline = job.track(self.serializer.load(pipeline_file))?.into_shared();

        let result = self.override_parameters(&pipeline);
        job.track(result)?;
        job.advance(JobState::ParametersOverridden);

        job.advance(JobState::Running);
        let result = self.run_in_process(&pipeline, |executor| {
            executor.run_scene_from_file(&pipeline, input, Some(output))
        });
        job.track(result)?;
        job.advance(JobState::Succeeded);
        Ok(())
    }

    fn run_pipeline_externally_from_file_inner(
        &mut self,
        pipeline_file: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut job = BatchJob::new("run_pipeline_externally_from_file", RunMode::InNewProcess);
        let pipeline = job.track(self.serializer.load(pipeline_file))?.into_shared();

        let result = self
            .override_parameters(&pipeline)
            .and_then(|()| self.serializer.save(&pipeline.borrow(), pipeline_file));
        job.track(result)?;
        job.advance(JobState::ParametersOverridden);

        job.advance(JobState::Running);
        clear_worker_outputs(&pipeline, output);
        let result = self.resolve_batch_path().and_then(|executable| {
            self.run_external(&WorkerCommand {
                executable,
                pipeline_file: pipeline_file.to_path_buf(),
                input: input.to_path_buf(),
                output: output.to_path_buf(),
            })
        });
        job.track(result)?;

        if !output.is_file() {
            return job.track(Err(SgError::IoFailure(format!(
                "Could not find the processed scene file from the given file path - {}",
                output.display()
            ))));
        }
        job.advance(JobState::Succeeded);
        Ok(())
    }

    fn run_batch_inner(
        &mut self,
        scene: &Scene,
        pipeline_file: &Path,
        batch_type: BatchType,
    ) -> Result<Scene> {
        let staged = self.staged_files()?;
        scene.save_to_file(&staged.input)?;
        if staged.output.exists() {
            std::fs::remove_file(&staged.output)
                .context("RunProcess - Could not remove the previous output scene")?;
        }

        match batch_type {
            BatchType::Internal => {
                self.run_pipeline_from_file(pipeline_file, &staged.input, &staged.output)?
            }
            BatchType::External => {
                self.run_pipeline_externally_from_file(pipeline_file, &staged.input, &staged.output)?
            }
        }

        Scene::load_from_file(&staged.output)
    }

    fn run_batch_on_file_inner(
        &mut self,
        input: &Path,
        output: &Path,
        pipeline_file: &Path,
        batch_type: BatchType,
    ) -> Result<PathBuf> {
        create_output_folder(output)?;

        let mut relocator = match batch_type {
            BatchType::Internal => {
                self.run_pipeline_from_file(pipeline_file, input, output)?;
                TextureRelocator::new(TransferMode::Copy)
            }
            BatchType::External => {
                let staged = self.staged_files()?;
                if let Some(dir) = staged.input.parent() {
                    std::fs::create_dir_all(dir)
                        .context("RunProcess - Could not create the import folder")?;
                }
                std::fs::copy(input, &staged.input).with_context(|| {
                    format!(
                        "RunProcess - Could not stage the input scene {}",
                        input.display()
                    )
                })?;
                self.run_pipeline_externally_from_file(pipeline_file, &staged.input, output)?;
                staged
                    .scratch
                    .into_iter()
                    .fold(TextureRelocator::new(TransferMode::Move), |relocator, root| {
                        relocator.with_scratch_root(root)
                    })
            }
        };

        let texture_dir = output
            .parent()
            .map(|dir| dir.join(TEXTURES_DIR))
            .unwrap_or_else(|| PathBuf::from(TEXTURES_DIR));
        let mut scene = Scene::load_from_file(output)?;
        let relocated = relocator.relocate(&mut scene, &texture_dir)?;
        if relocated > 0 {
            scene.save_to_file(output)?;
        }
        debug!("Relocated {} texture(s) into {:?}", relocated, texture_dir);
        Ok(output.to_path_buf())
    }

    // ==================== Execution ====================

    /// Attach the module's observer to `pipeline` for the duration of `run`.
    fn run_in_process<F>(&self, pipeline: &SharedPipeline, run: F) -> Result<()>
    where
        F: FnOnce(&dyn PipelineExecutor) -> Result<()>,
    {
        let observer_id = self
            .progress_observer
            .as_ref()
            .map(|observer| pipeline.borrow_mut().add_observer(Rc::clone(observer)));

        let result = run(self.executor.as_ref());

        if let Some(id) = observer_id {
            pipeline.borrow_mut().remove_observer(id);
        }
        result
    }

    fn run_scene_externally(&mut self, pipeline: &SharedPipeline, scene: &Scene) -> Result<()> {
        let staged = self.staged_files()?;
        scene.save_to_file(&staged.input)?;
        self.run_staged(pipeline, &staged)
    }

    fn run_file_externally(
        &mut self,
        pipeline: &SharedPipeline,
        input: &Path,
    ) -> Result<TextureRelocator> {
        let mut staged = self.staged_files()?;
        staged.input = input.to_path_buf();
        self.run_staged(pipeline, &staged)?;

        Ok(staged
            .scratch
            .into_iter()
            .fold(TextureRelocator::new(TransferMode::Move), |relocator, root| {
                relocator.with_scratch_root(root)
            }))
    }

    /// Write the pipeline next to the staged input, run the worker and load
    /// its outputs back into the tree.
    fn run_staged(&self, pipeline: &SharedPipeline, staged: &StagedFiles) -> Result<()> {
        self.serializer.save(&pipeline.borrow(), &staged.pipeline)?;
        clear_worker_outputs(pipeline, &staged.output);

        self.run_external(&WorkerCommand {
            executable: self.resolve_batch_path()?,
            pipeline_file: staged.pipeline.clone(),
            input: staged.input.clone(),
            output: staged.output.clone(),
        })?;

        load_worker_outputs(pipeline, &staged.output)
    }

    /// Launch the batch worker and supervise it until it exits.
    fn run_external(&self, command: &WorkerCommand) -> Result<()> {
        let mut process = ExternalProcess::spawn(command)?;
        info!("Started batch worker {}", process.id());

        let observer = self.progress_observer.clone();
        let handler = self.error_handler.clone();
        let code = process.wait(self.poll_interval, |message| match message {
            PipeMessage::Progress(percent) => {
                if let Some(observer) = &observer {
                    if !observer.on_progress(f64::from(percent)) {
                        debug!("Batch worker progress cannot be cancelled; continuing");
                    }
                }
                Ok(())
            }
            PipeMessage::Error(text) => match &handler {
                Some(handler) => {
                    handler.handle_error("", "", 0, &text);
                    Ok(())
                }
                None => Err(SgError::ProcessFailure(text)),
            },
        })?;

        if code != 0 {
            return Err(SgError::ProcessFailure(format!(
                "FailedToRunPipeline: the batch worker exited with code {}",
                code
            )));
        }
        info!("Batch worker finished");
        Ok(())
    }

    // ==================== Helpers ====================

    fn override_parameters(&mut self, pipeline: &SharedPipeline) -> Result<()> {
        let texture_dir = self.work()?.texture_output_dir();
        let batch_path = self.resolve_batch_path().unwrap_or_default();
        override_pipeline_parameters(pipeline, &texture_dir, &batch_path)?;
        Ok(())
    }

    fn resolve_batch_path(&self) -> Result<PathBuf> {
        self.external_batch_path
            .clone()
            .or_else(default_batch_path)
            .ok_or_else(|| {
                SgError::ProcessFailure(
                    "ExecuteProcess (Batch Processor): no batch executable is configured"
                        .to_string(),
                )
            })
    }

    /// The engine's work directory, created on first use.
    fn work(&mut self) -> Result<&WorkDirectory> {
        let work = match self.work.take() {
            Some(work) => work,
            None => {
                let mut work = match &self.work_root {
                    Some(root) => WorkDirectory::in_root(root)?,
                    None => WorkDirectory::new()?,
                };
                work.set_texture_output_override(self.texture_output_directory.clone());
                work
            }
        };
        Ok(&*self.work.insert(work))
    }

    fn staged_files(&mut self) -> Result<StagedFiles> {
        let work = self.work()?;
        Ok(StagedFiles {
            input: work.import_dir().join(INPUT_SCENE_FILE),
            output: work.export_dir().join(OUTPUT_SCENE_FILE),
            pipeline: work.path().join(PIPELINE_FILE),
            scratch: vec![work.path().to_path_buf(), work.texture_output_dir()],
        })
    }
}

fn create_output_folder(output: &Path) -> Result<()> {
    let Some(dir) = output.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        warn!("Could not create output folder {:?}: {}", dir, e);
        SgError::IoFailure(format!(
            "RunProcess - Could not create output folder: {}",
            dir.display()
        ))
    })
}

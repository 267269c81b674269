//! Batch worker.
//!
//! The worker side of an out-of-process run:
//!
//! ```text
//! sgpipeline-rs -Progress "<pipeline file>" "<input scene>" "<output scene>"
//! ```
//!
//! It runs the pipeline in its own process with [`LocalExecutor`], writes
//! integer progress lines while it works and saves every node's processed
//! scene in the worker output layout. Its standard streams carry the
//! progress protocol, so nothing else may be printed to them.

use crate::error::{Result, ResultExt};
use crate::pipeline::{PipelineSerializer, ProgressObserver};
use crate::processing::executor::{LocalExecutor, PipelineExecutor};
use crate::processing::output::save_worker_outputs;
use crate::processing::process::PROGRESS_FLAG;
use crate::processing::protocol::progress_line;
use crate::scene::Scene;
use clap::Parser;
use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};

/// Simplygon pipeline batch worker
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "sgpipeline-rs")]
#[command(author, version, about, long_about = None)]
pub struct WorkerArgs {
    /// Report progress on standard output
    #[arg(long)]
    pub progress: bool,

    /// Pipeline definition file
    pub pipeline: PathBuf,

    /// Input scene file
    pub input: PathBuf,

    /// Output scene file
    pub output: PathBuf,

    /// Write logs to a file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl WorkerArgs {
    /// Parse arguments, accepting the single-dash `-Progress` spelling.
    pub fn parse_from_legacy<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(args.into_iter().map(|arg| {
            let arg = arg.into();
            if arg == PROGRESS_FLAG {
                OsString::from("--progress")
            } else {
                arg
            }
        }))
    }
}

/// Writes a progress line each time the integer percentage changes.
pub struct LineProgressWriter<W: Write> {
    out: RefCell<W>,
    last: Cell<Option<i32>>,
}

impl<W: Write> LineProgressWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            last: Cell::new(None),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> ProgressObserver for LineProgressWriter<W> {
    fn on_progress(&self, percent: f64) -> bool {
        let value = percent.clamp(0.0, 100.0) as i32;
        if self.last.get() == Some(value) {
            return true;
        }
        self.last.set(Some(value));

        let mut out = self.out.borrow_mut();
        if let Err(e) = out
            .write_all(progress_line(value).as_bytes())
            .and_then(|()| out.flush())
        {
            warn!("Failed to write progress: {}", e);
        }
        true
    }
}

/// Run one batch job. Progress lines go to `out` when requested.
pub fn run_worker<W: Write + 'static>(args: &WorkerArgs, out: W) -> Result<()> {
    info!(
        "Batch job: {:?} {:?} -> {:?}",
        args.pipeline, args.input, args.output
    );

    let pipeline = PipelineSerializer::new()
        .load(&args.pipeline)
        .context("Could not load the pipeline")?
        .into_shared();
    let scene = Scene::load_from_file(&args.input).context("Could not load the input scene")?;

    if args.progress {
        pipeline
            .borrow_mut()
            .add_observer(Rc::new(LineProgressWriter::new(out)));
    }

    LocalExecutor::new()
        .run_scene(&pipeline, &scene)
        .context("Could not run the pipeline")?;

    let written = save_worker_outputs(&pipeline, &args.output)
        .context("Could not save the processed scenes")?;
    info!("Batch job finished, {} scene(s) written", written);
    Ok(())
}

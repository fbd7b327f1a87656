//! `neuro_deconvolve`: generate a tcsh script that deconvolves BOLD series
//!
//! The pipeline is classify, compose, write:
//!
//! 1. [`InputClassifier`] inspects the primary input (format, length, TR)
//! 2. [`ScriptComposer`] renders one of the three script variants
//! 3. [`ScriptWriter`] stores the script with the executable bit set
//!
//! Nothing touches the disk until the configuration and the input have both
//! been validated, so a bad option never leaves a partial script behind.

pub mod compose;
pub mod config;
pub mod input;
pub mod labels;
pub mod writer;

pub use compose::{RenderMode, ScriptComposer};
pub use config::{DeconConfig, Kernel, RenderStyle};
pub use input::{InputClassifier, InputDescriptor, InputFormat, SeriesLayout};
pub use writer::ScriptWriter;

use crate::error::ToolResult;
use crate::fs::FileSystem;
use crate::shell::ShellRunner;
use std::path::PathBuf;
use tracing::info;

/// What a successful run produced
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScript {
    pub path: PathBuf,
    pub mode: RenderMode,
    pub input: InputDescriptor,
}

pub fn generate_script(
    config: &DeconConfig,
    fs: &dyn FileSystem,
    shell: &dyn ShellRunner,
) -> ToolResult<GeneratedScript> {
    config.validate()?;

    let input = InputClassifier::new(fs, shell).classify(config)?;
    info!(
        format = ?input.format,
        reps = input.reps,
        tr = input.tr,
        polort = input.polort(),
        "classified primary input"
    );

    let composer = ScriptComposer::new(config, &input);
    let mode = composer.mode();
    let text = composer.compose()?;

    ScriptWriter::new(fs).write(&config.script, &text)?;

    Ok(GeneratedScript {
        path: config.script.clone(),
        mode,
        input,
    })
}

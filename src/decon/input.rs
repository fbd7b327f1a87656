//! Input classification: what the primary input is, how long it is, and its TR

use super::config::DeconConfig;
use crate::error::{ToolError, ToolResult};
use crate::fs::FileSystem;
use crate::shell::ShellRunner;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Seconds of data per extra degree of detrending polynomial
const POLORT_SECONDS_PER_DEGREE: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Plain-text numeric matrix (`.1D`)
    TextSeries,
    /// AFNI/NIfTI 3d+time dataset
    Volumetric,
}

/// How a text series is laid out on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesLayout {
    /// One row: the series is stored horizontally and is read as-is
    Transposed,
    /// One value per row; must be transposed on read
    Columnar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixShape {
    pub rows: usize,
    pub cols: usize,
}

impl MatrixShape {
    pub fn layout(&self) -> SeriesLayout {
        if self.rows == 1 {
            SeriesLayout::Transposed
        } else {
            SeriesLayout::Columnar
        }
    }

    pub fn max_dim(&self) -> usize {
        self.rows.max(self.cols)
    }
}

/// Facts derived from the primary input, fixed once computed
#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    pub format: InputFormat,
    /// Number of time points
    pub reps: usize,
    pub tr: f64,
    /// Matrix dimensions, for text series
    pub shape: Option<MatrixShape>,
    /// View suffix used in derived dataset names (`+orig`, `.nii`), for volumes
    pub view: Option<String>,
}

impl InputDescriptor {
    pub fn layout(&self) -> Option<SeriesLayout> {
        self.shape.map(|s| s.layout())
    }

    pub fn polort(&self) -> u32 {
        default_polort(self.tr, self.reps)
    }
}

/// Default detrending degree: one more per 150 seconds of data
pub fn default_polort(tr: f64, reps: usize) -> u32 {
    let run_time = tr * reps as f64;
    1 + (run_time / POLORT_SECONDS_PER_DEGREE).floor() as u32
}

/// Name-based format of a dataset, plus its view suffix for volumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetName {
    pub format: InputFormat,
    pub view: Option<String>,
}

fn text_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.1[dD](\.dset)?$").unwrap())
}

fn afni_view_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+(orig|tlrc|acpc)(\.(HEAD|BRIK(\.gz)?))?\.?$").unwrap())
}

fn nifti_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.nii(\.gz)?$").unwrap())
}

/// Strip AFNI selectors such as `'[0..$]'`, `{3..20}` or `<1..2>`
pub fn strip_selectors(name: &str) -> &str {
    let start = name.rfind('/').map(|p| p + 1).unwrap_or(0);
    match name[start..].find(['[', '{', '<', '\'', '"']) {
        Some(pos) => &name[..start + pos],
        None => name,
    }
}

/// Classify a dataset by its naming convention
pub fn parse_dataset_name(name: &str) -> ToolResult<DatasetName> {
    let base = strip_selectors(name.trim());

    if text_pattern().is_match(base) {
        return Ok(DatasetName {
            format: InputFormat::TextSeries,
            view: None,
        });
    }
    if let Some(caps) = afni_view_pattern().captures(base) {
        return Ok(DatasetName {
            format: InputFormat::Volumetric,
            view: Some(format!("+{}", &caps[1])),
        });
    }
    if nifti_pattern().is_match(base) {
        return Ok(DatasetName {
            format: InputFormat::Volumetric,
            view: Some(".nii".to_string()),
        });
    }

    Err(ToolError::Data(format!(
        "unknown dataset type for input '{}' (expected .1D, +orig/+tlrc/+acpc or .nii)",
        name
    )))
}

/// Shape of a whitespace/comma separated numeric matrix
///
/// Blank lines and `#` comments are skipped; `N@v` counts as N values.
pub fn parse_1d_shape(text: &str) -> Result<MatrixShape, String> {
    let mut rows = 0;
    let mut cols = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut count = 0;
        for token in line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            count += token_width(token)
                .ok_or_else(|| format!("line {}: bad value '{}'", lineno + 1, token))?;
        }

        match cols {
            None => cols = Some(count),
            Some(expected) if expected != count => {
                return Err(format!(
                    "line {}: {} values, but earlier rows have {}",
                    lineno + 1,
                    count,
                    expected
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    match cols {
        Some(cols) if cols > 0 => Ok(MatrixShape { rows, cols }),
        _ => Err("no numeric data".to_string()),
    }
}

fn token_width(token: &str) -> Option<usize> {
    match token.split_once('@') {
        Some((repeat, value)) => {
            value.parse::<f64>().ok()?;
            repeat.parse::<usize>().ok()
        }
        None => token.parse::<f64>().ok().map(|_| 1),
    }
}

/// Parse `3dinfo -nt -tr` output: repetition count, then TR
fn parse_reps_tr(output: &str) -> Option<(usize, f64)> {
    let mut fields = output.split_whitespace();
    let reps = fields.next()?.parse::<usize>().ok()?;
    let tr = fields.next()?.parse::<f64>().ok()?;
    (reps > 0 && tr.is_finite() && tr > 0.0).then_some((reps, tr))
}

/// Inspects the primary input of a request
pub struct InputClassifier<'a> {
    fs: &'a dyn FileSystem,
    shell: &'a dyn ShellRunner,
}

impl<'a> InputClassifier<'a> {
    pub fn new(fs: &'a dyn FileSystem, shell: &'a dyn ShellRunner) -> Self {
        Self { fs, shell }
    }

    pub fn classify(&self, config: &DeconConfig) -> ToolResult<InputDescriptor> {
        let primary = config.primary_input();
        let name = parse_dataset_name(primary)?;

        let descriptor = match name.format {
            InputFormat::TextSeries => self.classify_text(primary, config.tr)?,
            InputFormat::Volumetric => self.classify_volume(primary, name.view, config.tr)?,
        };

        debug!(
            input = primary,
            format = ?descriptor.format,
            reps = descriptor.reps,
            tr = descriptor.tr,
            layout = ?descriptor.layout(),
            "classified input"
        );
        Ok(descriptor)
    }

    fn classify_text(&self, primary: &str, tr: Option<f64>) -> ToolResult<InputDescriptor> {
        let tr = tr.ok_or_else(|| {
            ToolError::Config("--tr is required if the input is in 1D format".to_string())
        })?;

        let path = Path::new(strip_selectors(primary));
        let text = self
            .fs
            .read_to_string(path)
            .map_err(|e| ToolError::Data(format!("cannot read 1D input: {:#}", e)))?;
        let shape = parse_1d_shape(&text)
            .map_err(|e| ToolError::Data(format!("bad 1D input '{}': {}", primary, e)))?;

        Ok(InputDescriptor {
            format: InputFormat::TextSeries,
            reps: shape.max_dim(),
            tr,
            shape: Some(shape),
            view: None,
        })
    }

    fn classify_volume(
        &self,
        primary: &str,
        view: Option<String>,
        explicit_tr: Option<f64>,
    ) -> ToolResult<InputDescriptor> {
        let cwd = self
            .fs
            .current_dir()
            .map_err(|e| ToolError::Data(format!("{:#}", e)))?;
        let args = vec!["-nt".to_string(), "-tr".to_string(), primary.to_string()];

        let out = self
            .shell
            .run("3dinfo", &args, &cwd)
            .map_err(|e| ToolError::Data(format!("cannot query dataset '{}': {:#}", primary, e)))?;
        if !out.is_success() {
            return Err(ToolError::Data(format!(
                "3dinfo failed on '{}' (status {}): {}",
                primary,
                out.status,
                out.output.trim()
            )));
        }

        let (reps, tr) = parse_reps_tr(&out.output).ok_or_else(|| {
            ToolError::Data(format!(
                "cannot read reps/TR of '{}' from 3dinfo output '{}'",
                primary,
                out.output.trim()
            ))
        })?;

        if let Some(explicit) = explicit_tr {
            if (explicit - tr).abs() > 1e-6 {
                warn!(explicit, dataset = tr, "--tr differs from dataset TR, using dataset TR");
            }
        }

        Ok(InputDescriptor {
            format: InputFormat::Volumetric,
            reps,
            tr,
            shape: None,
            view,
        })
    }
}

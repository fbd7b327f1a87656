//! Deconvolution request and its defaults

use crate::error::{ToolError, ToolResult};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OUTDIR: &str = "decon.results";
pub const DEFAULT_PREFIX: &str = "test";
pub const DEFAULT_KERNEL_FILE: &str = "resp_kernel.1D";
pub const DEFAULT_TR_NUP: u32 = 1;
pub const DEFAULT_VERB: u8 = 1;

/// Response duration (seconds) covered by a GAM kernel
pub const GAM_DURATION: f64 = 12.0;
/// Response duration (seconds) covered by a BLOCK kernel
pub const BLOCK_DURATION: f64 = 15.0;

/// Response kernel shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    #[default]
    Gam,
    Block,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Gam => "GAM",
            Kernel::Block => "BLOCK",
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Kernel::Gam => GAM_DURATION,
            Kernel::Block => BLOCK_DURATION,
        }
    }

    /// Basis function string handed to `3dDeconvolve -stim_times`
    pub fn basis(&self) -> &'static str {
        match self {
            Kernel::Gam => "GAM",
            Kernel::Block => "BLOCK(0.1,1)",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GAM" => Ok(Kernel::Gam),
            "BLOCK" => Ok(Kernel::Block),
            other => Err(ToolError::Config(format!(
                "unsupported kernel '{}': only GAM and BLOCK basis functions are allowed",
                other
            ))),
        }
    }
}

/// Which generation of script to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStyle {
    /// Pre-2015 single pass script
    Legacy,
    #[default]
    Current,
}

/// Everything needed to compose one deconvolution script
#[derive(Debug, Clone, PartialEq)]
pub struct DeconConfig {
    /// Input datasets; the first one decides the input format
    pub infiles: Vec<String>,
    pub script: PathBuf,
    pub outdir: String,
    pub prefix: String,
    pub kernel: Kernel,
    /// Where the generated kernel is stored
    pub kernel_file: String,
    /// Pre-built kernel (at the upsampled TR); skips kernel generation
    pub kernel_file_in: Option<String>,
    pub mask_dset: Option<String>,
    /// Explicit TR; required for text inputs, overridden by dataset metadata
    pub tr: Option<f64>,
    pub tr_nup: u32,
    pub style: RenderStyle,
    pub verb: u8,
}

impl DeconConfig {
    pub fn new(infiles: Vec<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            infiles,
            script: script.into(),
            outdir: DEFAULT_OUTDIR.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            kernel: Kernel::default(),
            kernel_file: DEFAULT_KERNEL_FILE.to_string(),
            kernel_file_in: None,
            mask_dset: None,
            tr: None,
            tr_nup: DEFAULT_TR_NUP,
            style: RenderStyle::default(),
            verb: DEFAULT_VERB,
        }
    }

    pub fn primary_input(&self) -> &str {
        // validate() guarantees at least one entry
        self.infiles.first().map(String::as_str).unwrap_or("")
    }

    pub fn validate(&self) -> ToolResult<()> {
        if self.infiles.is_empty() {
            return Err(ToolError::Usage("missing option --infiles".to_string()));
        }
        if self.infiles.iter().any(|f| f.trim().is_empty()) {
            return Err(ToolError::Usage("empty name given to --infiles".to_string()));
        }
        if self.tr_nup == 0 {
            return Err(ToolError::Config("--tr-nup must be at least 1".to_string()));
        }
        if let Some(tr) = self.tr {
            if !(tr.is_finite() && tr > 0.0) {
                return Err(ToolError::Config(format!("--tr must be positive, have {}", tr)));
            }
        }
        Ok(())
    }
}

/// Number of kernel samples covering `duration` at TR / nup
///
/// Computed as `duration * nup / tr` so that e.g. 12 / (2.0 / 20) lands on
/// exactly 120 instead of 119.999...
pub fn kernel_samples(duration: f64, tr: f64, nup: u32) -> usize {
    let samples = duration * f64::from(nup) / tr;
    (samples + 1e-9).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_kernel_parsing() {
        assert_eq!("GAM".parse::<Kernel>().unwrap(), Kernel::Gam);
        assert_eq!("BLOCK".parse::<Kernel>().unwrap(), Kernel::Block);

        let err = "WAV".parse::<Kernel>().unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
        assert!(err.to_string().contains("WAV"));
    }

    #[test]
    fn test_kernel_basis() {
        assert_eq!(Kernel::Gam.basis(), "GAM");
        assert_eq!(Kernel::Block.basis(), "BLOCK(0.1,1)");
        assert_eq!(Kernel::Block.to_string(), "BLOCK");
    }

    #[parameterized(
        gam_tr2_nup20 = { Kernel::Gam, 2.0, 20, 120 },
        block_tr2_nup20 = { Kernel::Block, 2.0, 20, 150 },
        gam_tr2_native = { Kernel::Gam, 2.0, 1, 6 },
        block_tr2_native = { Kernel::Block, 2.0, 1, 7 },
        gam_tr2_5_nup25 = { Kernel::Gam, 2.5, 25, 120 },
        gam_tr3_nup30 = { Kernel::Gam, 3.0, 30, 120 },
        block_tr0_7_nup7 = { Kernel::Block, 0.7, 7, 150 },
    )]
    fn test_kernel_samples(kernel: Kernel, tr: f64, nup: u32, expected: usize) {
        assert_eq!(kernel_samples(kernel.duration(), tr, nup), expected);
    }

    #[test]
    fn test_defaults() {
        let config = DeconConfig::new(vec!["seed.1D".into()], "script.neuro.txt");
        assert_eq!(config.outdir, "decon.results");
        assert_eq!(config.prefix, "test");
        assert_eq!(config.kernel, Kernel::Gam);
        assert_eq!(config.kernel_file, "resp_kernel.1D");
        assert_eq!(config.tr_nup, 1);
        assert_eq!(config.style, RenderStyle::Current);
        assert_eq!(config.tr, None);
        assert_eq!(config.primary_input(), "seed.1D");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DeconConfig::new(vec![], "s.txt");
        assert!(matches!(config.validate(), Err(ToolError::Usage(_))));

        config.infiles = vec!["a.1D".into()];
        config.tr = Some(0.0);
        assert!(matches!(config.validate(), Err(ToolError::Config(_))));

        config.tr = Some(-2.0);
        assert!(matches!(config.validate(), Err(ToolError::Config(_))));

        config.tr = Some(2.0);
        config.tr_nup = 0;
        assert!(matches!(config.validate(), Err(ToolError::Config(_))));
    }
}

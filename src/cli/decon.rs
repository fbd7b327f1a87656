use super::TerminalFlags;
use crate::decon::config::{
    DEFAULT_KERNEL_FILE, DEFAULT_OUTDIR, DEFAULT_PREFIX, DEFAULT_TR_NUP, DEFAULT_VERB,
};
use crate::decon::{generate_script, DeconConfig, GeneratedScript, Kernel, RenderStyle};
use crate::error::{ToolError, ToolResult};
use crate::fs::RealFileSystem;
use crate::shell::RealShell;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

pub const HISTORY: &str = "\
neuro_deconvolve history:

   0.1  single pass script: waver kernel, 3dDetrend and 3dTfitter
   0.2  multi-file method: per-file detrend, upsample, fit and reconvolve
        new --infiles (replacing --input), --old and --tr-nup
   0.3  inputs may include paths; labels strip the shared path and suffix
   0.4  --kernel-file-in for pre-built kernels, BLOCK kernels and
        wrapping of long script lines
";

/// Generate a tcsh script to deconvolve BOLD time series into neural responses
#[derive(Parser, Debug, Clone)]
#[command(
    name = "neuro_deconvolve",
    version,
    disable_version_flag = true,
    long_about = "Writes a tcsh script that detrends each input, builds a response kernel \
                  and runs 3dTfitter to estimate the underlying neural signal.\n\n\
                  Examples:\n  \
                  neuro_deconvolve --infiles seed.all_runs.1D seed.errts.1D --tr 2.0 \\\n      \
                  --tr-nup 20 --script script.neuro.txt\n  \
                  neuro_deconvolve --infiles epi_r1+orig --mask-dset mask+orig --script s.neuro"
)]
pub struct DeconArgs {
    #[arg(
        long,
        num_args = 1..,
        value_name = "PATH",
        required_unless_present_any = ["hist", "show_valid_opts"],
        help = "Input time series (.1D files or one 3d+time dataset); the first is primary"
    )]
    pub infiles: Vec<String>,

    #[arg(
        long,
        value_name = "PATH",
        required_unless_present_any = ["hist", "show_valid_opts"],
        help = "Name of the script to write"
    )]
    pub script: Option<PathBuf>,

    #[arg(long, value_name = "NAME", default_value = "GAM", help = "Response kernel: GAM or BLOCK")]
    pub kernel: String,

    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_KERNEL_FILE,
        help = "File the generated kernel is stored in"
    )]
    pub kernel_file: String,

    #[arg(
        long,
        value_name = "PATH",
        help = "Pre-built kernel at the upsampled TR, used instead of generating one"
    )]
    pub kernel_file_in: Option<String>,

    #[arg(long, value_name = "PATH", help = "Mask dataset for volumetric input")]
    pub mask_dset: Option<String>,

    #[arg(long, help = "Write the old-style single pass script")]
    pub old: bool,

    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUTDIR, help = "Output directory of the script")]
    pub outdir: String,

    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX, help = "Prefix for the neural response output")]
    pub prefix: String,

    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = parse_tr,
        help = "Repetition time (required for .1D input)"
    )]
    pub tr: Option<f64>,

    #[arg(
        long,
        value_name = "FACTOR",
        default_value_t = DEFAULT_TR_NUP,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Upsample factor applied to the TR"
    )]
    pub tr_nup: u32,

    #[arg(long, value_name = "LEVEL", default_value_t = DEFAULT_VERB, help = "Verbosity level")]
    pub verb: u8,

    #[arg(long, help = "Show the modification history")]
    pub hist: bool,

    #[arg(long, help = "List all valid options")]
    pub show_valid_opts: bool,

    #[arg(long = "ver", action = ArgAction::Version, help = "Show the version")]
    pub ver: Option<bool>,
}

impl TerminalFlags for DeconArgs {
    const HISTORY: &'static str = HISTORY;

    fn wants_history(&self) -> bool {
        self.hist
    }

    fn wants_valid_opts(&self) -> bool {
        self.show_valid_opts
    }
}

fn parse_tr(s: &str) -> Result<f64, String> {
    let tr: f64 = s
        .parse()
        .map_err(|_| format!("invalid TR '{}': expected a number of seconds", s))?;
    if tr.is_finite() && tr > 0.0 {
        Ok(tr)
    } else {
        Err(format!("invalid TR '{}': must be positive", s))
    }
}

impl TryFrom<&DeconArgs> for DeconConfig {
    type Error = ToolError;

    fn try_from(args: &DeconArgs) -> Result<Self, Self::Error> {
        let script = args
            .script
            .clone()
            .ok_or_else(|| ToolError::Usage("missing option --script".to_string()))?;
        let kernel: Kernel = args.kernel.parse()?;

        let mut config = DeconConfig::new(args.infiles.clone(), script);
        config.kernel = kernel;
        config.kernel_file = args.kernel_file.clone();
        config.kernel_file_in = args.kernel_file_in.clone();
        config.mask_dset = args.mask_dset.clone();
        config.outdir = args.outdir.clone();
        config.prefix = args.prefix.clone();
        config.tr = args.tr;
        config.tr_nup = args.tr_nup;
        config.style = if args.old {
            RenderStyle::Legacy
        } else {
            RenderStyle::Current
        };
        config.verb = args.verb;

        config.validate()?;
        Ok(config)
    }
}

/// Build the request from parsed arguments and write the script to disk
pub fn run(args: &DeconArgs) -> ToolResult<GeneratedScript> {
    let config = DeconConfig::try_from(args)?;
    generate_script(&config, &RealFileSystem, &RealShell)
}

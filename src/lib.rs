//! afni-tools - script generation and build automation for AFNI workflows
//!
//! Two command-line tools share this library:
//!
//! - `neuro_deconvolve` writes a tcsh script that deconvolves BOLD time series
//!   into estimated neural responses using AFNI programs (`3dDetrend`,
//!   `1dUpsample`, `3dDeconvolve`, `3dTfitter`, `waver`)
//! - `build_afni` prepares an AFNI build tree: old build outputs are moved to
//!   `prev.*` and the git checkout is cloned or updated
//!
//! # Example Usage
//!
//! ```no_run
//! use afni_tools::decon::{generate_script, DeconConfig};
//! use afni_tools::fs::RealFileSystem;
//! use afni_tools::shell::RealShell;
//!
//! let mut config = DeconConfig::new(
//!     vec!["seed.errts.1D".into(), "seed.fitts.1D".into()],
//!     "script.neuro.txt",
//! );
//! config.tr = Some(2.0);
//! config.tr_nup = 20;
//!
//! let generated = generate_script(&config, &RealFileSystem, &RealShell)?;
//! println!("wrote {}", generated.path.display());
//! # Ok::<(), afni_tools::error::ToolError>(())
//! ```
//!
//! # Project Structure
//!
//! - [`decon`]: input classification, script composition and writing
//! - [`build`]: directory snapshots, build planning and step execution
//! - [`cli`]: clap argument schemas and the terminal informational flags
//! - [`fs`], [`shell`]: seams over the disk and external programs

pub mod build;
pub mod cli;
pub mod decon;
pub mod error;
pub mod fs;
pub mod shell;
pub mod util;

pub use error::{ToolError, ToolResult};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

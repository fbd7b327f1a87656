use afni_tools::cli::{self, DeconArgs, Invocation};
use afni_tools::util::{init_logging, LoggingConfig};
use afni_tools::VERSION;

use std::env;
use std::process;
use tracing::{debug, info};

fn main() {
    let code = match cli::parse_invocation::<DeconArgs, _, _>(env::args_os()) {
        Ok(Invocation::Terminal(text)) => {
            print!("{}", text);
            0
        }
        Ok(Invocation::Run(args)) => {
            init_logging(LoggingConfig::from_verb(args.verb));
            debug!("neuro_deconvolve v{} starting", VERSION);
            debug!("Arguments: {:?}", args);

            match cli::decon::run(&args) {
                Ok(generated) => {
                    info!(mode = ?generated.mode, "script written to {}", generated.path.display());
                    0
                }
                Err(err) => cli::report_error(&err),
            }
        }
        Err(err) => cli::report_error(&err),
    };

    process::exit(code);
}

use afni_tools::cli::{self, BuildArgs, Invocation};
use afni_tools::util::{init_logging, LoggingConfig};
use afni_tools::VERSION;

use std::env;
use std::process;
use tracing::debug;

fn main() {
    let code = match cli::parse_invocation::<BuildArgs, _, _>(env::args_os()) {
        Ok(Invocation::Terminal(text)) => {
            print!("{}", text);
            0
        }
        Ok(Invocation::Run(args)) => {
            init_logging(LoggingConfig::from_verb(args.verb));
            debug!("build_afni v{} starting", VERSION);
            debug!("Arguments: {:?}", args);

            match cli::build::run(&args) {
                Ok(report) => {
                    if let Some(path) = report.history_file {
                        debug!("command history saved to {}", path.display());
                    }
                    0
                }
                Err(err) => cli::report_error(&err),
            }
        }
        Err(err) => cli::report_error(&err),
    };

    process::exit(code);
}

//! CloudSecure CLI
//!
//! Command-line interface for the Illumio CloudSecure API.

use clap::Parser;
use cloudsecure_core::exitcode;
use cloudsecurectl::cli::{exit_code_for, run, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported as errors by clap
            let code = if e.use_stderr() {
                exitcode::USAGE
            } else {
                exitcode::OK
            };
            e.print().ok();
            std::process::exit(code);
        }
    };

    let verbose = cli.verbose;
    init_tracing(verbose);

    match run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end_matches('\n'));
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if verbose {
                eprintln!("Error details: {:?}", e);
            }
            std::process::exit(exit_code_for(&e));
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cloudsecurectl=debug,cloudsecure_core=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

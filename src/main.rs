//! instr-sampler CLI

mod cli;

use clap::Parser;
use instr_sampler::sampler;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, EXIT_FAILURE, EXIT_SUCCESS};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "instr_sampler=debug"
    } else {
        "instr_sampler=warn"
    };
    let directive = match default_level.parse() {
        Ok(it) => it,
        Err(e) => {
            eprintln!("invalid log directive {}: {}", default_level, e);
            std::process::exit(EXIT_FAILURE);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let config = cli.run_config();
    if let Err(e) = config.validate() {
        error!("{}", e);
        return EXIT_FAILURE;
    }

    let mut exit_code = EXIT_SUCCESS;
    for discipline in cli.disciplines() {
        match sampler::run(discipline, &config, &cli.program, &cli.args) {
            Ok(report) => {
                if report.suspect() {
                    warn!(
                        %discipline,
                        exit = %report.exit,
                        "workload did not run to completion, total is not meaningful"
                    );
                }
                println!("{}", report.total);
            }
            Err(e) if e.is_fatal() => {
                error!(%discipline, "{}", e);
                return EXIT_FAILURE;
            }
            Err(e) => {
                error!(%discipline, "run failed: {}", e);
                exit_code = EXIT_FAILURE;
            }
        }
    }
    exit_code
}

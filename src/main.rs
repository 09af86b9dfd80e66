// src/main.rs

use std::process::ExitCode;

use princess::{cli, exit_code, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("princess: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("princess: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

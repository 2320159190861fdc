use std::process::ExitCode;

use footprint::{cli::run_cli, utils::runtime::run_detached};

fn main() -> ExitCode {
    // A cancelled run may leave collection or rendering on the blocking pool.
    match run_detached(run_cli()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            ExitCode::FAILURE
        }
    }
}

//! echo-load: sequential correctness load for TCP echo servers
//!
//! Opens one connection per request, sends `Hello from <n>`, reads a
//! single reply and checks it is an exact echo. Stops at the first
//! failure.
//!
//! Exit status:
//! - `0`: every request was echoed exactly
//! - `1`: a reply did not match its payload
//! - `2`: configuration error, or an I/O error prevented the check

mod config;
mod connection;
mod driver;
mod error;
mod payload;

#[cfg(test)]
mod testing;

use config::Config;
use driver::Driver;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_MISMATCH: u8 = 1;
/// Also used for configuration errors, reported before logging is up.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build runtime");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let driver = Driver::new(&config);
    match runtime.block_on(driver.run()) {
        Ok(report) => {
            info!(
                requests = report.completed,
                rate = %format!("{:.1}/s", report.rate()),
                "All echoes matched"
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_assertion() => {
            error!(index = e.index(), "{e}");
            ExitCode::from(EXIT_MISMATCH)
        }
        Err(e) => {
            error!(index = e.index(), stage = ?e.stage(), "{e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

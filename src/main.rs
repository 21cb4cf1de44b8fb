//! Setup - main entry point
//!
//! Parse → ensure engine → check inventory → run playbook → save log → exit
//! with the engine's code.

use chrono::Local;
use std::io::IsTerminal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use tower_setup::error::SetupError;
use tower_setup::{
    Cli, DistroDetector, Invocation, RealCommandRunner, Settings, log_file, output, process_guard,
    run_playbook, sanity,
};

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logger();
    info!("setup starting");

    // Children are stopped if we receive SIGINT/SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let cli = Cli::parse_or_exit();
    debug!("CLI arguments parsed: {:?}", cli);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            if matches!(e, SetupError::Spawn { .. } | SetupError::Io(_)) {
                output::failure(&e.to_string());
            }
            e.exit_code()
        }
    };

    std::process::exit(code);
}

/// Run the pipeline and return the engine's exit code.
fn run(cli: Cli) -> Result<i32, SetupError> {
    let cwd = std::env::current_dir()?;
    let config = cli.into_config(&cwd);
    let settings = Settings::from_env();
    debug!("Run configuration: {:?}", config);
    debug!("Settings: {:?}", settings);

    let detector = DistroDetector::new(&settings.host_root);
    sanity::ensure_engine_installed(&RealCommandRunner, &detector, &settings, &config)?;
    sanity::check_inventory(&config)?;

    let invocation = Invocation::new(&config, &settings, std::io::stdout().is_terminal());
    let transient = cwd.join(config.log_name());
    let outcome = run_playbook(&invocation, &transient)?;

    let log_dir = settings.log_dir_or(&cwd);
    match log_file::finalize_log(&transient, &log_dir, config.mode.log_stem(), &Local::now()) {
        Ok(path) => output::success(&format!("Wrote log file: {}", path.display())),
        Err(e) => {
            warn!("{:#}", e);
            output::failure(&format!(
                "Could not save the log file; output is still in {}",
                transient.display()
            ));
        }
    }

    Ok(outcome.exit_code)
}

//! Playbook execution
//!
//! Builds the engine command line from the run configuration, runs it with
//! stdout and stderr joined into one pipe, and copies that stream to the
//! terminal and the transient log while the engine runs.
//!
//! The engine's exit code is read straight from the child, so nothing in the
//! output path can mask it.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::config::{SetupConfig, Settings};
use crate::error::{Result, SetupError};
use crate::output;
use crate::process_guard::{CommandDeathSignal, RegisteredChild};

/// A fully resolved engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Playbook name used in status messages
    pub label: String,
}

impl Invocation {
    /// `<engine> -i <inventory> -v [-e K=V]... [--force-handlers] [passthrough]... <playbook>`
    ///
    /// `interactive` forces coloured engine output.
    pub fn new(config: &SetupConfig, settings: &Settings, interactive: bool) -> Self {
        let mut args = vec![
            "-i".to_string(),
            config.inventory.display().to_string(),
            "-v".to_string(),
        ];
        for var in &config.extra_vars {
            args.push("-e".to_string());
            args.push(var.as_str().to_string());
        }
        if config.mode.forces_handlers() {
            args.push("--force-handlers".to_string());
        }
        args.extend(config.passthrough.iter().cloned());
        args.push(config.playbook().to_string());

        let force_color = if interactive { "True" } else { "False" };
        let env = vec![
            ("PYTHONUNBUFFERED".to_string(), "x".to_string()),
            ("ANSIBLE_FORCE_COLOR".to_string(), force_color.to_string()),
            ("ANSIBLE_ERROR_ON_UNDEFINED_VARS".to_string(), "True".to_string()),
        ];

        Self {
            program: settings.engine.clone(),
            args,
            env,
            label: config.playbook().to_string(),
        }
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        let env: Vec<String> = self.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{} {} {}", env.join(" "), self.program, self.args.join(" "))
    }
}

/// Result of one engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybookOutcome {
    /// Engine exit code, or `128 + signal` when it was killed
    pub exit_code: i32,
}

impl PlaybookOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        let exit_code = status
            .code()
            .unwrap_or_else(|| 128 + status.signal().unwrap_or(0));
        Self { exit_code }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run the engine, teeing its output to stdout and `transient_log`.
pub fn run_playbook(invocation: &Invocation, transient_log: &Path) -> Result<PlaybookOutcome> {
    let outcome = run_playbook_to(invocation, transient_log, &mut io::stdout())?;

    if outcome.success() {
        output::success(&format!("{} completed successfully", invocation.label));
    } else {
        output::failure(&format!(
            "{} failed with exit code {}; see the log file for details",
            invocation.label, outcome.exit_code
        ));
    }
    Ok(outcome)
}

/// Same as [`run_playbook`] with an explicit terminal sink and no status line.
pub fn run_playbook_to<W: Write>(
    invocation: &Invocation,
    transient_log: &Path,
    terminal: &mut W,
) -> Result<PlaybookOutcome> {
    tracing::info!("Running: {}", invocation.command_line());

    let mut log = File::create(transient_log)?;
    let (reader, writer) = io::pipe()?;

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(writer.try_clone()?)
        .stderr(writer)
        .with_death_signal();

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            drop(log);
            let _ = std::fs::remove_file(transient_log);
            return Err(SetupError::Spawn {
                program: invocation.program.clone(),
                source,
            });
        }
    };
    // The command holds the parent's copies of the write end; the reader only
    // sees EOF once they are gone.
    drop(cmd);

    let status = collect_output(child, reader, terminal, &mut log)?;
    let outcome = PlaybookOutcome::from_status(status);
    tracing::info!("{} exited with code {}", invocation.program, outcome.exit_code);
    Ok(outcome)
}

/// Tee the child's output until EOF, then reap it.
///
/// The read end is closed before waiting so a child still writing after a
/// read error gets EPIPE instead of blocking on a full pipe. The registry
/// entry is removed as soon as the PID is reaped.
fn collect_output<R, A, B>(
    mut child: Child,
    mut reader: R,
    terminal: &mut A,
    log: &mut B,
) -> io::Result<ExitStatus>
where
    R: Read,
    A: Write,
    B: Write,
{
    let registered = RegisteredChild::register(child.id());

    if let Err(e) = tee(&mut reader, terminal, log) {
        tracing::warn!("Stopped copying engine output: {}", e);
    }
    drop(reader);

    let status = child.wait();
    drop(registered);
    status
}

/// Copy `reader` to both sinks until EOF.
///
/// A sink that fails to accept data is dropped with a warning and the other
/// keeps receiving output, so the child never blocks on a full pipe.
pub fn tee<R, A, B>(reader: &mut R, terminal: &mut A, log: &mut B) -> io::Result<u64>
where
    R: Read,
    A: Write,
    B: Write,
{
    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    let mut terminal_open = true;
    let mut log_open = true;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buf[..n];

        if terminal_open {
            if let Err(e) = terminal.write_all(chunk).and_then(|()| terminal.flush()) {
                tracing::warn!("Terminal output failed, continuing with log only: {}", e);
                terminal_open = false;
            }
        }
        if log_open {
            if let Err(e) = log.write_all(chunk) {
                tracing::warn!("Log write failed, continuing with terminal only: {}", e);
                log_open = false;
            }
        }
        total += n as u64;
    }

    if log_open {
        log.flush()?;
    }
    Ok(total)
}

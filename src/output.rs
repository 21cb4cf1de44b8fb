//! User-facing status lines
//!
//! Diagnostics go through `tracing`; these are the lines a person running the
//! installer is meant to read. Colour is only used on a terminal.

use crossterm::style::Stylize;
use std::io::IsTerminal;

/// `✓ message` on stdout
pub fn success(msg: &str) {
    let mark = if std::io::stdout().is_terminal() {
        "✓".green().bold().to_string()
    } else {
        "✓".to_string()
    };
    println!("{} {}", mark, msg);
}

/// `✗ message` on stderr
pub fn failure(msg: &str) {
    let mark = if std::io::stderr().is_terminal() {
        "✗".red().bold().to_string()
    } else {
        "✗".to_string()
    };
    eprintln!("{} {}", mark, msg);
}

/// Boxed error with remediation steps, printed before a fatal exit
pub fn error_box(title: &str, lines: &[String]) {
    let rule = "═".repeat(66);
    let heading = if std::io::stderr().is_terminal() {
        title.red().bold().to_string()
    } else {
        title.to_string()
    };

    eprintln!();
    eprintln!("╔{}╗", rule);
    eprintln!("  {}", heading);
    eprintln!("╚{}╝", rule);
    eprintln!();
    for line in lines {
        eprintln!("   {}", line);
    }
    eprintln!();
}

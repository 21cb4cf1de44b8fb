//! Property-based tests for argument handling
//!
//! These tests verify:
//! - Pass-through tokens reach the engine unmodified and in order
//! - Mode flags select the playbook and transient log from the fixed table
//! - Only the `bundle_install` key sets the override flag

use proptest::prelude::*;
use std::path::Path;

use tower_setup::{Cli, Invocation, OperationMode, Settings};

/// Tokens a user might put after `--`, including ones that look like local flags
fn passthrough_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("-b".to_string()),
        Just("-i".to_string()),
        Just("-e".to_string()),
        Just("--check".to_string()),
        "[-a-zA-Z0-9=_.,: ]{1,16}",
    ]
    .prop_filter("the separator itself", |t| t != "--")
}

fn mode_strategy() -> impl Strategy<Value = (Option<&'static str>, OperationMode)> {
    prop_oneof![
        Just((None, OperationMode::Install)),
        Just((Some("-b"), OperationMode::Backup)),
        Just((Some("-r"), OperationMode::Restore)),
        Just((Some("-k"), OperationMode::Rekey)),
    ]
}

fn parse(args: Vec<String>) -> Cli {
    let mut full = vec!["setup".to_string()];
    full.extend(args);
    Cli::try_parse_args(full).expect("arguments should parse")
}

proptest! {
    /// Everything after `--` is forwarded verbatim, right before the playbook
    #[test]
    fn passthrough_is_forwarded_verbatim(
        tokens in prop::collection::vec(passthrough_token(), 0..8),
        (flag, mode) in mode_strategy(),
    ) {
        let mut args = Vec::new();
        if let Some(flag) = flag {
            args.push(flag.to_string());
        }
        args.push("--".to_string());
        args.extend(tokens.iter().cloned());

        let config = parse(args).into_config(Path::new("/work"));
        prop_assert_eq!(config.mode, mode);
        prop_assert_eq!(&config.passthrough, &tokens);
        prop_assert!(config.extra_vars.is_empty());

        let inv = Invocation::new(&config, &Settings::default(), false);
        let n = inv.args.len();
        prop_assert_eq!(&inv.args[n - 1 - tokens.len()..n - 1], tokens.as_slice());
        prop_assert_eq!(inv.args.last().map(String::as_str), Some(mode.playbook()));
    }

    /// Mode flags pick the playbook and log name from the table
    #[test]
    fn mode_selects_playbook_and_log(
        (flag, mode) in mode_strategy(),
        vars in prop::collection::vec("[a-z_]{1,10}=[a-z0-9]{0,6}", 0..4),
    ) {
        let mut args = Vec::new();
        for var in &vars {
            args.push("-e".to_string());
            args.push(var.clone());
        }
        if let Some(flag) = flag {
            args.push(flag.to_string());
        }

        let config = parse(args).into_config(Path::new("/work"));
        prop_assert_eq!(config.playbook(), mode.playbook());
        prop_assert_eq!(config.log_name(), mode.log_name());

        let expected_log = match mode {
            OperationMode::Install => "setup.log",
            OperationMode::Backup => "backup.log",
            OperationMode::Restore => "restore.log",
            OperationMode::Rekey => "rekey.log",
        };
        prop_assert_eq!(config.log_name(), expected_log);

        let inv = Invocation::new(&config, &Settings::default(), false);
        let forced = inv.args.iter().any(|a| a == "--force-handlers");
        prop_assert_eq!(forced, mode != OperationMode::Install);
    }

    /// The override flag tracks the `bundle_install` key exactly
    #[test]
    fn bundle_install_flag_tracks_key(
        vars in prop::collection::vec("[a-z_]{1,16}=[a-z]{0,5}", 0..5),
    ) {
        let mut args = Vec::new();
        for var in &vars {
            args.push("-e".to_string());
            args.push(var.clone());
        }

        let expected = vars.iter().any(|v| v.split('=').next() == Some("bundle_install"));
        let config = parse(args).into_config(Path::new("/work"));
        prop_assert_eq!(config.bundle_install, expected);
        prop_assert_eq!(config.extra_vars.len(), vars.len());
    }
}

//! Integration tests for CLI parsing and command routing

use clap::Parser;
use dotstore::cli::{map_error, Cli, Commands, RunContext};
use dotstore::config::DotstoreConfig;
use tempfile::TempDir;

fn run(temp_dir: &TempDir, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["dotstore"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    let config = DotstoreConfig {
        base_dir: Some(temp_dir.path().to_path_buf()),
        ..DotstoreConfig::default()
    };
    let ctx = RunContext::with_config(config, cli.name.clone(), cli.path.clone(), cli.namespace.clone())?;
    ctx.execute(&cli.command)
}

#[test]
fn test_parse_global_flags() {
    let cli = Cli::try_parse_from([
        "dotstore",
        "--name",
        "prefs",
        "--namespace",
        "app",
        "--verbose",
        "get",
        "a.b",
    ])
    .unwrap();
    assert_eq!(cli.name, "prefs");
    assert_eq!(cli.namespace.as_deref(), Some("app"));
    assert!(cli.verbose);
    assert_eq!(
        cli.command,
        Commands::Get {
            key: "a.b".to_string()
        }
    );
}

#[test]
fn test_union_requires_values() {
    assert!(Cli::try_parse_from(["dotstore", "union", "tags"]).is_err());
}

#[test]
fn test_commands_share_one_file() {
    let temp_dir = TempDir::new().unwrap();

    assert_eq!(run(&temp_dir, &["set", "user.name", "ada"]).unwrap(), "");
    assert_eq!(run(&temp_dir, &["set", "user.age", "36"]).unwrap(), "");
    assert_eq!(run(&temp_dir, &["get", "user.age"]).unwrap(), "36");
    assert_eq!(run(&temp_dir, &["get", "user.name"]).unwrap(), "\"ada\"");
    assert_eq!(run(&temp_dir, &["has-own", "user.name"]).unwrap(), "true");
    assert_eq!(
        run(&temp_dir, &["json", "--indent", "0"]).unwrap(),
        r#"{"user":{"name":"ada","age":36}}"#
    );

    assert_eq!(run(&temp_dir, &["del", "user.name"]).unwrap(), "true");
    assert_eq!(run(&temp_dir, &["get", "user.name"]).unwrap(), "");
    assert_eq!(run(&temp_dir, &["clear"]).unwrap(), "");
    assert_eq!(run(&temp_dir, &["json", "--indent", "0"]).unwrap(), "{}");
}

#[test]
fn test_namespace_and_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("explicit.json");
    let path_arg = path.to_str().unwrap();

    run(&temp_dir, &["--path", path_arg, "--namespace", "ns", "set", "k", "true"]).unwrap();
    assert_eq!(run(&temp_dir, &["--path", path_arg, "path"]).unwrap(), path_arg);
    assert_eq!(
        run(&temp_dir, &["--path", path_arg, "json", "--indent", "0"]).unwrap(),
        r#"{"ns":{"k":true}}"#
    );

    run(&temp_dir, &["--path", path_arg, "unlink"]).unwrap();
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn test_unreadable_store_maps_to_hint() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("locked.json");
    std::fs::write(&path, "{}").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores file modes
    if std::fs::read_to_string(&path).is_ok() {
        return;
    }
    let err = run(&temp_dir, &["--path", path.to_str().unwrap(), "get", "a"]).unwrap_err();
    assert!(map_error(&err).contains("permission denied"));
}

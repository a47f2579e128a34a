/// Process-level tests for the inventory binary: exit codes and stdout hygiene
use std::process::{Command, Output};

fn run(args: &[&str], env: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_awx-pg-inventory"))
        .args(args)
        .env_clear()
        .envs(env.iter().copied())
        // Keep dotenvy from picking up a developer's .env file.
        .current_dir(std::env::temp_dir())
        .output()
        .expect("failed to spawn inventory binary")
}

#[test]
fn missing_configuration_fails_without_output() {
    let output = run(&["--list"], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.matches("DB_NAME environment variable required").count(),
        1,
        "error should be reported exactly once:\n{}",
        stderr
    );
}

#[test]
fn missing_single_variable_fails() {
    let output = run(
        &[],
        &[
            ("DB_NAME", "inventory"),
            ("DB_USERNAME", "awx"),
            ("DB_PASSWORD", "secret"),
            ("DB_HOSTNAME", "127.0.0.1"),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("DB_PORT"));
}

#[test]
fn unreachable_database_fails_without_output() {
    let output = run(
        &["--list"],
        &[
            ("DB_NAME", "inventory"),
            ("DB_USERNAME", "awx"),
            ("DB_PASSWORD", "secret"),
            ("DB_HOSTNAME", "127.0.0.1"),
            ("DB_PORT", "1"),
            ("DB_SSLMODE", "disable"),
            ("DB_CONNECT_TIMEOUT_SECS", "5"),
        ],
    );

    assert_ne!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("secret"));
}

#[test]
fn conflicting_flags_are_a_usage_error() {
    let output = run(&["--list", "--host", "web1"], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

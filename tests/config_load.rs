// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load configuration files from disk and derive runtime settings.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use fcgs::config::load_config;

#[test]
fn full_file_drives_policy_and_ping_options() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fcgs.toml");
    fs::write(
        &path,
        r#"
[retry]
max_attempts = 4
delay_ms = 250

[transport]
sysfs_root = "/srv/sys"
dev_root = "/srv/dev"
timeout_ms = 3000

[ping]
interval_ms = 100
no_response_retries = 5
"#,
    )
    .expect("write");

    let config = load_config(&path).expect("config");
    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.delay, Duration::from_millis(250));
    assert_eq!(config.transport.sysfs_root, PathBuf::from("/srv/sys"));
    assert_eq!(config.transport.timeout_ms, 3000);
    let ping = config.ping_options(10, 7);
    assert_eq!(ping.count, 10);
    assert_eq!(ping.token, 7);
    assert_eq!(ping.interval, Duration::from_millis(100));
    assert_eq!(ping.no_response_retries, 5);
}

#[test]
fn unreadable_or_invalid_files_are_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_config(&dir.path().join("missing.toml")).is_err());

    let path = dir.path().join("bad.toml");
    fs::write(&path, "[transport]\ndev_root = \"dev\"\n").expect("write");
    let err = load_config(&path).expect_err("relative root");
    assert!(format!("{err:#}").contains("transport.dev_root must be absolute"));
}

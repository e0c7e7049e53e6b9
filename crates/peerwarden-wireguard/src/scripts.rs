// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the provisioning shell scripts.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use peerwarden_config::model::ProvisioningConfig;
use peerwarden_core::{ActionOutput, PeerwardenError, ProvisioningAction};

/// Invokes `<script> <client> [args]` and captures stdout followed by
/// stderr.
///
/// A script that is killed by a signal reports exit code `-1`. A script
/// that outlives its timeout is killed and reported as
/// [`PeerwardenError::Timeout`].
pub struct ScriptRunner {
    add: PathBuf,
    remove: PathBuf,
    link: PathBuf,
}

impl ScriptRunner {
    pub fn new(config: &ProvisioningConfig) -> Self {
        Self {
            add: config.script_path(&config.add_script),
            remove: config.script_path(&config.remove_script),
            link: config.script_path(&config.link_script),
        }
    }

    async fn run(
        &self,
        script: &Path,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError> {
        debug!(script = %script.display(), ?args, "running script");
        let child = Command::new(script)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PeerwardenError::Action {
                message: format!("failed to start {}: {e}", script.display()),
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| PeerwardenError::Timeout { duration: timeout })?
            .map_err(|e| PeerwardenError::Action {
                message: format!("failed to wait for {}: {e}", script.display()),
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(ActionOutput {
            output: text,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[async_trait]
impl ProvisioningAction for ScriptRunner {
    async fn add(&self, client: &str, timeout: Duration) -> Result<ActionOutput, PeerwardenError> {
        self.run(&self.add, &[client], timeout).await
    }

    async fn remove(
        &self,
        client: &str,
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError> {
        self.run(&self.remove, &[client], timeout).await
    }

    async fn install_link(
        &self,
        client: &str,
        ttl_secs: u64,
        timeout: Duration,
    ) -> Result<ActionOutput, PeerwardenError> {
        let ttl = ttl_secs.to_string();
        self.run(&self.link, &[client, &ttl], timeout).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str) {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn runner(dir: &TempDir) -> ScriptRunner {
        let config = ProvisioningConfig {
            scripts_dir: dir.path().to_string_lossy().into_owned(),
            add_script: "add.sh".into(),
            remove_script: "remove.sh".into(),
            link_script: "link.sh".into(),
            ..ProvisioningConfig::default()
        };
        ScriptRunner::new(&config)
    }

    const SECS: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn add_captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "add.sh", "echo \"created $1\"");
        write_script(&dir, "remove.sh", "echo \"client $1 not found\" >&2\nexit 3");
        let runner = runner(&dir);

        let out = runner.add("alice", SECS).await.unwrap();
        assert!(out.success());
        assert_eq!(out.output.trim(), "created alice");

        let out = runner.remove("bob", SECS).await.unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(out.output.contains("client bob not found"));
    }

    #[tokio::test]
    async fn install_link_passes_ttl() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "link.sh", "echo \"wget -O - https://h/init/$1.sh?ttl=$2\"");
        let out = runner(&dir).install_link("alice", 600, SECS).await.unwrap();
        assert_eq!(out.output.trim(), "wget -O - https://h/init/alice.sh?ttl=600");
    }

    #[tokio::test]
    async fn signal_reports_minus_one() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "add.sh", "kill -9 $$");
        let out = runner(&dir).add("alice", SECS).await.unwrap();
        assert_eq!(out.exit_code, -1);
    }

    #[tokio::test]
    async fn slow_script_times_out() {
        let dir = tempfile::tempdir().unwrap();
        write_script(&dir, "add.sh", "sleep 5");
        let err = runner(&dir)
            .add("alice", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, PeerwardenError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_script_is_an_action_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(&dir).add("alice", SECS).await.unwrap_err();
        assert!(matches!(err, PeerwardenError::Action { .. }));
    }
}

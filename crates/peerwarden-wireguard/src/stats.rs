// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peer statistics from the `wg` tool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use peerwarden_config::model::ProvisioningConfig;
use peerwarden_core::{PeerStats, PeerwardenError, StatsProvider};

use crate::parse;

/// Deadline for a single `wg` invocation.
pub const WG_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads stats with `wg show <interface>`, matching peers by the public key
/// derived from each client's `<clients_dir>/<name>/<name>.conf`.
///
/// Batch results are keyed by the client directory name as it appears on
/// disk. A `wg` call that outlives its deadline is killed and reported as
/// [`PeerwardenError::Timeout`].
pub struct WgStatsProvider {
    clients_dir: PathBuf,
    interface: String,
    wg_binary: PathBuf,
    timeout: Duration,
}

impl WgStatsProvider {
    pub fn new(config: &ProvisioningConfig) -> Self {
        Self {
            clients_dir: PathBuf::from(&config.clients_dir),
            interface: config.wg_interface.clone(),
            wg_binary: PathBuf::from("wg"),
            timeout: WG_TIMEOUT,
        }
    }

    /// Uses a different `wg` executable.
    pub fn with_wg_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.wg_binary = path.into();
        self
    }

    /// Overrides [`WG_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs `wg <args>`, feeding `input` on stdin, under the deadline.
    async fn wg(
        &self,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<std::process::Output, PeerwardenError> {
        let what = format!("wg {}", args.join(" "));
        let mut child = Command::new(&self.wg_binary)
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| action_err(&what, e))?;
        let stdin = child.stdin.take();

        let run = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                stdin.write_all(input.as_bytes()).await?;
            }
            child.wait_with_output().await
        };
        tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| PeerwardenError::Timeout {
                duration: self.timeout,
            })?
            .map_err(|e| action_err(&what, e))
    }

    async fn show(&self) -> Result<String, PeerwardenError> {
        let output = self.wg(&["show", self.interface.as_str()], None).await?;
        if !output.status.success() {
            return Err(PeerwardenError::Action {
                message: format!(
                    "wg show {} failed: {}",
                    self.interface,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn public_key(&self, client: &str) -> Result<String, PeerwardenError> {
        let conf_path = self.clients_dir.join(client).join(format!("{client}.conf"));
        let conf = tokio::fs::read_to_string(&conf_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PeerwardenError::NotFound(format!("client {client}")),
                _ => action_err(&format!("read {}", conf_path.display()), e),
            })?;
        let private_key = parse::private_key(&conf).ok_or_else(|| PeerwardenError::Action {
            message: format!("PrivateKey not found in {}", conf_path.display()),
        })?;

        let output = self.wg(&["pubkey"], Some(&private_key)).await?;
        if !output.status.success() {
            return Err(PeerwardenError::Action {
                message: format!("wg pubkey failed for {client}"),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn action_err(what: &str, e: std::io::Error) -> PeerwardenError {
    PeerwardenError::Action {
        message: format!("{what}: {e}"),
    }
}

#[async_trait]
impl StatsProvider for WgStatsProvider {
    async fn peer_stats(&self, client: &str) -> Result<PeerStats, PeerwardenError> {
        let public_key = self.public_key(client).await?;
        let output = self.show().await?;
        Ok(parse::peer_stats(&output, &public_key))
    }

    async fn all_peer_stats(&self) -> Result<HashMap<String, PeerStats>, PeerwardenError> {
        let output = self.show().await?;
        let mut entries = tokio::fs::read_dir(&self.clients_dir)
            .await
            .map_err(|e| action_err("read clients dir", e))?;

        let mut stats = HashMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| action_err("read clients dir", e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match self.public_key(&name).await {
                Ok(key) => {
                    stats.insert(name, parse::peer_stats(&output, &key));
                }
                Err(e) => debug!(client = %name, error = %e, "skipping client without readable key"),
            }
        }
        Ok(stats)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use peerwarden_core::PeerStatus;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    // Stand-in for `wg`: `pubkey` echoes "PUB-" plus the private key,
    // `show` prints a fixed peer table.
    const FAKE_WG: &str = r#"#!/bin/sh
case "$1" in
  pubkey) read key; echo "PUB-$key" ;;
  show) cat <<'OUT'
interface: wg0
peer: PUB-alicekey
  latest handshake: 10 seconds ago
  transfer: 2.00 KiB received, 1.00 KiB sent
peer: PUB-bobkey
  latest handshake: 3 hours ago
  transfer: 5 B received, 5 B sent
peer: PUB-davekey
  latest handshake: 5 seconds ago
  transfer: 1 B received, 1 B sent
OUT
  ;;
  *) exit 2 ;;
esac
"#;

    // Stand-in for a `wg` that never answers.
    const HUNG_WG: &str = "#!/bin/sh\nexec sleep 3600\n";

    fn install_wg(dir: &TempDir, script: &str) -> std::path::PathBuf {
        let wg = dir.path().join("wg");
        std::fs::write(&wg, script).unwrap();
        std::fs::set_permissions(&wg, std::fs::Permissions::from_mode(0o755)).unwrap();
        wg
    }

    fn write_client(dir: &TempDir, name: &str, key: &str) {
        let client_dir = dir.path().join("clients").join(name);
        std::fs::create_dir_all(&client_dir).unwrap();
        std::fs::write(
            client_dir.join(format!("{name}.conf")),
            format!("[Interface]\nPrivateKey = {key}\n"),
        )
        .unwrap();
    }

    fn fixture() -> (TempDir, WgStatsProvider) {
        let dir = tempfile::tempdir().unwrap();
        let wg = install_wg(&dir, FAKE_WG);

        for (name, key) in [("alice", "alicekey"), ("bob", "bobkey"), ("carol", "carolkey")] {
            write_client(&dir, name, key);
        }
        let clients = dir.path().join("clients");
        std::fs::create_dir_all(clients.join("broken")).unwrap();
        std::fs::write(clients.join("stray.txt"), "not a client").unwrap();

        let config = ProvisioningConfig {
            clients_dir: clients.to_string_lossy().into_owned(),
            ..ProvisioningConfig::default()
        };
        let provider = WgStatsProvider::new(&config).with_wg_binary(wg);
        (dir, provider)
    }

    #[tokio::test]
    async fn all_peer_stats_skips_clients_without_keys() {
        let (_dir, provider) = fixture();
        let stats = provider.all_peer_stats().await.unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats["alice"].status, PeerStatus::Active);
        assert_eq!(stats["alice"].rx_bytes, 2048);
        assert_eq!(stats["bob"].status, PeerStatus::Inactive);
        assert_eq!(stats["carol"].status, PeerStatus::NeverConnected);
        assert!(!stats.contains_key("broken"));
    }

    #[tokio::test]
    async fn single_peer_stats() {
        let (_dir, provider) = fixture();
        let stats = provider.peer_stats("bob").await.unwrap();
        assert_eq!(stats.last_handshake_secs, Some(3 * 3_600));
    }

    #[tokio::test]
    async fn missing_config_is_not_found() {
        let (_dir, provider) = fixture();
        assert!(provider.peer_stats("nobody").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn batch_stats_keep_the_directory_name() {
        let (dir, provider) = fixture();
        write_client(&dir, "Dave", "davekey");

        let stats = provider.all_peer_stats().await.unwrap();

        assert_eq!(stats["Dave"].status, PeerStatus::Active);
        assert_eq!(stats["Dave"].last_handshake_secs, Some(5));
        assert!(!stats.contains_key("dave"));
    }

    #[tokio::test]
    async fn hung_wg_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let wg = install_wg(&dir, HUNG_WG);
        write_client(&dir, "alice", "alicekey");
        let config = ProvisioningConfig {
            clients_dir: dir.path().join("clients").to_string_lossy().into_owned(),
            ..ProvisioningConfig::default()
        };
        let provider = WgStatsProvider::new(&config)
            .with_wg_binary(wg)
            .with_timeout(Duration::from_millis(300));

        let batch = tokio::time::timeout(Duration::from_secs(10), provider.all_peer_stats())
            .await
            .expect("wg show must be bounded");
        assert!(matches!(batch, Err(PeerwardenError::Timeout { .. })));

        let single = tokio::time::timeout(Duration::from_secs(10), provider.peer_stats("alice"))
            .await
            .expect("wg pubkey must be bounded");
        assert!(matches!(single, Err(PeerwardenError::Timeout { .. })));
    }
}

// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use peerwarden_core::{ClientInventory, PeerwardenError};

/// Client directories under `clients_dir`, one per provisioned client.
pub struct FsClientInventory {
    clients_dir: PathBuf,
}

impl FsClientInventory {
    pub fn new(clients_dir: impl Into<PathBuf>) -> Self {
        Self {
            clients_dir: clients_dir.into(),
        }
    }
}

fn io_err(e: std::io::Error) -> PeerwardenError {
    PeerwardenError::Action {
        message: format!("clients directory: {e}"),
    }
}

#[async_trait]
impl ClientInventory for FsClientInventory {
    async fn list_clients(&self) -> Result<Vec<String>, PeerwardenError> {
        let mut entries = tokio::fs::read_dir(&self.clients_dir).await.map_err(io_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, client: &str) -> Result<bool, PeerwardenError> {
        if client.is_empty() || client.contains('/') || client == "." || client == ".." {
            return Ok(false);
        }
        match tokio::fs::metadata(self.clients_dir.join(client)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(e)),
        }
    }
}

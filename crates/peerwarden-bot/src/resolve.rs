// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping client directory names to accounts.

use peerwarden_core::{Account, AccountRepository, PeerwardenError};
use tracing::debug;

/// Outcome of [`resolve_account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An existing account matched.
    Found(Account),
    /// No account existed; a placeholder without a chat id was created.
    AutoRegistered(Account),
    /// Nothing matched and the fallback produced nothing.
    Unresolvable,
}

impl Resolution {
    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::Found(acc) | Self::AutoRegistered(acc) => Some(acc),
            Self::Unresolvable => None,
        }
    }

    pub fn into_account(self) -> Option<Account> {
        match self {
            Self::Found(acc) | Self::AutoRegistered(acc) => Some(acc),
            Self::Unresolvable => None,
        }
    }
}

/// What to try after the exact and substring lookups come up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Register a placeholder account named after the client.
    Register,
    /// Treat the client name as a numeric chat id.
    NumericId,
}

/// Resolve `client` to an account: exact username, then substring search,
/// then `fallback`.
///
/// A failing exact lookup is an error. A failing search is treated as no
/// match.
pub async fn resolve_account(
    repo: &dyn AccountRepository,
    client: &str,
    fallback: Fallback,
) -> Result<Resolution, PeerwardenError> {
    if let Some(acc) = repo.get_by_username(client).await? {
        return Ok(Resolution::Found(acc));
    }

    match repo.search(client).await {
        Ok(found) => {
            if let Some(acc) = found.into_iter().next() {
                return Ok(Resolution::Found(acc));
            }
        }
        Err(e) => debug!(client, error = %e, "account search failed, continuing"),
    }

    match fallback {
        Fallback::Register => {
            repo.register(None, Some(client)).await?;
            Ok(repo
                .get_by_username(client)
                .await?
                .map_or(Resolution::Unresolvable, Resolution::AutoRegistered))
        }
        Fallback::NumericId => {
            let Ok(user_id) = client.parse::<i64>() else {
                return Ok(Resolution::Unresolvable);
            };
            Ok(repo
                .get_by_user_id(user_id)
                .await?
                .map_or(Resolution::Unresolvable, Resolution::Found))
        }
    }
}

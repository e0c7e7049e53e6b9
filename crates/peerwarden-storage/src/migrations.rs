// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary with
//! `embed_migrations!` and applied whenever a database is opened.

use peerwarden_core::PeerwardenError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply every pending migration. Refinery records applied versions in
/// `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<usize, PeerwardenError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(PeerwardenError::storage)?;
    Ok(report.applied_migrations().len())
}

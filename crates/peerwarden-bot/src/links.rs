// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of install commands from provisioning script output.

const PRIMARY_PREFIX: &str = "wget -O - ";
const SECONDARY_PREFIX: &str = "curl -sL ";
const INSTALL_PREFIX: &str = "wget -O -";

/// Token-expiry markers and the word that replaces "token" when the line
/// is shown to the user.
const EXPIRY_MARKERS: &[(&str, &str, &str)] = &[
    ("Token valid until", "Token", "Link"),
    ("Токен действителен до", "Токен", "Ссылка"),
];

/// A download command plus the optional expiry notice that came with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub command: String,
    pub expiry: Option<String>,
}

fn is_init_script(line: &str) -> bool {
    line.contains("/init/") && line.contains(".sh")
}

/// Find the download command in `add` script output.
///
/// A `wget -O - ` line wins over a `curl -sL ` line, which is rewritten to
/// the `wget` form. Within each kind the first match wins.
pub fn extract_download_link(output: &str) -> Option<DownloadLink> {
    let mut primary = None;
    let mut secondary = None;
    let mut expiry = None;

    for line in output.lines().map(str::trim) {
        if primary.is_none() && line.contains(PRIMARY_PREFIX) && is_init_script(line) {
            primary = Some(line.to_string());
        }
        if secondary.is_none() && line.contains(SECONDARY_PREFIX) && is_init_script(line) {
            secondary = Some(line.replacen("curl -sL", "wget -O -", 1));
        }
        if expiry.is_none() {
            expiry = EXPIRY_MARKERS
                .iter()
                .find(|(marker, _, _)| line.contains(marker))
                .map(|(_, from, to)| line.replacen(from, to, 1));
        }
    }

    primary.or(secondary).map(|command| DownloadLink { command, expiry })
}

/// First trimmed line of `link` script output that is a `wget` install
/// command.
pub fn extract_install_command(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(INSTALL_PREFIX))
        .map(str::to_string)
}

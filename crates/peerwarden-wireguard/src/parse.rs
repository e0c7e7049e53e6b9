// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsers for `wg show` output and client config files.

use peerwarden_core::PeerStats;

/// Extracts the `PrivateKey` value from a client `.conf` file.
pub fn private_key(conf: &str) -> Option<String> {
    conf.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("PrivateKey"))
        .find_map(|line| line.split_once('=').map(|(_, v)| v.trim().to_string()))
        .filter(|key| !key.is_empty())
}

/// Stats for the peer with `public_key` in `wg show <iface>` output.
///
/// A peer that is missing from the output, or has no `latest handshake`
/// line, is reported as never connected.
pub fn peer_stats(wg_output: &str, public_key: &str) -> PeerStats {
    let mut in_peer = false;
    let mut handshake = None;
    let mut transfer = (0, 0);

    for line in wg_output.lines().map(str::trim) {
        if let Some(key) = line.strip_prefix("peer:") {
            if in_peer {
                break;
            }
            in_peer = key.trim() == public_key;
            continue;
        }
        if !in_peer {
            continue;
        }
        if line.starts_with("interface:") {
            break;
        }
        if let Some(rest) = line.strip_prefix("latest handshake:") {
            handshake = Some(handshake_secs(rest.trim()));
        } else if let Some(rest) = line.strip_prefix("transfer:") {
            transfer = transfer_bytes(rest.trim());
        }
    }

    match handshake {
        Some(secs) => PeerStats::from_handshake(Some(secs), transfer.0, transfer.1),
        None => PeerStats::never_connected(),
    }
}

/// Converts "1 day, 2 hours, 3 minutes, 4 seconds ago" to seconds.
///
/// Unrecognized parts count as zero, so "Now" is zero seconds.
pub fn handshake_secs(text: &str) -> u64 {
    text.split(',')
        .map(str::trim)
        .map(|part| {
            let value: u64 = part
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let unit = if part.contains("day") {
                86_400
            } else if part.contains("hour") {
                3_600
            } else if part.contains("minute") {
                60
            } else if part.contains("second") {
                1
            } else {
                0
            };
            value * unit
        })
        .sum()
}

/// Parses "1.50 MiB received, 300 KiB sent" into `(rx, tx)` bytes.
pub fn transfer_bytes(text: &str) -> (u64, u64) {
    let mut rx = 0;
    let mut tx = 0;
    for part in text.split(',').map(str::trim) {
        if part.contains("received") {
            rx = byte_count(part);
        } else if part.contains("sent") {
            tx = byte_count(part);
        }
    }
    (rx, tx)
}

/// Parses "<value> <unit>" where unit is B, KiB, MiB, GiB or TiB.
pub fn byte_count(text: &str) -> u64 {
    let mut fields = text.split_whitespace();
    let (Some(value), Some(unit)) = (fields.next(), fields.next()) else {
        return 0;
    };
    let Ok(value) = value.parse::<f64>() else {
        return 0;
    };
    let scale: f64 = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return 0,
    };
    (value * scale) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerwarden_core::PeerStatus;

    const WG_SHOW: &str = "\
interface: wg0
  public key: SERVERKEY=
  private key: (hidden)
  listening port: 51820

peer: ALICEKEY=
  preshared key: (hidden)
  endpoint: 203.0.113.4:40211
  allowed ips: 10.8.0.2/32
  latest handshake: 1 minute, 5 seconds ago
  transfer: 1.50 MiB received, 300.00 KiB sent

peer: BOBKEY=
  preshared key: (hidden)
  allowed ips: 10.8.0.3/32

peer: CAROLKEY=
  allowed ips: 10.8.0.4/32
  latest handshake: 2 days, 3 hours ago
  transfer: 2.00 GiB received, 12 B sent
";

    #[test]
    fn private_key_is_read_from_interface_section() {
        let conf = "[Interface]\nPrivateKey = abc123=\nAddress = 10.8.0.2/32\n\n[Peer]\nPublicKey = xyz\n";
        assert_eq!(private_key(conf).as_deref(), Some("abc123="));
    }

    #[test]
    fn private_key_missing_or_empty() {
        assert_eq!(private_key("[Interface]\nAddress = 10.8.0.2/32\n"), None);
        assert_eq!(private_key("PrivateKey =\n"), None);
    }

    #[test]
    fn recent_handshake_is_active() {
        let stats = peer_stats(WG_SHOW, "ALICEKEY=");
        assert_eq!(stats.status, PeerStatus::Active);
        assert_eq!(stats.last_handshake_secs, Some(65));
        assert_eq!(stats.rx_bytes, 1_572_864);
        assert_eq!(stats.tx_bytes, 307_200);
    }

    #[test]
    fn peer_without_handshake_never_connected() {
        let stats = peer_stats(WG_SHOW, "BOBKEY=");
        assert_eq!(stats.status, PeerStatus::NeverConnected);
        assert_eq!(stats.last_handshake_secs, None);
    }

    #[test]
    fn old_handshake_is_inactive() {
        let stats = peer_stats(WG_SHOW, "CAROLKEY=");
        assert_eq!(stats.status, PeerStatus::Inactive);
        assert_eq!(stats.last_handshake_secs, Some(2 * 86_400 + 3 * 3_600));
        assert_eq!(stats.tx_bytes, 12);
    }

    #[test]
    fn unknown_peer_never_connected() {
        assert_eq!(peer_stats(WG_SHOW, "MALLORY="), PeerStats::never_connected());
    }

    #[test]
    fn next_peer_section_ends_the_match() {
        // BOB has no handshake of its own; CAROL's must not leak into it.
        let stats = peer_stats(WG_SHOW, "BOBKEY=");
        assert_eq!(stats.rx_bytes, 0);
    }

    #[test]
    fn handshake_units() {
        assert_eq!(handshake_secs("45 seconds ago"), 45);
        assert_eq!(handshake_secs("1 hour, 1 second ago"), 3_601);
        assert_eq!(handshake_secs("Now"), 0);
    }

    #[test]
    fn byte_units() {
        assert_eq!(byte_count("512 B received"), 512);
        assert_eq!(byte_count("1 TiB"), 1 << 40);
        assert_eq!(byte_count("3 PiB"), 0);
        assert_eq!(byte_count("garbage"), 0);
    }
}

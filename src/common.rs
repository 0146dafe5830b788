use std::fmt;

use crate::error::WakeError;

pub const BROADCAST_MAC: [u8; 6] = [ 0xff, 0xff, 0xff, 0xff, 0xff, 0xff ];

/// Discard port, the conventional destination for WakeOnLan over UDP.
pub const WOL_PORT: u16 = 9;

pub const MAC_REPEAT: usize = 16;
pub const MAGIC_PACKET_LEN: usize = BROADCAST_MAC.len() + MAC_REPEAT * 6;


/// Lowercases `mac` and drops everything outside `[0-9a-f]`.
///
/// This is also the key the address book deduplicates on.
pub fn normalize_mac(mac: &str) -> String {
    mac.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| matches!(c, '0'..='9' | 'a'..='f'))
        .collect()
}

pub fn parse_mac(mac: &str) -> Option<[u8; 6]> {
    let hex = normalize_mac(mac);
    if hex.len() != 12 { return None; }

    let mut bytes = [0u8; 6];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(bytes)
}

/// The UDP payload of a wake request: sync stream followed by the target MAC 16 times.
#[derive(Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(mac: [u8; 6]) -> Self {
        let mut buf = [0u8; MAGIC_PACKET_LEN];
        buf[..6].copy_from_slice(&BROADCAST_MAC);
        for block in buf[6..].chunks_exact_mut(6) {
            block.copy_from_slice(&mac);
        }
        debug_assert!(check_wol_payload(&buf));
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn target(&self) -> [u8; 6] {
        wol_payload_get_target_mac(&self.0)
    }
}

impl fmt::Debug for MagicPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.target();
        write!(f, "MagicPacket({:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x})", m[0], m[1], m[2], m[3], m[4], m[5])
    }
}

pub fn encode_magic_packet(mac: &str) -> Result<MagicPacket, WakeError> {
    parse_mac(mac)
        .map(MagicPacket::new)
        .ok_or_else(|| WakeError::InvalidMacFormat(mac.to_string()))
}


pub fn check_wol_payload(payload: &[u8]) -> bool {
    if payload.len() < MAGIC_PACKET_LEN { return false; }

    let blocks: Vec<&[u8]> = payload[..MAGIC_PACKET_LEN].chunks(6).collect();
    if blocks[0] != BROADCAST_MAC {
        return false;
    }

    blocks[2..].iter().all(|block| *block == blocks[1])
}

/// Callers must have checked the payload with [`check_wol_payload`].
pub fn wol_payload_get_target_mac(payload: &[u8]) -> [u8; 6] {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&payload[6..12]);
    mac
}

pub mod common;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod iface;
pub mod store;

pub use common::{encode_magic_packet, normalize_mac, MagicPacket};
pub use dispatch::{send_wake, Dispatcher, WakeOutcome, WakeReport};
pub use error::{StoreError, WakeError};
pub use iface::{survey_interfaces, BroadcastTarget, NetworkInterface};

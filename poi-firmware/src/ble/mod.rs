//! BLE ingress: GATT service definition and per-connection session

pub mod server;
pub mod session;

pub use server::{advertising_data, PoiServer, ReplyValue};
pub use session::{LinkSession, WriteOutcome};

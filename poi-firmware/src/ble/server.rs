//! Poi GATT service
//!
//! A Nordic-UART-style service: the peer writes commands, sub-frames and
//! upload chunks to RX, reads the last reply from TX, and can subscribe to
//! the same replies on Notify.

use trouble_host::prelude::*;
use trouble_host::types::gatt_traits::{AsGatt, FromGatt, FromGattError};

use poi_protocol::command::MAX_REPLY_LEN;
use poi_protocol::MAX_CHUNK_LEN;

/// Service UUID in advertising byte order
const SERVICE_UUID_LE: [u8; 16] = [
    0x9e, 0xca, 0xdc, 0x24, 0x0e, 0xe5, 0xa9, 0xe0, 0x93, 0xf3, 0xa3, 0xb5, 0x01, 0x00, 0x40, 0x6e,
];

/// Backing store for the RX characteristic
///
/// Writes are handled from the event, so this only has to be large enough
/// for the attribute server to accept a full-MTU write.
#[derive(Clone, Copy)]
pub struct RxBuffer([u8; MAX_CHUNK_LEN]);

impl Default for RxBuffer {
    fn default() -> Self {
        Self([0u8; MAX_CHUNK_LEN])
    }
}

impl AsGatt for RxBuffer {
    const MIN_SIZE: usize = 0;
    const MAX_SIZE: usize = MAX_CHUNK_LEN;

    fn as_gatt(&self) -> &[u8] {
        &self.0
    }
}

impl FromGatt for RxBuffer {
    fn from_gatt(data: &[u8]) -> Result<Self, FromGattError> {
        if data.len() > MAX_CHUNK_LEN {
            return Err(FromGattError::InvalidLength);
        }
        let mut buf = [0u8; MAX_CHUNK_LEN];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self(buf))
    }
}

/// An encoded reply as a variable-length characteristic value
#[derive(Clone, Copy, Default)]
pub struct ReplyValue {
    bytes: [u8; MAX_REPLY_LEN],
    len: usize,
}

impl ReplyValue {
    pub fn new(reply: &[u8]) -> Self {
        let len = reply.len().min(MAX_REPLY_LEN);
        let mut bytes = [0u8; MAX_REPLY_LEN];
        bytes[..len].copy_from_slice(&reply[..len]);
        Self { bytes, len }
    }
}

impl AsGatt for ReplyValue {
    const MIN_SIZE: usize = 0;
    const MAX_SIZE: usize = MAX_REPLY_LEN;

    fn as_gatt(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl FromGatt for ReplyValue {
    fn from_gatt(data: &[u8]) -> Result<Self, FromGattError> {
        if data.len() > MAX_REPLY_LEN {
            return Err(FromGattError::InvalidLength);
        }
        Ok(Self::new(data))
    }
}

#[gatt_service(uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e")]
pub struct PoiService {
    /// Commands, stream sub-frames and upload chunks
    #[descriptor(uuid = "2901", read, value = "RX")]
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-e50e24dcca9e", write, write_without_response)]
    pub rx: RxBuffer,

    /// Last reply
    #[descriptor(uuid = "2901", read, value = "TX")]
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-e50e24dcca9e", read)]
    pub tx: ReplyValue,

    /// Replies as notifications
    #[descriptor(uuid = "2901", read, value = "Notify")]
    #[characteristic(uuid = "6e400004-b5a3-f393-e0a9-e50e24dcca9e", read, notify)]
    pub notify: ReplyValue,
}

#[gatt_server]
pub struct PoiServer {
    pub poi: PoiService,
}

/// Encode advertising and scan response data
///
/// The service UUID goes in the advertisement and the name in the scan
/// response, since both do not fit in 31 bytes. Returns the used lengths.
pub fn advertising_data(
    name: &str,
    adv: &mut [u8; 31],
    scan: &mut [u8; 31],
) -> Result<(usize, usize), trouble_host::Error> {
    let adv_len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::ServiceUuids128(&[SERVICE_UUID_LE]),
        ],
        &mut adv[..],
    )?;
    let scan_len = AdStructure::encode_slice(
        &[AdStructure::CompleteLocalName(name.as_bytes())],
        &mut scan[..],
    )?;
    Ok((adv_len, scan_len))
}

//! Control command envelope and replies
//!
//! Every control write starts with [`ENVELOPE_START`] followed by a
//! [`CommandCode`]. Replies use the same envelope with code 0 (success) or
//! 1 (error), except for the firmware and configuration queries which have
//! their own fixed records.

use crate::frame::FRAME_SYNC;

/// First byte of every command and reply
pub const ENVELOPE_START: u8 = 0xD0;

/// Length of the `[D0][code]` envelope
pub const ENVELOPE_LEN: usize = 2;

/// Number of entries in the brightness and speed preset tables
pub const PRESET_COUNT: usize = 6;

/// Firmware version reported to the app, major/minor
pub const FIRMWARE_VERSION: [u8; 2] = [0x09, 0x02];

/// Longest reply record
pub const MAX_REPLY_LEN: usize = 12;

/// Command codes understood by the poi
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandCode {
    Success = 0,
    Error = 1,
    SetBrightness = 2,
    SetSpeed = 3,
    SetPattern = 4,
    SetPatternSlot = 5,
    SetPatternAll = 6,
    SetBank = 7,
    SetBankAll = 8,
    GetFwVersion = 9,
    SetHardwareVersion = 10,
    SetLedType = 11,
    SetLedCount = 12,
    SetDeviceName = 13,
    SetSequencer = 14,
    StartSequencer = 15,
    SetBrightnessOption = 16,
    SetBrightnessOptions = 17,
    SetSpeedOption = 18,
    SetSpeedOptions = 19,
    SetShuffleDuration = 20,
    StartStream = 21,
    StopStream = 22,
    GetConfig = 23,
    StreamData = 24,
}

impl CommandCode {
    /// Convert from a wire byte
    pub fn from_u8(value: u8) -> Option<Self> {
        use CommandCode::*;
        Some(match value {
            0 => Success,
            1 => Error,
            2 => SetBrightness,
            3 => SetSpeed,
            4 => SetPattern,
            5 => SetPatternSlot,
            6 => SetPatternAll,
            7 => SetBank,
            8 => SetBankAll,
            9 => GetFwVersion,
            10 => SetHardwareVersion,
            11 => SetLedType,
            12 => SetLedCount,
            13 => SetDeviceName,
            14 => SetSequencer,
            15 => StartSequencer,
            16 => SetBrightnessOption,
            17 => SetBrightnessOptions,
            18 => SetSpeedOption,
            19 => SetSpeedOptions,
            20 => SetShuffleDuration,
            21 => StartStream,
            22 => StopStream,
            23 => GetConfig,
            24 => StreamData,
            _ => return None,
        })
    }

    /// Wire byte for this code
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Peek at a write and return its command code, if it carries an envelope
    pub fn peek(data: &[u8]) -> Option<Self> {
        match data {
            [ENVELOPE_START, code, ..] => Self::from_u8(*code),
            _ => None,
        }
    }
}

/// Command parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Write shorter than the envelope
    TooShort,
    /// First byte is not [`ENVELOPE_START`]
    MissingEnvelope,
    /// Code byte not in [`CommandCode`]
    UnknownCode(u8),
    /// Command needs an argument that was not sent
    MissingArgument(CommandCode),
    /// Argument out of range
    InvalidArgument(CommandCode),
}

/// What a `StartStream` write carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStart<'a> {
    /// Bare command: enter streaming at the default rate
    Default,
    /// Two argument bytes: requested frame rate in Hz
    Rate(u16),
    /// Sub-frame bytes to hand to the reassembler
    Frames(&'a [u8]),
}

/// A parsed control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    SetBrightness(u8),
    SetSpeed,
    /// First chunk of a pattern upload; body excludes the envelope
    SetPattern(&'a [u8]),
    SetPatternSlot(u8),
    /// Toggle shuffling through the slots of the current bank
    ToggleSlotShuffle,
    SetBank(u8),
    /// Toggle shuffling across every bank
    ToggleBankShuffle,
    GetFwVersion,
    SetBrightnessOption(u8),
    SetBrightnessOptions([u8; PRESET_COUNT]),
    SetSpeedOption(u8),
    SetSpeedOptions([u8; PRESET_COUNT]),
    /// Shuffle period in whole seconds
    SetShuffleDuration(u8),
    StartStream(StreamStart<'a>),
    StopStream,
    GetConfig,
    /// Whole fixed-size frames, envelope stripped
    StreamData(&'a [u8]),
    /// Recognised but has no effect on this hardware
    Ignored(CommandCode),
}

impl<'a> Command<'a> {
    /// Parse a command write
    pub fn parse(data: &'a [u8]) -> Result<Self, CommandError> {
        if data.len() < ENVELOPE_LEN {
            return Err(CommandError::TooShort);
        }
        if data[0] != ENVELOPE_START {
            return Err(CommandError::MissingEnvelope);
        }
        let code = CommandCode::from_u8(data[1]).ok_or(CommandError::UnknownCode(data[1]))?;
        let args = &data[ENVELOPE_LEN..];
        let first = || args.first().copied().ok_or(CommandError::MissingArgument(code));

        let command = match code {
            CommandCode::SetBrightness => Command::SetBrightness(first()?),
            CommandCode::SetSpeed => Command::SetSpeed,
            CommandCode::SetPattern => Command::SetPattern(args),
            CommandCode::SetPatternSlot => Command::SetPatternSlot(first()?),
            CommandCode::SetPatternAll => Command::ToggleSlotShuffle,
            CommandCode::SetBank => Command::SetBank(first()?),
            CommandCode::SetBankAll => Command::ToggleBankShuffle,
            CommandCode::GetFwVersion => Command::GetFwVersion,
            CommandCode::SetBrightnessOption => {
                Command::SetBrightnessOption(preset_index(code, first()?)?)
            }
            CommandCode::SetBrightnessOptions => {
                Command::SetBrightnessOptions(preset_table(code, args)?)
            }
            CommandCode::SetSpeedOption => Command::SetSpeedOption(preset_index(code, first()?)?),
            CommandCode::SetSpeedOptions => Command::SetSpeedOptions(preset_table(code, args)?),
            CommandCode::SetShuffleDuration => Command::SetShuffleDuration(first()?),
            CommandCode::StartStream => Command::StartStream(stream_start(args)),
            CommandCode::StopStream => Command::StopStream,
            CommandCode::GetConfig => Command::GetConfig,
            CommandCode::StreamData => Command::StreamData(args),
            CommandCode::Success
            | CommandCode::Error
            | CommandCode::SetHardwareVersion
            | CommandCode::SetLedType
            | CommandCode::SetLedCount
            | CommandCode::SetDeviceName
            | CommandCode::SetSequencer
            | CommandCode::StartSequencer => Command::Ignored(code),
        };
        Ok(command)
    }
}

fn preset_index(code: CommandCode, index: u8) -> Result<u8, CommandError> {
    if (index as usize) < PRESET_COUNT {
        Ok(index)
    } else {
        Err(CommandError::InvalidArgument(code))
    }
}

fn preset_table(code: CommandCode, args: &[u8]) -> Result<[u8; PRESET_COUNT], CommandError> {
    args.get(..PRESET_COUNT)
        .and_then(|s| s.try_into().ok())
        .ok_or(CommandError::MissingArgument(code))
}

fn stream_start(args: &[u8]) -> StreamStart<'_> {
    match args {
        [] => StreamStart::Default,
        [hi, lo] if [*hi, *lo] != FRAME_SYNC => StreamStart::Rate(u16::from_be_bytes([*hi, *lo])),
        _ => StreamStart::Frames(args),
    }
}

/// Fixed-size encoded reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyBytes {
    buf: [u8; MAX_REPLY_LEN],
    len: usize,
}

impl ReplyBytes {
    fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; MAX_REPLY_LEN];
        let len = bytes.len().min(MAX_REPLY_LEN);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { buf, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Device status record returned for `GetConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigReply {
    /// Physical pixels on the strip
    pub pixel_count: u8,
    /// Sub-frame protocol version
    pub protocol_version: u8,
    /// Frames the stream ring can hold
    pub buffer_capacity: u16,
    /// Highest stream rate the hardware accepts, Hz
    pub hw_limit: u16,
    /// Battery voltage in millivolts
    pub battery_mv: u16,
    /// Free pattern storage in KiB, if known
    pub free_kb: Option<u16>,
}

impl ConfigReply {
    fn encode(&self) -> ReplyBytes {
        let cap = self.buffer_capacity.to_be_bytes();
        let limit = self.hw_limit.to_be_bytes();
        let battery = self.battery_mv.to_be_bytes();
        let free = self.free_kb.unwrap_or(0).to_be_bytes();
        let record = [
            ENVELOPE_START,
            CommandCode::GetConfig.as_u8(),
            self.pixel_count,
            self.protocol_version,
            cap[0],
            cap[1],
            limit[0],
            limit[1],
            battery[0],
            battery[1],
            free[0],
            free[1],
        ];
        let len = if self.free_kb.is_some() { 12 } else { 10 };
        ReplyBytes::from_slice(&record[..len])
    }
}

/// Replies published on the TX characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Success,
    Error,
    FirmwareVersion,
    Config(ConfigReply),
}

impl Reply {
    /// Encode to wire bytes
    pub fn encode(&self) -> ReplyBytes {
        match self {
            Reply::Success => ReplyBytes::from_slice(&[ENVELOPE_START, 0x00, 0x01]),
            Reply::Error => ReplyBytes::from_slice(&[ENVELOPE_START, 0x01, 0x01]),
            Reply::FirmwareVersion => ReplyBytes::from_slice(&[
                ENVELOPE_START,
                0x00,
                0x06,
                FIRMWARE_VERSION[0],
                FIRMWARE_VERSION[1],
                0xD1,
            ]),
            Reply::Config(config) => config.encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for byte in 0..=24u8 {
            let code = CommandCode::from_u8(byte).unwrap();
            assert_eq!(code.as_u8(), byte);
        }
        assert!(CommandCode::from_u8(25).is_none());
    }

    #[test]
    fn test_peek() {
        assert_eq!(CommandCode::peek(&[0xD0, 0x15]), Some(CommandCode::StartStream));
        assert_eq!(CommandCode::peek(&[0xD0, 0x99]), None);
        assert_eq!(CommandCode::peek(&[0x01, 0x02]), None);
        assert_eq!(CommandCode::peek(&[0xD0]), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse(&[0xD0]), Err(CommandError::TooShort));
        assert_eq!(Command::parse(&[0x00, 0x02]), Err(CommandError::MissingEnvelope));
        assert_eq!(Command::parse(&[0xD0, 0x40]), Err(CommandError::UnknownCode(0x40)));
        assert_eq!(
            Command::parse(&[0xD0, 0x02]),
            Err(CommandError::MissingArgument(CommandCode::SetBrightness))
        );
    }

    #[test]
    fn test_parse_brightness_option() {
        assert_eq!(
            Command::parse(&[0xD0, 16, 3, 0xD1]),
            Ok(Command::SetBrightnessOption(3))
        );
        assert_eq!(
            Command::parse(&[0xD0, 16, 6]),
            Err(CommandError::InvalidArgument(CommandCode::SetBrightnessOption))
        );
    }

    #[test]
    fn test_parse_preset_tables() {
        assert_eq!(
            Command::parse(&[0xD0, 19, 1, 2, 3, 4, 5, 6]),
            Ok(Command::SetSpeedOptions([1, 2, 3, 4, 5, 6]))
        );
        assert_eq!(
            Command::parse(&[0xD0, 17, 1, 2, 3]),
            Err(CommandError::MissingArgument(CommandCode::SetBrightnessOptions))
        );
    }

    #[test]
    fn test_parse_start_stream_variants() {
        assert_eq!(
            Command::parse(&[0xD0, 21]),
            Ok(Command::StartStream(StreamStart::Default))
        );
        assert_eq!(
            Command::parse(&[0xD0, 21, 0x01, 0xF4]),
            Ok(Command::StartStream(StreamStart::Rate(500)))
        );
        let packet = [0xD0, 21, 0xD0, 0x0D, 0x01, 0x14];
        assert_eq!(
            Command::parse(&packet),
            Ok(Command::StartStream(StreamStart::Frames(&packet[2..])))
        );
        // A lone sync marker is stream data, not a rate
        assert_eq!(
            Command::parse(&[0xD0, 21, 0xD0, 0x0D]),
            Ok(Command::StartStream(StreamStart::Frames(&[0xD0, 0x0D])))
        );
    }

    #[test]
    fn test_parse_upload_start_strips_envelope() {
        let write = [0xD0, 0x04, 20, 0x00, 0x10, 1, 2, 3];
        assert_eq!(Command::parse(&write), Ok(Command::SetPattern(&write[2..])));
    }

    #[test]
    fn test_parse_ignored_codes() {
        assert_eq!(
            Command::parse(&[0xD0, 13, b'p', b'o', b'i']),
            Ok(Command::Ignored(CommandCode::SetDeviceName))
        );
    }

    #[test]
    fn test_fixed_replies() {
        assert_eq!(Reply::Success.encode().as_slice(), &[0xD0, 0x00, 0x01]);
        assert_eq!(Reply::Error.encode().as_slice(), &[0xD0, 0x01, 0x01]);
        assert_eq!(
            Reply::FirmwareVersion.encode().as_slice(),
            &[0xD0, 0x00, 0x06, 0x09, 0x02, 0xD1]
        );
    }

    #[test]
    fn test_config_reply_layout() {
        let mut config = ConfigReply {
            pixel_count: 20,
            protocol_version: 1,
            buffer_capacity: 150,
            hw_limit: 500,
            battery_mv: 3987,
            free_kb: Some(512),
        };
        assert_eq!(
            Reply::Config(config).encode().as_slice(),
            &[0xD0, 23, 20, 1, 0x00, 150, 0x01, 0xF4, 0x0F, 0x93, 0x02, 0x00]
        );

        config.free_kb = None;
        assert_eq!(Reply::Config(config).encode().as_slice().len(), 10);
    }
}

//! Minimal TOML reader for `poi.toml`
//!
//! Handles only the subset the board file uses. It does NOT support the
//! full TOML grammar.
//!
//! Supported features:
//! - `[section]` headers
//! - `key = value` pairs (string, integer, boolean)
//! - Comments (`# ...`), including trailing ones
//!
//! Unknown sections and keys are skipped so older firmware can boot with a
//! newer file.

use heapless::String;

use super::types::{ConfigError, PoiConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Malformed section header
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// String longer than its field
    TooLong,
    /// Parsed fine but failed validation
    Invalid(ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Strip,
    Button,
    Stream,
    Battery,
    Ble,
    Unknown,
}

/// Parse `poi.toml` text into a validated [`PoiConfig`]
///
/// Keys that are absent keep their default values.
pub fn parse_config(input: &str) -> Result<PoiConfig, ParseError> {
    let mut config = PoiConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line)?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    config.validate().map_err(ParseError::Invalid)?;
    Ok(config)
}

fn parse_section_header(line: &str) -> Result<Section, ParseError> {
    let name = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or(ParseError::InvalidSection)?
        .trim();

    Ok(match name {
        "strip" => Section::Strip,
        "button" => Section::Button,
        "stream" => Section::Stream,
        "battery" => Section::Battery,
        "ble" => Section::Ble,
        "" => return Err(ParseError::InvalidSection),
        _ => Section::Unknown,
    })
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Trailing comment, unless the # sits inside a string
    let value = match value.find('#') {
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut PoiConfig,
) -> Result<(), ParseError> {
    match (section, key) {
        (Section::Strip, "pixels") => config.strip.pixels = parse_int(value)?,

        (Section::Button, "inverted") => config.button.inverted = parse_bool(value)?,
        (Section::Button, "pull_up") => config.button.pull_up = parse_bool(value)?,
        (Section::Button, "long_press_ms") => config.button.long_press_ms = parse_int(value)?,
        (Section::Button, "menu_quiet_ms") => config.button.menu_quiet_ms = parse_int(value)?,

        (Section::Stream, "default_rate_hz") => config.stream.default_rate_hz = parse_int(value)?,
        (Section::Stream, "max_rate_hz") => config.stream.max_rate_hz = parse_int(value)?,
        (Section::Stream, "watchdog_ms") => config.stream.watchdog_ms = parse_int(value)?,
        (Section::Stream, "verify_checksum") => {
            config.stream.verify_checksum = parse_bool(value)?
        }

        (Section::Battery, "divider_x1000") => config.battery.divider_x1000 = parse_int(value)?,
        (Section::Battery, "interval_s") => config.battery.interval_s = parse_int(value)?,

        (Section::Ble, "device_name") => {
            let mut name = String::new();
            name.push_str(parse_string(value))
                .map_err(|_| ParseError::TooLong)?;
            config.device_name = name;
        }

        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Poi board file
[strip]
pixels = 36   # two strips of 18

[button]
inverted = true
long_press_ms = 1200

[stream]
default_rate_hz = 250
verify_checksum = false

[ble]
device_name = "Poi #2"

[future]
sparkle = 3
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.strip.pixels, 36);
        assert_eq!(config.button.long_press_ms, 1200);
        assert_eq!(config.button.menu_quiet_ms, 1000);
        assert_eq!(config.stream.default_rate_hz, 250);
        assert!(!config.stream.verify_checksum);
        assert_eq!(config.device_name.as_str(), "Poi #2");
    }

    #[test]
    fn test_empty_input_is_default() {
        assert_eq!(parse_config("").unwrap(), PoiConfig::default());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("a = 1"), Some(("a", "1")));
        assert_eq!(parse_key_value("a = 1 # note"), Some(("a", "1")));
        assert_eq!(parse_key_value("name = \"x#y\""), Some(("name", "\"x#y\"")));
        assert_eq!(parse_key_value("a ="), None);
        assert_eq!(parse_key_value("no equals"), None);
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(
            parse_config("[strip]\npixels = lots"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[stream]\nverify_checksum = yes"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(parse_config("[strip\n"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_name_too_long() {
        assert_eq!(
            parse_config("[ble]\ndevice_name = \"a name that is far too long\""),
            Err(ParseError::TooLong)
        );
    }

    #[test]
    fn test_validation_applies() {
        assert!(matches!(
            parse_config("[strip]\npixels = 200"),
            Err(ParseError::Invalid(_))
        ));
    }
}

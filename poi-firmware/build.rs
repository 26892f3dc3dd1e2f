//! Build script for poi-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates poi.toml at compile time
//! - Emits the strip length as a constant for the LED driver buffer

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Upper bound on strip length, matches the protocol's row limit
const MAX_PIXELS: i64 = 144;
const MAX_RATE_HZ: i64 = 500;
const MAX_NAME_LEN: usize = 16;

fn main() {
    setup_linker();
    let config = validate_config();
    write_strip_constants(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate poi.toml and return the parsed document
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=poi.toml");

    let config_path = Path::new("poi.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: poi.toml not found!                                      ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds poi.toml as its board configuration.        ║\n\
            ║  Please create one in the poi-firmware directory.                ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read poi.toml                                  ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in poi.toml                          ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_strip(&config, &mut errors);
    validate_stream(&config, &mut errors);
    validate_battery(&config, &mut errors);
    validate_ble(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid values in poi.toml                               ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors.join("\n"))
        );
    }

    println!("cargo:warning=poi.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn int_in(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> Option<i64> {
    let value = config.get(section).and_then(|s| s.get(key))?;
    match value.as_integer() {
        Some(v) if range.contains(&v) => Some(v),
        Some(v) => {
            errors.push(format!(
                "[{}] {} = {} is outside {}..={}",
                section,
                key,
                v,
                range.start(),
                range.end()
            ));
            None
        }
        None => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            None
        }
    }
}

fn validate_strip(config: &toml::Value, errors: &mut Vec<String>) {
    if config.get("strip").and_then(|s| s.get("pixels")).is_none() {
        errors.push("[strip] pixels is required".to_string());
        return;
    }
    int_in(config, "strip", "pixels", 1..=MAX_PIXELS, errors);
}

fn validate_stream(config: &toml::Value, errors: &mut Vec<String>) {
    let max =
        int_in(config, "stream", "max_rate_hz", 1..=MAX_RATE_HZ, errors).unwrap_or(MAX_RATE_HZ);
    int_in(config, "stream", "default_rate_hz", 1..=max, errors);
    int_in(config, "stream", "watchdog_ms", 1..=60_000, errors);
}

fn validate_battery(config: &toml::Value, errors: &mut Vec<String>) {
    int_in(config, "battery", "divider_x1000", 1000..=u16::MAX as i64, errors);
    int_in(config, "battery", "interval_s", 1..=3600, errors);
}

fn validate_ble(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(name) = config.get("ble").and_then(|s| s.get("device_name")) else {
        return;
    };
    match name.as_str() {
        Some(n) if n.is_empty() => errors.push("[ble] device_name must not be empty".to_string()),
        Some(n) if n.len() > MAX_NAME_LEN => errors.push(format!(
            "[ble] device_name is {} bytes, max {}",
            n.len(),
            MAX_NAME_LEN
        )),
        Some(_) => {}
        None => errors.push("[ble] device_name must be a string".to_string()),
    }
}

/// Write `strip.rs` with the pixel count used to size the LED driver
fn write_strip_constants(config: &toml::Value) {
    let pixels = config
        .get("strip")
        .and_then(|s| s.get("pixels"))
        .and_then(|v| v.as_integer())
        .unwrap_or(1);

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("strip.rs")).unwrap();
    writeln!(f, "/// Strip length from poi.toml").unwrap();
    writeln!(f, "pub const STRIP_PIXELS: usize = {};", pixels).unwrap();
}

//! Build script for radiopanel-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates panel.toml at compile time
//! - Generates the `PANEL_CONFIG` constant from panel.toml

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Longest USB string accepted; the descriptor holds 2 + 2 * 30 bytes
const MAX_STRING_LEN: usize = 30;

/// Upper bound of a displayed value (six digits)
const VALUE_MAX: i64 = 999_999;

fn main() {
    setup_linker();
    let config = validate_config();
    generate_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate panel.toml configuration at compile time
fn validate_config() -> toml::Value {
    // Re-run if panel.toml changes
    println!("cargo:rerun-if-changed=panel.toml");

    let config_path = Path::new("panel.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: panel.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a panel.toml configuration file.          ║\n\
            ║  Please create one in the radiopanel-firmware directory.         ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read panel.toml                                ║\n\
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
                ║  ERROR: Invalid TOML syntax in panel.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_panel(&config);
    validate_display(&config);
    validate_usb(&config);

    println!("cargo:warning=panel.toml validated successfully");
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

/// Panic with every collected error if there are any
fn fail_on_errors(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Fetch `[section]` as a table; a missing section means all defaults
fn section<'a>(
    config: &'a toml::Value,
    name: &str,
    errors: &mut Vec<String>,
) -> Option<&'a toml::map::Map<String, toml::Value>> {
    match config.get(name) {
        Some(toml::Value::Table(t)) => Some(t),
        Some(_) => {
            errors.push(format!("[{}] must be a table", name));
            None
        }
        None => None,
    }
}

/// Check an optional integer key against an inclusive range
fn check_integer(
    table: &toml::map::Map<String, toml::Value>,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        Some(toml::Value::Integer(v)) => {
            if *v < min || *v > max {
                errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
            }
        }
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
        None => {}
    }
}

/// Check an optional string key for a short ASCII USB string
fn check_string(
    table: &toml::map::Map<String, toml::Value>,
    section: &str,
    key: &str,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        Some(toml::Value::String(s)) => {
            if !s.is_ascii() {
                errors.push(format!("[{}] {} must be ASCII", section, key));
            }
            if s.is_empty() || s.len() > MAX_STRING_LEN {
                errors.push(format!(
                    "[{}] {} must be 1-{} characters",
                    section, key, MAX_STRING_LEN
                ));
            }
        }
        Some(_) => errors.push(format!("[{}] {} must be a string", section, key)),
        None => {}
    }
}

fn check_unknown_keys(
    table: &toml::map::Map<String, toml::Value>,
    section: &str,
    known: &[&str],
    errors: &mut Vec<String>,
) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            errors.push(format!("[{}] unknown key '{}'", section, key));
        }
    }
}

const PANEL_KEYS: &[&str] = &[
    "active",
    "standby",
    "coarse_step",
    "fine_step",
    "swap_key",
    "decimals_key",
];

const DISPLAY_KEYS: &[&str] = &[
    "scan_limit",
    "intensity",
    "digit_type",
    "decode_mode",
    "port_config",
    "key_mask",
];

const USB_KEYS: &[&str] = &[
    "vendor_id",
    "product_id",
    "release",
    "manufacturer",
    "product",
    "max_power_ma",
    "poll_interval_ms",
];

/// Validate the [panel] section
fn validate_panel(config: &toml::Value) {
    let mut errors = Vec::new();

    if let Some(panel) = section(config, "panel", &mut errors) {
        check_unknown_keys(panel, "panel", PANEL_KEYS, &mut errors);
        check_integer(panel, "panel", "active", 0, VALUE_MAX, &mut errors);
        check_integer(panel, "panel", "standby", 0, VALUE_MAX, &mut errors);
        check_integer(panel, "panel", "coarse_step", 1, VALUE_MAX, &mut errors);
        check_integer(panel, "panel", "fine_step", 1, VALUE_MAX, &mut errors);
        check_integer(panel, "panel", "swap_key", 0, 0xFF, &mut errors);
        check_integer(panel, "panel", "decimals_key", 0, 0xFF, &mut errors);

        for key in ["swap_key", "decimals_key"] {
            if let Some(toml::Value::Integer(mask)) = panel.get(key) {
                if *mask == 0 {
                    errors.push(format!("[panel] {} must select at least one key", key));
                }
            }
        }
    }

    fail_on_errors("Invalid [panel] configuration", &errors);
}

/// Validate the [display] section
fn validate_display(config: &toml::Value) {
    let mut errors = Vec::new();

    if let Some(display) = section(config, "display", &mut errors) {
        check_unknown_keys(display, "display", DISPLAY_KEYS, &mut errors);
        check_integer(display, "display", "scan_limit", 0, 7, &mut errors);
        check_integer(display, "display", "intensity", 0, 15, &mut errors);
        check_integer(display, "display", "digit_type", 0, 0xFF, &mut errors);
        check_integer(display, "display", "decode_mode", 0, 0xFF, &mut errors);
        check_integer(display, "display", "port_config", 0, 0xFF, &mut errors);
        check_integer(display, "display", "key_mask", 0, 0xFF, &mut errors);
    }

    // the swap key only works if it raises the IRQ line
    let swap_key = lookup(config, "panel", "swap_key").unwrap_or(0x02);
    let key_mask = lookup(config, "display", "key_mask").unwrap_or(0x02);
    if swap_key & key_mask == 0 {
        errors.push("[display] key_mask must include [panel] swap_key".to_string());
    }

    fail_on_errors("Invalid [display] configuration", &errors);
}

/// Validate the [usb] section
fn validate_usb(config: &toml::Value) {
    let mut errors = Vec::new();

    if let Some(usb) = section(config, "usb", &mut errors) {
        check_unknown_keys(usb, "usb", USB_KEYS, &mut errors);
        check_integer(usb, "usb", "vendor_id", 0, 0xFFFF, &mut errors);
        check_integer(usb, "usb", "product_id", 0, 0xFFFF, &mut errors);
        check_integer(usb, "usb", "release", 0, 0xFFFF, &mut errors);
        check_string(usb, "usb", "manufacturer", &mut errors);
        check_string(usb, "usb", "product", &mut errors);
        check_integer(usb, "usb", "max_power_ma", 2, 500, &mut errors);
        check_integer(usb, "usb", "poll_interval_ms", 1, 255, &mut errors);

        if let Some(toml::Value::Integer(ma)) = usb.get("max_power_ma") {
            if ma % 2 != 0 {
                errors.push("[usb] max_power_ma must be even".to_string());
            }
        }
    }

    fail_on_errors("Invalid [usb] configuration", &errors);
}

fn lookup(config: &toml::Value, section: &str, key: &str) -> Option<i64> {
    config.get(section)?.get(key)?.as_integer()
}

/// Write `PANEL_CONFIG` into OUT_DIR
///
/// Only the keys present in panel.toml are emitted; the rest come from
/// the `DEFAULT` constants through struct update syntax.
fn generate_config(config: &toml::Value) {
    let panel = fields(config, "panel", PANEL_KEYS);
    let display = fields(config, "display", DISPLAY_KEYS);
    let usb = fields(config, "usb", USB_KEYS);

    let source = format!(
        "// Generated by build.rs from panel.toml\n\
         \n\
         pub const PANEL_CONFIG: ::radiopanel_core::config::PanelConfig =\n\
         \x20   ::radiopanel_core::config::PanelConfig {{\n\
         \x20       panel: ::radiopanel_core::config::PanelSettings {{\n\
         {panel}\
         \x20           ..::radiopanel_core::config::PanelSettings::DEFAULT\n\
         \x20       }},\n\
         \x20       display: ::radiopanel_core::config::DisplaySetup {{\n\
         {display}\
         \x20           ..::radiopanel_core::config::DisplaySetup::DEFAULT\n\
         \x20       }},\n\
         \x20       usb: ::radiopanel_protocol::UsbIdentity {{\n\
         {usb}\
         \x20           ..::radiopanel_protocol::UsbIdentity::DEFAULT\n\
         \x20       }},\n\
         \x20   }};\n"
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("panel_config.rs"), source).unwrap();
}

/// Render the keys of `[section]` as struct field initializers
fn fields(config: &toml::Value, section: &str, keys: &[&str]) -> String {
    let Some(table) = config.get(section).and_then(|s| s.as_table()) else {
        return String::new();
    };

    keys.iter()
        .filter_map(|key| {
            let value = match table.get(*key)? {
                toml::Value::Integer(v) => v.to_string(),
                toml::Value::String(s) => format!("{:?}", s),
                // rejected during validation
                _ => return None,
            };
            Some(format!("            {}: {},\n", key, value))
        })
        .collect()
}

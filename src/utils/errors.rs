//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common startup failures.

use std::fmt::Write;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    // Match on the whole chain; context strings carry the device paths
    let error_msg = format!("{:#}", error);

    if error_msg.contains("uinput") {
        format_uinput_error(&mut output);
    } else if error_msg.contains("i2c") || error_msg.contains("Bus error") {
        format_bus_error(&mut output);
    } else if error_msg.contains("socket") {
        format_socket_error(&mut output);
    } else if error_msg.contains("config") {
        format_config_error(&mut output);
    } else {
        format_generic_error(&mut output);
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: picocalc-kbd -vvv"
    )
    .ok();
    writeln!(&mut output, "  - Try --dry-run to test the bus without uinput").ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_uinput_error(output: &mut String) {
    writeln!(output, "Virtual Input Device Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not create the virtual keyboard through uinput.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. uinput module not loaded").ok();
    writeln!(output, "     → Run: sudo modprobe uinput").ok();
    writeln!(output).ok();
    writeln!(output, "  2. No write access to /dev/uinput").ok();
    writeln!(output, "     → Run as root, or add a udev rule granting your group access").ok();
}

fn format_bus_error(output: &mut String) {
    writeln!(output, "Keyboard Controller Bus Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not talk to the keyboard controller over I2C.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. I2C adapter not enabled").ok();
    writeln!(output, "     → Check: ls /dev/i2c-*").ok();
    writeln!(output, "     → Run: sudo modprobe i2c-dev").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Wrong bus or address").ok();
    writeln!(output, "     → Check: i2cdetect -y <bus> (controller answers at 0x1f)").ok();
    writeln!(output, "     → Override with --device and --address").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Kernel driver already bound to the controller").ok();
    writeln!(output, "     → Unload it: sudo rmmod picocalc_kbd").ok();
}

fn format_socket_error(output: &mut String) {
    writeln!(output, "Control Socket Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not set up the control socket.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Make sure the socket directory exists and is writable").ok();
    writeln!(output, "  → Use --socket to pick another path, or disable [control]").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "The configuration file could not be loaded.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Check TOML syntax and value ranges").ok();
    writeln!(output, "  → Address must be within 0x03-0x77").ok();
    writeln!(output, "  → Poll period and mouse threshold must be non-zero").ok();
}

fn format_generic_error(output: &mut String) {
    writeln!(output, "An error occurred while starting the keyboard daemon.").ok();
    writeln!(output).ok();
    writeln!(output, "See the technical details below.").ok();
}

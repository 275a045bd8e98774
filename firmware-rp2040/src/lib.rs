//! HORI Pokken / Switch Pro Controller emulator for RP2040.
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) and:
//! 1. Takes controller state from a serial link (115200 baud, 8N1) or from a
//!    built-in macro
//! 2. Turns it into the 8-byte Pokken report
//! 3. Sends it to the console over USB HID, optionally answering the Pro
//!    Controller subcommands the console sends back
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART1 TX | 8    | Handshake/ACK bytes to the sender |
//! | UART1 RX | 9    | Framed controller packets |
//! | LED      | 25   | Link / playback status, fast blink on fault |
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with these tasks:
//!
//! - **USB Task**: Manages the USB device stack
//! - **Serial Task**: Runs the sync engine over UART, publishes frames
//! - **Controller Task**: Sends one IN report per poll and reads console
//!   requests from the OUT endpoint
//!
//! Both serial counter sets are logged every
//! [`STATS_LOG_INTERVAL_MS`](serial::STATS_LOG_INTERVAL_MS).
//!
//! The serial and controller tasks share the newest frame through a
//! [`FrameSlot`](pokken_core::FrameSlot); console replies go through a
//! [`SharedResponder`](pokken_core::SharedResponder).
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`mode-serial`** (default): Live input over UART1
//! - **`mode-macro`**: Replay the built-in macro
//! - **`embedded-macro`**: Include the macro table
//! - **`macro-loop`**: Loop the macro instead of holding its last frame
//! - **`framing-procon`**: Pro Controller framing with subcommand replies

#![no_std]

#[cfg(all(feature = "mode-serial", feature = "mode-macro"))]
compile_error!("Cannot enable both `mode-serial` and `mode-macro` features - they select the report source");

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

pub mod input;
pub mod macro_table;
pub mod serial;
pub mod usb_output;

pub use input::ControllerInput;
pub use serial::UartSerialLink;
pub use usb_output::{
    configure_usb_hid, ConsoleRequests, ControllerRequestHandler, UsbHidOutput, UsbLinkState, UsbStateHandler,
};

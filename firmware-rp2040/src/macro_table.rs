//! Built-in macro replayed in `mode-macro`.
//!
//! Timestamps are relative to the start of playback, after the startup delay
//! and the B press that wakes the controller screen.

use pokken_core::MacroFrame;
use pokken_proto::{Buttons, FrameBuilder, Hat};

const NEUTRAL: FrameBuilder = FrameBuilder::new();

/// Walk up into the "change grip/order" screen, confirm, then back out.
pub static DEMO: [MacroFrame; 10] = [
    MacroFrame::new(0, NEUTRAL.build()),
    MacroFrame::new(500, NEUTRAL.hat(Hat::Up).build()),
    MacroFrame::new(600, NEUTRAL.build()),
    MacroFrame::new(700, NEUTRAL.left_stick(0xFF, 0x80).build()),
    MacroFrame::new(900, NEUTRAL.build()),
    MacroFrame::new(1000, NEUTRAL.buttons(Buttons::A).build()),
    MacroFrame::new(1100, NEUTRAL.build()),
    MacroFrame::new(2000, NEUTRAL.press(Buttons::L).press(Buttons::R).build()),
    MacroFrame::new(2100, NEUTRAL.build()),
    MacroFrame::new(3000, NEUTRAL.buttons(Buttons::B).build()),
];

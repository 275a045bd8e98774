//! The report source selected at build time.

use embassy_sync::blocking_mutex::raw::RawMutex;
use pokken_core::{playback_led, LinkStats, LiveSerialSource, MacroPlayer, ReportSource, SourceReport};

/// Live serial input or macro replay.
pub enum ControllerInput<'a, M: RawMutex> {
    Serial(LiveSerialSource<'a, M>),
    Macro(MacroPlayer<'a>),
}

impl<M: RawMutex> ControllerInput<'_, M> {
    /// Status LED level after `current` was produced at `now_ms`.
    ///
    /// Serial: lit while synced and packets keep coming. Macro: solid while a
    /// one-shot macro plays, blinking while a looping one does.
    pub fn led_on(&self, current: &SourceReport, now_ms: u32) -> bool {
        match self {
            Self::Serial(source) => source.indicator().led_on(),
            Self::Macro(player) => playback_led(current.live, player.mode(), now_ms),
        }
    }

    /// Consumer-side serial counters. `None` in macro mode.
    pub fn link_stats(&self) -> Option<LinkStats> {
        match self {
            Self::Serial(source) => Some(source.stats()),
            Self::Macro(_) => None,
        }
    }
}

impl<M: RawMutex> ReportSource for ControllerInput<'_, M> {
    fn current_report(&mut self, now_ms: u32) -> SourceReport {
        match self {
            Self::Serial(source) => source.current_report(now_ms),
            Self::Macro(player) => player.current_report(now_ms),
        }
    }
}

//! UART side of the live serial link.
//!
//! Every received byte goes through the sync engine; the one-byte answer
//! (handshake step, ACK or NACK) is written back immediately so the sender
//! can pace itself.
//!
//! # Pins
//!
//! Uses UART1 at 115200 8N1:
//! - GPIO 8: TX
//! - GPIO 9: RX

use defmt::{info, warn};
use embassy_rp::uart::{Async, Uart, UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use pokken_core::{FrameSlot, SerialReceiver};

/// Baud rate of the serial link.
pub const BAUD_RATE: u32 = 115_200;

/// Period of the link counter logs.
pub const STATS_LOG_INTERVAL_MS: u32 = 5_000;

/// UART-driven producer for the frame hand-off.
pub struct UartSerialLink<'d, M: RawMutex> {
    rx: UartRx<'d, Async>,
    tx: UartTx<'d, Async>,
    receiver: SerialReceiver<'d, M>,
}

impl<'d, M: RawMutex> UartSerialLink<'d, M> {
    /// Create a link that publishes completed frames into `slot`.
    #[must_use]
    pub fn new(uart: Uart<'d, Async>, slot: &'d FrameSlot<M>) -> Self {
        let (tx, rx) = uart.split();
        Self {
            rx,
            tx,
            receiver: SerialReceiver::new(slot),
        }
    }

    /// Service the link forever.
    ///
    /// UART errors lose at most the byte in flight; the sync engine recovers
    /// from the gap on its own.
    pub async fn run(&mut self) -> ! {
        let interval = Duration::from_millis(STATS_LOG_INTERVAL_MS.into());
        let mut last_stats = Instant::now();
        let mut byte = [0u8; 1];
        loop {
            let result = self.rx.read(&mut byte).await;

            if last_stats.elapsed() >= interval {
                last_stats = Instant::now();
                info!("Serial receive: {}", self.receiver.stats());
            }

            if let Err(e) = result {
                warn!("UART read error: {}", e);
                continue;
            }

            if let Some(response) = self.receiver.push_byte(byte[0]) {
                if let Err(e) = self.tx.write(&[response]).await {
                    warn!("UART write error: {}", e);
                }
            }
        }
    }
}

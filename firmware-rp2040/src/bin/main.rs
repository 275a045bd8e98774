#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{UART1, USB};
use embassy_rp::uart::{Config as UartConfig, Uart};
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Instant, Timer};
use embassy_usb::class::hid::State;
use embassy_usb::Builder;
use pokken_core::{
    ControllerBridge, DeviceIdentity, FrameSlot, LiveSerialSource, Macro, MacroPlayer, PlaybackMode, PlayerTiming,
    ReportFraming, Responder, SharedResponder, PRO_CONTROLLER,
};
use pokken_rp2040::serial::{BAUD_RATE, STATS_LOG_INTERVAL_MS};
use pokken_rp2040::usb_output::{device_config, UsbDriver};
use pokken_rp2040::{
    configure_usb_hid, macro_table, ConsoleRequests, ControllerInput, ControllerRequestHandler, UartSerialLink,
    UsbHidOutput, UsbLinkState, UsbStateHandler,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

type Mutex = CriticalSectionRawMutex;
type Bridge = ControllerBridge<'static, 'static, ControllerInput<'static, Mutex>, UsbHidOutput<'static>, Mutex>;

const FRAMING: ReportFraming = if cfg!(feature = "framing-procon") {
    ReportFraming::ProController
} else {
    ReportFraming::Plain
};

const PLAYBACK: PlaybackMode = if cfg!(feature = "macro-loop") {
    PlaybackMode::Loop
} else {
    PlaybackMode::Once
};

/// Half period of the fault blink.
const FAULT_BLINK_MS: u64 = 100;

/// Newest serial frame, from the serial task to the controller task.
static FRAME_SLOT: FrameSlot<Mutex> = FrameSlot::new();

/// Console reply state, shared by the IN path and both OUT paths.
static RESPONDER: StaticCell<SharedResponder<'static, Mutex>> = StaticCell::new();
static REQUEST_HANDLER: StaticCell<ControllerRequestHandler<'static, 'static, Mutex>> = StaticCell::new();

/// Configuration state, from the USB task to the IN path.
static USB_LINK: UsbLinkState = UsbLinkState::new();
static USB_HANDLER: StaticCell<UsbStateHandler<'static>> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static HID_STATE: StaticCell<State> = StaticCell::new();

fn macro_program() -> Option<Macro<'static>> {
    if cfg!(feature = "embedded-macro") {
        Some(Macro::new(&macro_table::DEMO, PLAYBACK))
    } else {
        None
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pokken controller starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let responder: &'static SharedResponder<'static, Mutex> =
        RESPONDER.init(SharedResponder::new(Responder::new(DeviceIdentity::DEFAULT, PRO_CONTROLLER)));

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        device_config(),
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );
    builder.handler(USB_HANDLER.init(UsbStateHandler::new(&USB_LINK)));

    // Configure HID class
    let hid_state = HID_STATE.init(State::new());
    let request_handler = REQUEST_HANDLER.init(ControllerRequestHandler::new(responder, FRAMING));
    let hid = configure_usb_hid(&mut builder, hid_state, request_handler);

    // Build the USB device
    let usb_device = builder.build();

    let (reader, writer) = hid.split();
    let usb_output = UsbHidOutput::new(writer, &USB_LINK, FRAMING);
    let requests = ConsoleRequests::new(reader, responder, FRAMING);

    // --- Report source ---
    let input = if cfg!(feature = "mode-macro") {
        info!("Replaying built-in macro ({})", PLAYBACK);
        ControllerInput::Macro(MacroPlayer::new(macro_program(), PlayerTiming::DEFAULT))
    } else {
        let mut uart_config = UartConfig::default();
        uart_config.baudrate = BAUD_RATE;

        let uart = Uart::new(
            p.UART1,
            p.PIN_8, // TX
            p.PIN_9, // RX
            Irqs,
            p.DMA_CH0,
            p.DMA_CH1,
            uart_config,
        );
        spawner.spawn(serial_task(UartSerialLink::new(uart, &FRAME_SLOT)).unwrap());
        ControllerInput::Serial(LiveSerialSource::new(&FRAME_SLOT))
    };

    let bridge = ControllerBridge::new(input, usb_output, FRAMING, responder);

    // Status LED (on-board LED on Pico)
    let led = Output::new(p.PIN_25, Level::Low);

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(controller_task(bridge, requests, led).unwrap());

    info!("Pokken controller initialized, framing {}", FRAMING);
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, UsbDriver<'static>>) {
    device.run().await;
}

/// Serial task - feeds UART bytes to the sync engine and answers the sender.
#[embassy_executor::task]
async fn serial_task(mut link: UartSerialLink<'static, Mutex>) {
    link.run().await;
}

/// Controller task - one IN report per poll, console requests in between.
///
/// Returns only into the fault blink, after the endpoint fails for good.
#[embassy_executor::task]
async fn controller_task(
    mut bridge: Bridge,
    mut requests: ConsoleRequests<'static, 'static, Mutex>,
    mut led: Output<'static>,
) {
    let mut last_stats_ms = 0u32;
    let reports = bridge.run(now_ms, |input, current, now| {
        led.set_level(if input.led_on(current, now) { Level::High } else { Level::Low });

        if now.wrapping_sub(last_stats_ms) >= STATS_LOG_INTERVAL_MS {
            last_stats_ms = now;
            if let Some(stats) = input.link_stats() {
                info!("Serial link: {}", stats);
            }
        }
    });

    let fatal = match select(reports, requests.run()).await {
        Either::First(e) => e,
        Either::Second(never) => never,
    };

    error!("USB endpoint failure: {}, halting", fatal);
    loop {
        led.toggle();
        Timer::after_millis(FAULT_BLINK_MS).await;
    }
}

/// Milliseconds since boot. Wraps after ~49 days; the core uses wrapping
/// differences.
fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

//! USB HID side: the HORI Pokken Controller interface.

use defmt::{debug, info, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::hid::{HidReader, HidReaderWriter, HidWriter, ReadError, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config as UsbConfig, Handler};
use pokken_core::{InReport, OutputError, OutputSink, ReportFraming, SharedResponder};
use portable_atomic::{AtomicBool, Ordering};

/// HORI.
pub const VENDOR_ID: u16 = 0x0F0D;
/// POKKEN CONTROLLER.
pub const PRODUCT_ID: u16 = 0x0092;

/// Size of both interrupt endpoints.
pub const PACKET_SIZE: usize = 64;

/// The console polls the IN endpoint every 8 ms.
pub const POLL_MS: u8 = 8;

/// How long the IN endpoint may stay down once the host has configured the
/// device.
pub const ENDPOINT_READY_TIMEOUT_MS: u64 = 1_000;

pub type UsbDriver<'d> = Driver<'d, USB>;

/// Device descriptor fields matching the real controller.
#[must_use]
pub fn device_config() -> UsbConfig<'static> {
    let mut config = UsbConfig::new(VENDOR_ID, PRODUCT_ID);
    config.manufacturer = Some("HORI CO.,LTD.");
    config.product = Some("POKKEN CONTROLLER");
    config.serial_number = None;
    config.device_release = 0x0100;
    config.max_power = 500;
    config.max_packet_size_0 = 64;
    config
}

/// Pokken Controller HID report descriptor.
///
/// Input: 16 buttons, 4-bit hat plus padding, four 8-bit axes and one vendor
/// byte. Output: 8 vendor bytes carrying console requests.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Buttons (16 buttons) ---
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x35, 0x00, //   Physical Minimum (0)
    0x45, 0x01, //   Physical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x10, //   Report Count (16)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x10, //   Usage Maximum (Button 16)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Hat switch ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x25, 0x07, //   Logical Maximum (7)
    0x46, 0x3B, 0x01, //   Physical Maximum (315)
    0x75, 0x04, //   Report Size (4)
    0x95, 0x01, //   Report Count (1)
    0x65, 0x14, //   Unit (Degrees)
    0x09, 0x39, //   Usage (Hat switch)
    0x81, 0x42, //   Input (Data, Variable, Absolute, Null State)
    0x65, 0x00, //   Unit (None)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x01, //   Input (Constant) - padding nibble
    //
    // --- Sticks ---
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x46, 0xFF, 0x00, //   Physical Maximum (255)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x04, //   Report Count (4)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Vendor byte ---
    0x06, 0x00, 0xFF, //   Usage Page (Vendor Defined 0xFF00)
    0x09, 0x20, //   Usage (0x20)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Console requests ---
    0x0A, 0x21, 0x26, //   Usage (0x2621)
    0x95, 0x08, //   Report Count (8)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

#[inline]
fn endpoint_error_to_output_error(e: EndpointError) -> OutputError {
    match e {
        EndpointError::Disabled => OutputError::Disabled,
        _ => OutputError::Io,
    }
}

/// Whether the host has configured the device, as seen by the USB stack.
pub struct UsbLinkState {
    configured: AtomicBool,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl UsbLinkState {
    pub const fn new() -> Self {
        Self {
            configured: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::Release);
        self.changed.signal(());
    }

    /// Wait until the host selects a configuration. Single waiter.
    pub async fn wait_configured(&self) {
        while !self.is_configured() {
            self.changed.wait().await;
        }
    }
}

impl Default for UsbLinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Device-level USB events, forwarded to a [`UsbLinkState`].
pub struct UsbStateHandler<'d> {
    link: &'d UsbLinkState,
}

impl<'d> UsbStateHandler<'d> {
    pub fn new(link: &'d UsbLinkState) -> Self {
        Self { link }
    }
}

impl Handler for UsbStateHandler<'_> {
    fn reset(&mut self) {
        self.link.set_configured(false);
    }

    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
        self.link.set_configured(configured);
    }
}

/// USB HID controller output.
///
/// Wraps an embassy-usb HID writer. With Pro Controller framing every
/// report is zero-padded to a full packet.
///
/// A send waits for the host to configure the device first. Once it has,
/// the IN endpoint must come up within [`ENDPOINT_READY_TIMEOUT_MS`] or the
/// send fails with [`OutputError::EndpointConfig`].
pub struct UsbHidOutput<'d> {
    writer: HidWriter<'d, UsbDriver<'d>, PACKET_SIZE>,
    link: &'d UsbLinkState,
    framing: ReportFraming,
    ready: bool,
}

impl<'d> UsbHidOutput<'d> {
    /// Create a new USB HID output from the given HID writer.
    pub fn new(writer: HidWriter<'d, UsbDriver<'d>, PACKET_SIZE>, link: &'d UsbLinkState, framing: ReportFraming) -> Self {
        Self {
            writer,
            link,
            framing,
            ready: false,
        }
    }

    async fn wait_ready(&mut self) -> Result<(), OutputError> {
        self.link.wait_configured().await;
        with_timeout(Duration::from_millis(ENDPOINT_READY_TIMEOUT_MS), self.writer.ready())
            .await
            .map_err(|_| OutputError::EndpointConfig)?;
        self.ready = true;
        info!("USB HID ready, sending reports...");
        Ok(())
    }
}

impl OutputSink for UsbHidOutput<'_> {
    async fn send(&mut self, report: &InReport) -> Result<(), OutputError> {
        if !self.ready {
            self.wait_ready().await?;
        }
        let result = match self.framing {
            ReportFraming::Plain => self.writer.write(report.as_bytes()).await,
            ReportFraming::ProController => self.writer.write(&report.padded()).await,
        };
        if let Err(EndpointError::Disabled) = result {
            self.ready = false;
        }
        result.map_err(endpoint_error_to_output_error)
    }
}

/// Feeds console OUT reports from the interrupt endpoint to the responder.
pub struct ConsoleRequests<'d, 'a, M: RawMutex> {
    reader: HidReader<'d, UsbDriver<'d>, PACKET_SIZE>,
    responder: &'d SharedResponder<'a, M>,
    framing: ReportFraming,
}

impl<'d, 'a, M: RawMutex> ConsoleRequests<'d, 'a, M> {
    pub fn new(
        reader: HidReader<'d, UsbDriver<'d>, PACKET_SIZE>,
        responder: &'d SharedResponder<'a, M>,
        framing: ReportFraming,
    ) -> Self {
        Self {
            reader,
            responder,
            framing,
        }
    }

    /// Read OUT reports forever. With plain framing they are drained and
    /// dropped.
    pub async fn run(&mut self) -> ! {
        let mut buf = [0u8; PACKET_SIZE];
        loop {
            match self.reader.read(&mut buf).await {
                Ok(n) => match self.framing {
                    ReportFraming::ProController => self.responder.handle_request(&buf[..n]),
                    ReportFraming::Plain => debug!("OUT report ignored ({=usize} bytes)", n),
                },
                Err(ReadError::Disabled) => self.reader.ready().await,
                Err(_) => warn!("OUT report dropped"),
            }
        }
    }
}

/// HID control requests. Reports sent with SET_REPORT take the same path as
/// interrupt OUT reports.
pub struct ControllerRequestHandler<'d, 'a, M: RawMutex> {
    responder: &'d SharedResponder<'a, M>,
    framing: ReportFraming,
}

impl<'d, 'a, M: RawMutex> ControllerRequestHandler<'d, 'a, M> {
    pub fn new(responder: &'d SharedResponder<'a, M>, framing: ReportFraming) -> Self {
        Self { responder, framing }
    }
}

impl<M: RawMutex> RequestHandler for ControllerRequestHandler<'_, '_, M> {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, _id: ReportId, data: &[u8]) -> OutResponse {
        if self.framing == ReportFraming::ProController {
            self.responder.handle_request(data);
        }
        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Configure the USB HID class in the USB builder.
///
/// Returns the HID reader/writer pair for the application.
pub fn configure_usb_hid<'d>(
    builder: &mut Builder<'d, UsbDriver<'d>>,
    state: &'d mut State<'d>,
    request_handler: &'d mut dyn RequestHandler,
) -> HidReaderWriter<'d, UsbDriver<'d>, PACKET_SIZE, PACKET_SIZE> {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: Some(request_handler),
        poll_ms: POLL_MS,
        max_packet_size: 64,
        hid_subclass: embassy_usb::class::hid::HidSubclass::No,
        hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
    };

    HidReaderWriter::new(builder, state, config)
}

use std::sync::Arc;

use crate::{
    config::{GamepadConfig, SecurityLevel, HID_REPORT_ID},
    gap::{AdvertisementStrategy, Advertiser, DefaultAdvertisement, Gap},
    gatts::{
        attribute::{
            defaults::{
                ClientConfig, ControlPoint, HidInformation, PnpId, ProtocolMode, ReportReference,
                StringAttr, U8Attr,
            },
            Attribute,
        },
        characteristic::{Characteristic, CharacteristicConfig},
        connection::{ConnectionState, ConnectionStatus, ConnectionTracker},
        descriptor::DescriptorConfig,
        service::Service,
        uuid, ConnectionEvent, GattServer, GattsEventHandler, Handle,
    },
    hid::{
        report_map::{input_report_len, REPORT_MAP},
        Button, GamepadReport,
    },
};

const HID_SERVICE_HANDLES: u16 = 16;
const BATTERY_SERVICE_HANDLES: u16 = 6;
const DEVICE_INFO_SERVICE_HANDLES: u16 = 6;

/// Reacts to stack call-ins: drives the connection tracker and logs what the
/// host writes to the HID control attributes.
struct GamepadEvents {
    tracker: ConnectionTracker,
    protocol_mode: Handle,
    control_point: Handle,
    input_cccd: Handle,
}

impl GattsEventHandler for GamepadEvents {
    fn on_connection_event(&self, event: ConnectionEvent) {
        self.tracker.handle(event);
    }

    fn on_write(&self, handle: Handle, value: &[u8]) {
        if handle == self.protocol_mode {
            match ProtocolMode::from_bytes(value) {
                Ok(ProtocolMode::Report) => log::info!("Host selected report protocol"),
                // Only the report protocol is implemented, reports keep their layout
                Ok(ProtocolMode::Boot) => log::warn!("Host selected boot protocol"),
                Err(err) => log::warn!("Invalid protocol mode write: {:?}", err),
            }
        } else if handle == self.control_point {
            match ControlPoint::from_bytes(value) {
                Ok(command) => log::info!("HID control point: {:?}", command),
                Err(err) => log::warn!("Invalid control point write: {:?}", err),
            }
        } else if handle == self.input_cccd {
            match ClientConfig::from_bytes(value) {
                Ok(config) => log::info!(
                    "Input report notifications {}",
                    if config.notifications {
                        "enabled"
                    } else {
                        "disabled"
                    }
                ),
                Err(err) => log::warn!("Invalid client configuration write: {:?}", err),
            }
        } else {
            log::debug!("Unhandled write to handle {}: {:02x?}", handle, value);
        }
    }
}

/// BLE HID gamepad: owns the report model and publishes it over HID over GATT.
pub struct GamepadBle {
    report: GamepadReport,
    input: Characteristic<GamepadReport>,
    battery: Characteristic<U8Attr>,
    status: Arc<ConnectionStatus>,
}

impl GamepadBle {
    /// Registers the HID, Battery and Device Information services, subscribes
    /// to connection events and starts advertising with the default strategy.
    pub fn start(
        server: Arc<dyn GattServer>,
        gap: Arc<dyn Gap>,
        config: &GamepadConfig,
    ) -> anyhow::Result<Self> {
        let strategy = DefaultAdvertisement::from_config(&config.advertising);
        Self::start_with_strategy(server, gap, config, &strategy)
    }

    pub fn start_with_strategy(
        server: Arc<dyn GattServer>,
        gap: Arc<dyn Gap>,
        config: &GamepadConfig,
        strategy: &dyn AdvertisementStrategy,
    ) -> anyhow::Result<Self> {
        let report_len = input_report_len(&REPORT_MAP, HID_REPORT_ID)?;
        if report_len != GamepadReport::LEN {
            return Err(anyhow::anyhow!(
                "Report map declares a {} byte input report, model serializes {} bytes",
                report_len,
                GamepadReport::LEN
            ));
        }

        let security = config.security;
        let report = GamepadReport::default();

        let hid = Service::new(&server, uuid::HID_SERVICE, HID_SERVICE_HANDLES)?;

        hid.register_characteristic(
            CharacteristicConfig::read_only(uuid::HID_INFORMATION, 4, security),
            &HidInformation::default(),
        )?;
        hid.register_static_characteristic(
            CharacteristicConfig::read_only(uuid::REPORT_MAP, REPORT_MAP.len(), security),
            &REPORT_MAP,
        )?;
        let control_point = hid.register_characteristic(
            CharacteristicConfig {
                uuid: uuid::HID_CONTROL_POINT,
                value_max_len: 1,
                readable: false,
                writable: false,
                write_without_response: true,
                enable_notify: false,
                security,
            },
            &ControlPoint::ExitSuspend,
        )?;
        let protocol_mode = hid.register_characteristic(
            CharacteristicConfig {
                uuid: uuid::PROTOCOL_MODE,
                value_max_len: 1,
                readable: true,
                writable: false,
                write_without_response: true,
                enable_notify: false,
                security,
            },
            &ProtocolMode::Report,
        )?;
        let input = hid.register_characteristic(
            CharacteristicConfig {
                enable_notify: true,
                ..CharacteristicConfig::read_only(uuid::REPORT, GamepadReport::LEN, security)
            },
            &report,
        )?;
        let input_cccd = input.register_descriptor(
            DescriptorConfig::client_configuration(security),
            &ClientConfig::DISABLED,
        )?;
        input.register_descriptor(
            DescriptorConfig::report_reference(security),
            &ReportReference::gamepad_input(),
        )?;
        hid.start()?;

        // Battery and device information are readable before pairing completes
        let battery_service = Service::new(&server, uuid::BATTERY_SERVICE, BATTERY_SERVICE_HANDLES)?;
        let battery = battery_service.register_characteristic(
            CharacteristicConfig {
                enable_notify: true,
                ..CharacteristicConfig::read_only(uuid::BATTERY_LEVEL, 1, SecurityLevel::Open)
            },
            &U8Attr(100),
        )?;
        battery.register_descriptor(
            DescriptorConfig::client_configuration(SecurityLevel::Open),
            &ClientConfig::DISABLED,
        )?;
        battery_service.start()?;

        let device_info = Service::new(
            &server,
            uuid::DEVICE_INFORMATION_SERVICE,
            DEVICE_INFO_SERVICE_HANDLES,
        )?;
        device_info.register_characteristic(
            CharacteristicConfig::read_only(uuid::PNP_ID, 7, SecurityLevel::Open),
            &PnpId::from(&config.device),
        )?;
        let manufacturer = StringAttr(config.device.manufacturer.clone());
        device_info.register_characteristic(
            CharacteristicConfig::read_only(
                uuid::MANUFACTURER_NAME,
                manufacturer.0.len(),
                SecurityLevel::Open,
            ),
            &manufacturer,
        )?;
        device_info.start()?;

        let advertiser = Arc::new(Advertiser::new(gap, strategy, &config.device)?);
        let status = Arc::new(ConnectionStatus::default());

        server.subscribe(Arc::new(GamepadEvents {
            tracker: ConnectionTracker::new(status.clone(), advertiser.clone()),
            protocol_mode: protocol_mode.handle(),
            control_point: control_point.handle(),
            input_cccd: input_cccd.handle(),
        }))?;

        advertiser.start()?;

        log::info!("Gamepad \"{}\" ready", config.device.name);

        Ok(Self {
            report,
            input,
            battery,
            status,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.state()
    }

    pub fn report(&self) -> &GamepadReport {
        &self.report
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.report.set_button(button, pressed);
    }

    pub fn set_button_a(&mut self, pressed: bool) {
        self.set_button(Button::A, pressed);
    }

    pub fn set_button_b(&mut self, pressed: bool) {
        self.set_button(Button::B, pressed);
    }

    pub fn set_button_x(&mut self, pressed: bool) {
        self.set_button(Button::X, pressed);
    }

    pub fn set_button_y(&mut self, pressed: bool) {
        self.set_button(Button::Y, pressed);
    }

    pub fn set_button_lb(&mut self, pressed: bool) {
        self.set_button(Button::LeftBumper, pressed);
    }

    pub fn set_button_rb(&mut self, pressed: bool) {
        self.set_button(Button::RightBumper, pressed);
    }

    pub fn set_button_back(&mut self, pressed: bool) {
        self.set_button(Button::Back, pressed);
    }

    pub fn set_button_start(&mut self, pressed: bool) {
        self.set_button(Button::Start, pressed);
    }

    pub fn set_left_stick(&mut self, x: i16, y: i16) {
        self.report.set_left_stick(x, y);
    }

    pub fn set_left_stick_button(&mut self, pressed: bool) {
        self.set_button(Button::LeftStick, pressed);
    }

    pub fn set_right_stick(&mut self, x: i16, y: i16) {
        self.report.set_right_stick(x, y);
    }

    pub fn set_right_stick_button(&mut self, pressed: bool) {
        self.set_button(Button::RightStick, pressed);
    }

    /// Publishes the current report. The stored value is always refreshed,
    /// the notification only goes out while a host is connected.
    pub fn update_input_report(&self) {
        if let Err(err) = self.input.update_value(&self.report, self.is_connected()) {
            log::debug!("Input report not delivered: {:?}", err);
        }
    }

    /// `level` is a percentage, 0 to 100.
    pub fn update_battery_level(&self, level: u8) {
        if let Err(err) = self.battery.update_value(&U8Attr(level), self.is_connected()) {
            log::debug!("Battery level not delivered: {:?}", err);
        }
    }
}

use esp_idf_svc::hal::{gpio::PinDriver, prelude::Peripherals};
use gamepad_ble::{
    ble::Ble,
    config::{is_battery_slot, GamepadConfig, SLOT_PERIOD},
    GamepadBle,
};

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(err) = run() {
        log::error!("Gamepad stopped: {:?}", err);
    }
}

// TODO: read the AXP192 fuel gauge over I2C instead of reporting a full battery
fn battery_level() -> u8 {
    100
}

fn run() -> anyhow::Result<()> {
    let peripherals = Peripherals::take()?;
    let config = GamepadConfig::default();

    let ble = Ble::new(peripherals.modem, &config)?;
    let mut gamepad = GamepadBle::start(ble.gatts.clone(), ble.gap.clone(), &config)?;

    // M5StickC: button A on GPIO37, button B on GPIO39, both active low
    let button_a = PinDriver::input(peripherals.pins.gpio37)?;
    let button_b = PinDriver::input(peripherals.pins.gpio39)?;

    let mut slot: u32 = 0;
    loop {
        gamepad.set_button_a(button_a.is_low());
        gamepad.set_button_b(button_b.is_low());
        gamepad.update_input_report();

        if is_battery_slot(slot) {
            let level = battery_level();
            log::debug!("Battery level {}%", level);
            gamepad.update_battery_level(level);
        }

        slot = slot.wrapping_add(1);
        std::thread::sleep(SLOT_PERIOD);
    }
}

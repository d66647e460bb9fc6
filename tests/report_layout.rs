//! Serialized gamepad reports read back through the published report map.

use enumset::EnumSet;
use gamepad_ble::{
    config::HID_REPORT_ID,
    gatts::attribute::Attribute,
    hid::report_map::{input_fields, input_report_len, InputField, REPORT_MAP},
    Button, GamepadReport,
};

const GENERIC_DESKTOP: u16 = 0x01;
const BUTTON_PAGE: u16 = 0x09;

fn field(usage_page: u16) -> InputField {
    input_fields(&REPORT_MAP)
        .unwrap()
        .into_iter()
        .find(|field| field.report_id == HID_REPORT_ID && field.usage_page == usage_page)
        .expect("field missing from report map")
}

/// Decodes axes and pressed buttons the way a host would.
struct HostView {
    axes: InputField,
    buttons: InputField,
}

impl HostView {
    fn new() -> Self {
        Self {
            axes: field(GENERIC_DESKTOP),
            buttons: field(BUTTON_PAGE),
        }
    }

    fn decode(&self, payload: &[u8]) -> ([i32; 4], Vec<usize>) {
        let mut values = [0; 4];
        for (index, value) in values.iter_mut().enumerate() {
            *value = self.axes.value(payload, index).unwrap();
        }

        let pressed = (0..self.buttons.count)
            .filter(|index| self.buttons.value(payload, *index) == Some(1))
            .collect();

        (values, pressed)
    }
}

fn host_view(payload: &[u8]) -> ([i32; 4], Vec<usize>) {
    HostView::new().decode(payload)
}

#[test]
fn report_length_matches_map() {
    assert_eq!(
        input_report_len(&REPORT_MAP, HID_REPORT_ID).unwrap(),
        GamepadReport::LEN
    );
    assert_eq!(
        GamepadReport::default().get_bytes().unwrap().len(),
        GamepadReport::LEN
    );
}

#[test]
fn idle_report_decodes_to_centered_sticks() {
    let payload = GamepadReport::default().get_bytes().unwrap();
    let (axes, pressed) = host_view(&payload);

    assert_eq!(axes, [0, 0, 0, 0]);
    assert!(pressed.is_empty());
}

#[test]
fn axes_decode_in_declaration_order() {
    let mut report = GamepadReport::default();
    report.set_left_stick(3000, -3000);
    report.set_right_stick(i16::MIN, i16::MAX);

    let (axes, _) = host_view(&report.get_bytes().unwrap());

    assert_eq!(axes, [3000, -3000, -32768, 32767]);
}

#[test]
fn buttons_decode_to_their_usage_index() {
    let cases: &[(&[Button], &[usize])] = &[
        (&[Button::A], &[0]),
        (&[Button::B, Button::Y], &[1, 3]),
        (&[Button::LeftBumper, Button::RightBumper], &[4, 5]),
        (&[Button::Back, Button::Start], &[6, 7]),
        (&[Button::LeftStick, Button::RightStick], &[8, 9]),
    ];

    for (buttons, expected) in cases {
        let mut report = GamepadReport::default();
        for button in buttons.iter() {
            report.set_button(*button, true);
        }

        let (_, pressed) = host_view(&report.get_bytes().unwrap());
        assert_eq!(pressed.as_slice(), *expected, "buttons {:?}", buttons);
    }
}

#[test]
fn decoded_report_matches_original() {
    let mut report = GamepadReport::default();
    report.set_left_stick(-1, 1);
    report.set_right_stick(12345, -12345);
    report.set_button(Button::X, true);
    report.set_button(Button::Start, true);

    let payload = report.get_bytes().unwrap();
    assert_eq!(GamepadReport::from_bytes(&payload).unwrap(), report);

    let (axes, pressed) = host_view(&payload);
    assert_eq!(axes, [-1, 1, 12345, -12345]);
    assert_eq!(pressed, vec![2, 7]);
}

#[test]
fn every_button_combination_round_trips() {
    let host = HostView::new();

    for bits in 0u16..1024 {
        let mut report = GamepadReport::default();
        for button in EnumSet::<Button>::from_repr_truncated(bits).iter() {
            report.set_button(button, true);
        }

        let payload = report.get_bytes().unwrap();
        let expected: Vec<usize> = (0..10).filter(|bit| bits & (1 << bit) != 0).collect();

        let (axes, pressed) = host.decode(&payload);
        assert_eq!(axes, [0, 0, 0, 0]);
        assert_eq!(pressed, expected, "button bits {:#06x}", bits);
        assert_eq!(GamepadReport::from_bytes(&payload).unwrap(), report);
    }
}

#[test]
fn every_axis_value_round_trips() {
    let host = HostView::new();

    for slot in 0..4 {
        for value in i16::MIN..=i16::MAX {
            let mut axes = [0i16; 4];
            axes[slot] = value;

            let mut report = GamepadReport::default();
            report.set_left_stick(axes[0], axes[1]);
            report.set_right_stick(axes[2], axes[3]);
            report.set_button(Button::Start, true);

            let payload = report.get_bytes().unwrap();

            let (decoded, pressed) = host.decode(&payload);
            assert_eq!(decoded, axes.map(i32::from), "axis {} value {}", slot, value);
            assert_eq!(pressed, vec![7]);
            assert_eq!(GamepadReport::from_bytes(&payload).unwrap(), report);
        }
    }
}

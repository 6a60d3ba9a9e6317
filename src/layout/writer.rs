//! Layout text writer. Emits only what differs from the defaults.

use std::fmt::Write as _;

use super::types::{
    AxisBinding, AxisMode, ButtonAction, ButtonBinding, Mapping, MouseDirection, PointerAxis,
    DEFAULT_MAX_SPEED,
};
use crate::output::OutputTarget;
use crate::translator::calibration::{Curve, Throttle, DEFAULT_DEAD_ZONE, DEFAULT_EXTREME_ZONE};

/// Serializes mappings into layout text. Empty mappings are omitted.
#[must_use]
pub fn write_layout(mappings: &[Mapping]) -> String {
    let mut text = String::from("# joypad-bridge layout\n");
    for mapping in mappings.iter().filter(|mapping| !mapping.is_empty()) {
        text.push('\n');
        write_mapping(&mut text, mapping);
    }
    text
}

fn write_mapping(text: &mut String, mapping: &Mapping) {
    match &mapping.identity {
        Some(identity) => {
            let _ = writeln!(
                text,
                "Joystick {} \"{}\" {{",
                mapping.ordinal,
                escape_name(identity)
            );
        }
        None => {
            let _ = writeln!(text, "Joystick {} {{", mapping.ordinal);
        }
    }
    for (index, binding) in &mapping.axes {
        let _ = writeln!(text, "    Axis {}: {}", index + 1, axis_fields(binding).join(", "));
    }
    for (index, binding) in &mapping.buttons {
        let _ = writeln!(text, "    Button {}: {}", index + 1, button_fields(binding).join(", "));
    }
    text.push_str("}\n");
}

/// Escapes a device name so it survives inside a quoted header.
pub(super) fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn axis_fields(binding: &AxisBinding) -> Vec<String> {
    let calibration = &binding.calibration;
    let mut fields = Vec::new();

    if calibration.dead_zone != DEFAULT_DEAD_ZONE {
        fields.push(format!("dZone {}", calibration.dead_zone));
    }
    if calibration.extreme_zone != DEFAULT_EXTREME_ZONE {
        fields.push(format!("xZone {}", calibration.extreme_zone));
    }
    if calibration.sensitivity != 1.0 {
        fields.push(format!("sens {}", calibration.sensitivity));
    }
    match calibration.curve {
        Curve::Linear => {}
        Curve::Quadratic => fields.push("curve quadratic".to_string()),
        Curve::Cubic => fields.push("curve cubic".to_string()),
        Curve::Expo(factor) => fields.push(format!("curve expo {}", factor)),
    }
    match calibration.throttle {
        Throttle::Off => {}
        Throttle::Positive => fields.push("throttle+".to_string()),
        Throttle::Negative => fields.push("throttle-".to_string()),
    }

    match binding.mode {
        AxisMode::Keys { positive, negative } => {
            fields.extend(positive.map(|target| target_field('+', target)));
            fields.extend(negative.map(|target| target_field('-', target)));
        }
        AxisMode::Mouse(direction) => fields.push(format!("mouse {}", direction_token(direction))),
        AxisMode::Absolute(direction) => {
            fields.push(format!("absolute {}", direction_token(direction)))
        }
    }

    if binding.max_speed != DEFAULT_MAX_SPEED {
        fields.push(format!("maxSpeed {}", binding.max_speed));
    }
    fields
}

fn target_field(sign: char, target: OutputTarget) -> String {
    match target {
        OutputTarget::Key(code) => format!("{}key {}", sign, code),
        OutputTarget::MouseButton(index) => format!("{}mouse {}", sign, index),
    }
}

fn direction_token(direction: MouseDirection) -> &'static str {
    match (direction.axis, direction.inverted) {
        (PointerAxis::Horizontal, false) => "+h",
        (PointerAxis::Horizontal, true) => "-h",
        (PointerAxis::Vertical, false) => "+v",
        (PointerAxis::Vertical, true) => "-v",
    }
}

fn button_fields(binding: &ButtonBinding) -> Vec<String> {
    let mut fields = Vec::new();
    match binding.action {
        None => {}
        Some(ButtonAction::Key(code)) => fields.push(format!("key {}", code)),
        Some(ButtonAction::MouseButton(index)) => fields.push(format!("mouse {}", index)),
        Some(ButtonAction::Absolute { x, y }) => fields.push(format!("absolute {} {}", x, y)),
    }
    if binding.sticky {
        fields.push("sticky".to_string());
    }
    if binding.rapidfire {
        fields.push("rapidfire".to_string());
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::parser::parse_layout;
    use crate::translator::calibration::Calibration;

    fn rich_mapping() -> Mapping {
        let mut mapping = Mapping::new(2, Some("Logitech Dual Action".to_string()));
        mapping.set_axis(
            0,
            AxisBinding {
                calibration: Calibration {
                    dead_zone: 4000,
                    sensitivity: 1e-8,
                    curve: Curve::Expo(0.25),
                    ..Calibration::default()
                },
                mode: AxisMode::Keys {
                    positive: Some(OutputTarget::Key(32)),
                    negative: Some(OutputTarget::MouseButton(4)),
                },
                ..AxisBinding::default()
            },
        );
        mapping.set_axis(
            3,
            AxisBinding {
                calibration: Calibration {
                    throttle: Throttle::Negative,
                    ..Calibration::default()
                },
                mode: AxisMode::Mouse(MouseDirection {
                    axis: PointerAxis::Vertical,
                    inverted: true,
                }),
                max_speed: 5000,
            },
        );
        mapping.set_button(
            1,
            ButtonBinding {
                action: Some(ButtonAction::Absolute { x: -100, y: 35 }),
                ..ButtonBinding::default()
            },
        );
        mapping.set_button(
            9,
            ButtonBinding {
                action: Some(ButtonAction::MouseButton(3)),
                sticky: true,
                rapidfire: true,
            },
        );
        mapping
    }

    #[test]
    fn test_round_trip_preserves_bindings() {
        let mappings = vec![rich_mapping(), {
            let mut plain = Mapping::new(1, None);
            plain.set_button(0, ButtonBinding {
                action: Some(ButtonAction::Key(57)),
                ..ButtonBinding::default()
            });
            plain
        }];
        let reparsed = parse_layout(&write_layout(&mappings)).unwrap();
        assert_eq!(reparsed, mappings);
    }

    #[test]
    fn test_defaults_are_not_written() {
        let mut mapping = Mapping::new(1, None);
        mapping.set_axis(
            0,
            AxisBinding {
                max_speed: 20,
                ..AxisBinding::default()
            },
        );
        let text = write_layout(&[mapping]);
        assert!(text.contains("Axis 1: maxSpeed 20\n"));
        assert!(!text.contains("dZone"));
        assert!(!text.contains("sens"));
        assert!(!text.contains("Button"));
    }

    #[test]
    fn test_empty_mappings_are_omitted() {
        let text = write_layout(&[Mapping::new(1, Some("Pad".to_string()))]);
        assert!(!text.contains("Joystick"));
        assert!(parse_layout(&text).unwrap().is_empty());
    }

    #[test]
    fn test_awkward_names_round_trip() {
        let mappings: Vec<Mapping> = ["Pad \"Pro\"", "Back\\slash\\", "Two\nLines\tTab"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut mapping = Mapping::new(i as u32 + 1, Some(name.to_string()));
                mapping.set_button(0, ButtonBinding {
                    action: Some(ButtonAction::Key(57)),
                    ..ButtonBinding::default()
                });
                mapping
            })
            .collect();

        let text = write_layout(&mappings);
        assert!(text.contains("Joystick 1 \"Pad \\\"Pro\\\"\" {\n"));
        assert_eq!(parse_layout(&text).unwrap(), mappings);
    }

    #[test]
    fn test_header_format() {
        let text = write_layout(&[rich_mapping()]);
        assert!(text.contains("Joystick 2 \"Logitech Dual Action\" {\n"));
        assert!(text.contains("    Button 10: mouse 3, sticky, rapidfire\n"));
        assert!(text.contains("    Axis 4: throttle-, mouse -v, maxSpeed 5000\n"));
    }
}

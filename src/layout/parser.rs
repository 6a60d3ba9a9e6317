//! Layout text parser.
//!
//! The format is line based. Blank lines and lines starting with `#` are
//! skipped, every other line is either a block header, a binding entry or a
//! closing brace:
//!
//! ```text
//! Joystick 1 "Sony Wireless Controller" {
//!     Axis 1: dZone 4000, +key 32, -key 30
//!     Button 2: mouse 1, sticky
//! }
//! ```
//!
//! Any malformed line fails the whole parse; partial layouts are never
//! returned.

use std::collections::HashSet;

use super::types::{
    AxisBinding, AxisMode, ButtonAction, ButtonBinding, Mapping, MouseDirection, PointerAxis,
    MAX_SPEED_RANGE,
};
use crate::controller::code_table::JOY_MAX;
use crate::controller::ControlKind;
use crate::error::{BridgeError, Result};
use crate::output::uinput::is_advertised_key;
use crate::output::OutputTarget;
use crate::translator::calibration::{Calibration, Curve, Throttle};

/// Percent range accepted for absolute positions.
const PERCENT_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// A block being read, with every control named so far.
struct OpenBlock {
    start: usize,
    mapping: Mapping,
    seen: HashSet<(ControlKind, usize)>,
}

/// Parses every joystick block of a layout file.
///
/// # Errors
///
/// Returns `ConfigInvalid` with the 1-based line number of the first
/// offending line.
///
/// # Examples
///
/// ```
/// use joypad_bridge::layout::parse_layout;
///
/// let text = "Joystick 1 {\n  Button 1: key 57\n}\n";
/// let mappings = parse_layout(text).unwrap();
///
/// assert_eq!(mappings.len(), 1);
/// assert_eq!(mappings[0].buttons.len(), 1);
/// ```
pub fn parse_layout(text: &str) -> Result<Vec<Mapping>> {
    let mut mappings = Vec::new();
    let mut open: Option<OpenBlock> = None;

    for (offset, raw_line) in text.lines().enumerate() {
        let line_no = offset + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match open.take() {
            None => {
                open = Some(OpenBlock {
                    start: line_no,
                    mapping: parse_header(line, line_no)?,
                    seen: HashSet::new(),
                })
            }
            Some(block) if line == "}" => mappings.push(block.mapping),
            Some(mut block) => {
                parse_entry(line, line_no, &mut block)?;
                open = Some(block);
            }
        }
    }

    if let Some(block) = open {
        return Err(BridgeError::layout(block.start, "Unterminated Joystick block"));
    }
    Ok(mappings)
}

fn parse_header(line: &str, line_no: usize) -> Result<Mapping> {
    let body = line
        .strip_suffix('{')
        .ok_or_else(|| BridgeError::layout(line_no, "Expected '{' at end of Joystick header"))?
        .trim();

    let (keyword, rest) = split_word(body);
    if !keyword.eq_ignore_ascii_case("joystick") {
        return Err(BridgeError::layout(
            line_no,
            format!("Expected 'Joystick', found '{}'", keyword),
        ));
    }

    let (number, rest) = split_word(rest);
    let ordinal: u32 = parse_number(number, line_no)?;
    if ordinal == 0 {
        return Err(BridgeError::layout(line_no, "Joystick numbers start at 1"));
    }

    let identity = match rest.trim() {
        "" => None,
        quoted => {
            let inner = quoted
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .ok_or_else(|| {
                    BridgeError::layout(line_no, format!("Expected quoted name, found '{}'", quoted))
                })?;
            Some(unescape_name(inner, line_no)?)
        }
    };

    Ok(Mapping::new(ordinal, identity))
}

/// Reverses [`escape_name`](super::writer::escape_name).
fn unescape_name(inner: &str, line_no: usize) -> Result<String> {
    let mut name = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Err(BridgeError::layout(line_no, "Unescaped '\"' in name")),
            '\\' => match chars.next() {
                Some('\\') => name.push('\\'),
                Some('"') => name.push('"'),
                Some('n') => name.push('\n'),
                Some('r') => name.push('\r'),
                Some('t') => name.push('\t'),
                Some(other) => {
                    return Err(BridgeError::layout(
                        line_no,
                        format!("Invalid escape '\\{}' in name", other),
                    ))
                }
                None => return Err(BridgeError::layout(line_no, "Name ends with '\\'")),
            },
            c => name.push(c),
        }
    }
    Ok(name)
}

fn parse_entry(line: &str, line_no: usize, block: &mut OpenBlock) -> Result<()> {
    let (head, fields) = line
        .split_once(':')
        .ok_or_else(|| BridgeError::layout(line_no, "Expected ':' after control name"))?;

    let (kind, number) = split_word(head.trim());
    let index: usize = parse_number(number.trim(), line_no)?;
    if index == 0 {
        return Err(BridgeError::layout(line_no, "Control numbers start at 1"));
    }
    let index = index - 1;

    let fields: Vec<Vec<&str>> = fields
        .split(',')
        .map(|field| field.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect();

    match kind.to_ascii_lowercase().as_str() {
        "axis" => {
            if !block.seen.insert((ControlKind::Axis, index)) {
                return Err(BridgeError::layout(line_no, format!("Axis {} defined twice", index + 1)));
            }
            let binding = parse_axis(&fields, line_no)?;
            block.mapping.set_axis(index, binding);
        }
        "button" => {
            if !block.seen.insert((ControlKind::Button, index)) {
                return Err(BridgeError::layout(
                    line_no,
                    format!("Button {} defined twice", index + 1),
                ));
            }
            let binding = parse_button(&fields, line_no)?;
            block.mapping.set_button(index, binding);
        }
        other => {
            return Err(BridgeError::layout(
                line_no,
                format!("Expected 'Axis' or 'Button', found '{}'", other),
            ))
        }
    }
    Ok(())
}

fn parse_axis(fields: &[Vec<&str>], line_no: usize) -> Result<AxisBinding> {
    let mut binding = AxisBinding::default();
    let mut mode: Option<AxisMode> = None;

    for tokens in fields {
        let keyword = tokens[0].to_ascii_lowercase();
        let used = match keyword.as_str() {
            "dzone" => {
                binding.calibration.dead_zone = parse_zone(value(tokens, 1, line_no)?, line_no)?;
                2
            }
            "xzone" => {
                binding.calibration.extreme_zone = parse_zone(value(tokens, 1, line_no)?, line_no)?;
                2
            }
            "sens" => {
                let sensitivity: f32 = parse_number(value(tokens, 1, line_no)?, line_no)?;
                if !Calibration::sensitivity_in_range(sensitivity) {
                    return Err(BridgeError::layout(
                        line_no,
                        format!("Sensitivity {} out of range 1e-8..1e8", sensitivity),
                    ));
                }
                binding.calibration.sensitivity = sensitivity;
                2
            }
            "curve" => {
                let (curve, used) = parse_curve(tokens, line_no)?;
                binding.calibration.curve = curve;
                used
            }
            "throttle+" => {
                binding.calibration.throttle = Throttle::Positive;
                1
            }
            "throttle-" => {
                binding.calibration.throttle = Throttle::Negative;
                1
            }
            "+key" | "-key" | "+mouse" | "-mouse" => {
                let token = value(tokens, 1, line_no)?;
                let target = if keyword.ends_with("key") {
                    OutputTarget::Key(parse_key(token, line_no)?)
                } else {
                    OutputTarget::MouseButton(parse_mouse_button(token, line_no)?)
                };
                let (mut positive, mut negative) = match mode {
                    None => (None, None),
                    Some(AxisMode::Keys { positive, negative }) => (positive, negative),
                    Some(_) => return Err(conflicting_modes(line_no)),
                };
                if keyword.starts_with('+') {
                    positive = Some(target);
                } else {
                    negative = Some(target);
                }
                mode = Some(AxisMode::Keys { positive, negative });
                2
            }
            "mouse" | "absolute" => {
                if mode.is_some() {
                    return Err(conflicting_modes(line_no));
                }
                let direction = parse_direction(value(tokens, 1, line_no)?, line_no)?;
                mode = Some(if keyword == "mouse" {
                    AxisMode::Mouse(direction)
                } else {
                    AxisMode::Absolute(direction)
                });
                2
            }
            "maxspeed" => {
                let speed: u32 = parse_number(value(tokens, 1, line_no)?, line_no)?;
                if !MAX_SPEED_RANGE.contains(&speed) {
                    return Err(BridgeError::layout(
                        line_no,
                        format!("maxSpeed {} out of range 1..5000", speed),
                    ));
                }
                binding.max_speed = speed;
                2
            }
            _ => return Err(unknown_keyword(tokens[0], line_no)),
        };
        expect_consumed(tokens, used, line_no)?;
    }

    if let Some(mode) = mode {
        binding.mode = mode;
    }
    Ok(binding)
}

fn parse_button(fields: &[Vec<&str>], line_no: usize) -> Result<ButtonBinding> {
    let mut binding = ButtonBinding::default();

    for tokens in fields {
        let (action, used) = match tokens[0].to_ascii_lowercase().as_str() {
            "key" => {
                let code = parse_key(value(tokens, 1, line_no)?, line_no)?;
                (Some(ButtonAction::Key(code)), 2)
            }
            "mouse" => {
                let index = parse_mouse_button(value(tokens, 1, line_no)?, line_no)?;
                (Some(ButtonAction::MouseButton(index)), 2)
            }
            "absolute" => {
                let x = parse_percent(value(tokens, 1, line_no)?, line_no)?;
                let y = parse_percent(value(tokens, 2, line_no)?, line_no)?;
                (Some(ButtonAction::Absolute { x, y }), 3)
            }
            "sticky" => {
                binding.sticky = true;
                (None, 1)
            }
            "rapidfire" => {
                binding.rapidfire = true;
                (None, 1)
            }
            _ => return Err(unknown_keyword(tokens[0], line_no)),
        };
        expect_consumed(tokens, used, line_no)?;

        if let Some(action) = action {
            if binding.action.is_some() {
                return Err(BridgeError::layout(line_no, "Button bound to more than one action"));
            }
            binding.action = Some(action);
        }
    }
    Ok(binding)
}

fn parse_curve(tokens: &[&str], line_no: usize) -> Result<(Curve, usize)> {
    let name = value(tokens, 1, line_no)?;
    match name.to_ascii_lowercase().as_str() {
        "linear" => Ok((Curve::Linear, 2)),
        "quadratic" => Ok((Curve::Quadratic, 2)),
        "cubic" => Ok((Curve::Cubic, 2)),
        "expo" => {
            let factor: f32 = parse_number(value(tokens, 2, line_no)?, line_no)?;
            if !(0.0..=1.0).contains(&factor) {
                return Err(BridgeError::layout(
                    line_no,
                    format!("Expo factor {} out of range 0..1", factor),
                ));
            }
            Ok((Curve::Expo(factor), 3))
        }
        _ => Err(BridgeError::layout(line_no, format!("Unknown curve '{}'", name))),
    }
}

fn parse_direction(token: &str, line_no: usize) -> Result<MouseDirection> {
    let (inverted, axis) = match token.to_ascii_lowercase().as_str() {
        "+h" => (false, PointerAxis::Horizontal),
        "-h" => (true, PointerAxis::Horizontal),
        "+v" => (false, PointerAxis::Vertical),
        "-v" => (true, PointerAxis::Vertical),
        _ => {
            return Err(BridgeError::layout(
                line_no,
                format!("Expected +h, -h, +v or -v, found '{}'", token),
            ))
        }
    };
    Ok(MouseDirection { axis, inverted })
}

fn expect_consumed(tokens: &[&str], used: usize, line_no: usize) -> Result<()> {
    match tokens.get(used) {
        Some(extra) => Err(BridgeError::layout(
            line_no,
            format!("Unexpected '{}' after '{}'", extra, tokens[0]),
        )),
        None => Ok(()),
    }
}

fn value<'a>(tokens: &[&'a str], position: usize, line_no: usize) -> Result<&'a str> {
    tokens.get(position).copied().ok_or_else(|| {
        BridgeError::layout(line_no, format!("Missing value for '{}'", tokens[0]))
    })
}

fn parse_number<T: std::str::FromStr>(token: &str, line_no: usize) -> Result<T> {
    token
        .parse()
        .map_err(|_| BridgeError::layout(line_no, format!("Malformed number '{}'", token)))
}

fn parse_zone(token: &str, line_no: usize) -> Result<i32> {
    let zone: i32 = parse_number(token, line_no)?;
    if !(0..=JOY_MAX).contains(&zone) {
        return Err(BridgeError::layout(
            line_no,
            format!("Zone {} out of range 0..{}", zone, JOY_MAX),
        ));
    }
    Ok(zone)
}

fn parse_key(token: &str, line_no: usize) -> Result<u16> {
    let code: u16 = parse_number(token, line_no)?;
    if !is_advertised_key(code) {
        return Err(BridgeError::layout(
            line_no,
            format!("Key code {} cannot be synthesized", code),
        ));
    }
    Ok(code)
}

fn parse_mouse_button(token: &str, line_no: usize) -> Result<u8> {
    let index: u8 = parse_number(token, line_no)?;
    if index == 0 {
        return Err(BridgeError::layout(line_no, "Mouse buttons start at 1"));
    }
    Ok(index)
}

fn parse_percent(token: &str, line_no: usize) -> Result<i32> {
    let percent: i32 = parse_number(token, line_no)?;
    if !PERCENT_RANGE.contains(&percent) {
        return Err(BridgeError::layout(
            line_no,
            format!("Position {} out of range -100..100", percent),
        ));
    }
    Ok(percent)
}

fn conflicting_modes(line_no: usize) -> BridgeError {
    BridgeError::layout(line_no, "Axis bound to more than one mode")
}

fn unknown_keyword(keyword: &str, line_no: usize) -> BridgeError {
    BridgeError::layout(line_no, format!("Unknown keyword '{}'", keyword))
}

/// Splits off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], &s[end..]),
        None => (s, ""),
    }
}

//! line protocol spoken by the gate controller over the serial port
//!
//! device -> host: `D:<distance>,M:<0|1>` per line
//! host -> device: `<angle>\n`

use serde_json::{json, Value};

/// parse one device line into a `sensor` payload
///
/// returns `None` for boot chatter, debug prints and anything else that is
/// not a data line.
pub fn parse_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if !line.starts_with("D:") || !line.contains(",M:") {
        return None;
    }

    let (dist_part, mov_part) = line.split_once(',')?;
    let dist: i64 = dist_part.strip_prefix("D:")?.trim().parse().ok()?;
    let mov: i64 = mov_part
        .strip_prefix("M:")?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()?;

    Some(json!({ "dist": dist, "mov": mov }))
}

/// encode a servo angle for the device
pub fn format_command(angle: f64) -> String {
    format!("{}\n", angle)
}

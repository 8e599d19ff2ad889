//! Human-readable rendering of replies.
//!
//! Ticks are shown with a breakdown into days, hours, minutes and seconds;
//! counters get thousands separators; everything else prints as is.

use std::time::Duration;

use snmp_core::protocol::{ErrorStatus, Oid, Value, VarBind};

use crate::session::Response;

const TICKS_PER_MINUTE: u32 = 60 * 100;
const TICKS_PER_HOUR: u32 = 60 * TICKS_PER_MINUTE;
const TICKS_PER_DAY: u32 = 24 * TICKS_PER_HOUR;

/// Width of the separator printed under the bulk summary.
pub const SEPARATOR_WIDTH: usize = 60;

/// `"{ticks} (D days, H hours, M minutes, S.SS seconds)"`, omitting zero
/// parts. Seconds are always shown when every other part is zero.
#[must_use]
pub fn format_ticks(ticks: u32) -> String {
    let days = ticks / TICKS_PER_DAY;
    let hours = ticks % TICKS_PER_DAY / TICKS_PER_HOUR;
    let minutes = ticks % TICKS_PER_HOUR / TICKS_PER_MINUTE;
    let hundredths = ticks % TICKS_PER_MINUTE;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days} days"));
    }
    if hours > 0 {
        parts.push(format!("{hours} hours"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} minutes"));
    }
    if hundredths > 0 || parts.is_empty() {
        parts.push(format!("{}.{:02} seconds", hundredths / 100, hundredths % 100));
    }
    format!("{ticks} ({})", parts.join(", "))
}

/// Decimal with `,` between groups of three digits.
#[must_use]
pub fn format_counter(count: u32) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

/// Render a value for display.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Ticks(ticks) => format_ticks(*ticks),
        Value::Counter(count) => format_counter(*count),
        Value::Integer(_) | Value::Text(_) => value.to_string(),
    }
}

/// `"oid = value"`.
#[must_use]
pub fn format_binding(binding: &VarBind) -> String {
    format!("{} = {}", binding.oid, format_value(&binding.value))
}

/// Message shown for a non-success status.
#[must_use]
pub const fn status_message(status: ErrorStatus) -> &'static str {
    match status {
        ErrorStatus::Success => "Success",
        ErrorStatus::NoSuchObject => "No such OID exists",
        ErrorStatus::BadValue => "Bad value for OID type",
        ErrorStatus::ReadOnly => "OID is read-only",
    }
}

/// Output lines for a `get` reply.
#[must_use]
pub fn render_get(response: &Response) -> Vec<String> {
    if !response.is_success() {
        return vec![error_line(response.status)];
    }
    response.bindings.iter().map(format_binding).collect()
}

/// Output lines for a `set` reply.
#[must_use]
pub fn render_set(response: &Response) -> Vec<String> {
    if !response.is_success() {
        return vec![error_line(response.status)];
    }
    std::iter::once("Set operation successful:".to_string())
        .chain(response.bindings.iter().map(format_binding))
        .collect()
}

/// Line printed before a bulk request is sent.
#[must_use]
pub fn bulk_banner(start: &Oid, max_repetitions: u16) -> String {
    format!("Requesting up to {max_repetitions} OIDs starting after {start}...")
}

/// Output lines for a bulk reply received after `elapsed`.
#[must_use]
pub fn render_bulk(response: &Response, elapsed: Duration) -> Vec<String> {
    if !response.is_success() {
        return vec![error_line(response.status)];
    }
    let mut lines = Vec::with_capacity(response.bindings.len() + 2);
    lines.push(format!(
        "Received {} OIDs in {:.3} seconds ({} bytes)",
        response.bindings.len(),
        elapsed.as_secs_f64(),
        response.wire_size
    ));
    lines.push("-".repeat(SEPARATOR_WIDTH));
    lines.extend(response.bindings.iter().map(format_binding));
    lines
}

fn error_line(status: ErrorStatus) -> String {
    format!("Error: {}", status_message(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: ErrorStatus, bindings: Vec<VarBind>) -> Response {
        Response {
            request_id: 1,
            status,
            bindings,
            wire_size: 123,
        }
    }

    fn binding(oid: &str, value: Value) -> VarBind {
        VarBind::new(oid.parse().unwrap(), value)
    }

    #[test]
    fn test_format_ticks() {
        assert_eq!(format_ticks(0), "0 (0.00 seconds)");
        assert_eq!(format_ticks(150), "150 (1.50 seconds)");
        assert_eq!(format_ticks(6000), "6000 (1 minutes)");
        assert_eq!(format_ticks(360_000), "360000 (1 hours)");
        assert_eq!(
            format_ticks(8_640_000 + 360_000 * 2 + 6000 * 3 + 456),
            "9378456 (1 days, 2 hours, 3 minutes, 4.56 seconds)"
        );
        assert_eq!(
            format_ticks(u32::MAX),
            "4294967295 (497 days, 2 hours, 27 minutes, 52.95 seconds)"
        );
    }

    #[test]
    fn test_format_counter() {
        assert_eq!(format_counter(0), "0");
        assert_eq!(format_counter(999), "999");
        assert_eq!(format_counter(1000), "1,000");
        assert_eq!(format_counter(456_789), "456,789");
        assert_eq!(format_counter(3_456_789_012), "3,456,789,012");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Integer(-1)), "-1");
        assert_eq!(format_value(&Value::Text("eth0".into())), "eth0");
        assert_eq!(format_value(&Value::Counter(1_234_567)), "1,234,567");
        assert_eq!(format_value(&Value::Ticks(100)), "100 (1.00 seconds)");
    }

    #[test]
    fn test_render_get() {
        let ok = response(
            ErrorStatus::Success,
            vec![binding("1.3.6.1.2.1.1.5.0", Value::Text("router-main".into()))],
        );
        assert_eq!(render_get(&ok), ["1.3.6.1.2.1.1.5.0 = router-main"]);

        let missing = response(ErrorStatus::NoSuchObject, vec![]);
        assert_eq!(render_get(&missing), ["Error: No such OID exists"]);
    }

    #[test]
    fn test_render_set() {
        let ok = response(
            ErrorStatus::Success,
            vec![binding("1.3.6.1.2.1.1.5.0", Value::Text("core-1".into()))],
        );
        assert_eq!(
            render_set(&ok),
            ["Set operation successful:", "1.3.6.1.2.1.1.5.0 = core-1"]
        );
        assert_eq!(
            render_set(&response(ErrorStatus::ReadOnly, vec![])),
            ["Error: OID is read-only"]
        );
        assert_eq!(
            render_set(&response(ErrorStatus::BadValue, vec![])),
            ["Error: Bad value for OID type"]
        );
    }

    #[test]
    fn test_render_bulk() {
        let start: Oid = "1.3.6.1.2.1.2.2.1.10".parse().unwrap();
        assert_eq!(
            bulk_banner(&start, 50),
            "Requesting up to 50 OIDs starting after 1.3.6.1.2.1.2.2.1.10..."
        );

        let reply = response(
            ErrorStatus::Success,
            vec![
                binding("1.3.6.1.2.1.2.2.1.10.1", Value::Counter(3_456_789_012)),
                binding("1.3.6.1.2.1.2.2.1.10.2", Value::Counter(1_876_543_210)),
            ],
        );
        let lines = render_bulk(&reply, Duration::from_millis(12));
        assert_eq!(lines[0], "Received 2 OIDs in 0.012 seconds (123 bytes)");
        assert_eq!(lines[1], "-".repeat(60));
        assert_eq!(lines[2], "1.3.6.1.2.1.2.2.1.10.1 = 3,456,789,012");
        assert_eq!(lines.len(), 4);
    }
}

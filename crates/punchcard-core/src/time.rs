//! Time-string parsing and normalization helpers
//!
//! The target application is inconsistent about zero-padding: a field may
//! render `9:00` after the automation typed `09:00`. Every comparison against
//! a live field value therefore goes through [`normalize_clock`] first.

/// Normalize a clock string for comparison: strip the leading zero on the
/// hour component, zero-pad the minute component (`"09:5"` -> `"9:05"`).
///
/// Strings without a `:` or with non-numeric components are returned
/// unchanged; callers compare whatever the page gave them.
pub fn normalize_clock(raw: &str) -> String {
    let raw = raw.trim();
    let Some((h, m)) = raw.split_once(':') else {
        return raw.to_string();
    };
    match (h.trim().parse::<u32>(), m.trim().parse::<u32>()) {
        (Ok(h), Ok(m)) => format!("{}:{:02}", h, m),
        _ => raw.to_string(),
    }
}

/// Parse an `H:MM` duration into minutes. Hours are unbounded, minutes must
/// be in `0..60`.
pub fn parse_duration_minutes(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    if m >= 60 {
        return None;
    }
    Some(h * 60 + m)
}

/// Format minutes as an `H:MM` duration (`450` -> `"7:30"`).
pub fn format_duration(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_leading_zero_hour() {
        assert_eq!(normalize_clock("09:00"), "9:00");
        assert_eq!(normalize_clock("22:00"), "22:00");
        assert_eq!(normalize_clock("9:00"), "9:00");
    }

    #[test]
    fn normalize_pads_minutes() {
        assert_eq!(normalize_clock("9:5"), "9:05");
        assert_eq!(normalize_clock(" 12:30 "), "12:30");
    }

    #[test]
    fn normalize_passes_through_garbage() {
        assert_eq!(normalize_clock(""), "");
        assert_eq!(normalize_clock("soon"), "soon");
        assert_eq!(normalize_clock("a:b"), "a:b");
    }

    #[test]
    fn normalized_forms_compare_equal() {
        // The idempotence check of the safe input primitive rests on this.
        assert_eq!(normalize_clock("09:00"), normalize_clock("9:00"));
        assert_eq!(normalize_clock("08:5"), normalize_clock("8:05"));
    }

    #[test]
    fn duration_round_trip() {
        assert_eq!(parse_duration_minutes("7:30"), Some(450));
        assert_eq!(parse_duration_minutes("0:00"), Some(0));
        assert_eq!(parse_duration_minutes("12:59"), Some(779));
        assert_eq!(format_duration(450), "7:30");
        assert_eq!(format_duration(5), "0:05");
    }

    #[test]
    fn duration_rejects_bad_minutes() {
        assert_eq!(parse_duration_minutes("1:60"), None);
        assert_eq!(parse_duration_minutes("90"), None);
        assert_eq!(parse_duration_minutes("1:xx"), None);
    }
}

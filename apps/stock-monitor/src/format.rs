use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Zone used for every human-facing timestamp (chart labels, last-update slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    Local,
    Fixed(FixedOffset),
}

impl DisplayZone {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Accepts `Z`, `UTC`, `+05:30`, `-0800` style offsets.
    pub fn parse_offset(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
            return Some(Self::utc());
        }
        let (sign, rest) = match trimmed.chars().next()? {
            '+' => (1, &trimmed[1..]),
            '-' => (-1, &trimmed[1..]),
            _ => return None,
        };
        let digits: String = rest.chars().filter(|ch| *ch != ':').collect();
        if digits.len() != 4 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        let hours: i32 = digits[..2].parse().ok()?;
        let minutes: i32 = digits[2..].parse().ok()?;
        if minutes >= 60 {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).map(Self::Fixed)
    }

    pub fn time_of_day(&self, ts: DateTime<Utc>) -> String {
        self.render(ts, TIME_OF_DAY_FORMAT)
    }

    pub fn timestamp(&self, ts: DateTime<Utc>) -> String {
        self.render(ts, TIMESTAMP_FORMAT)
    }

    fn render(&self, ts: DateTime<Utc>, fmt: &str) -> String {
        match self {
            DisplayZone::Local => ts.with_timezone(&Local).format(fmt).to_string(),
            DisplayZone::Fixed(offset) => ts.with_timezone(offset).format(fmt).to_string(),
        }
    }
}

/// Two-decimal rounding applied to every percentage that leaves the core.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_common_offset_spellings() {
        assert_eq!(DisplayZone::parse_offset("UTC"), Some(DisplayZone::utc()));
        assert_eq!(
            DisplayZone::parse_offset("+05:30"),
            FixedOffset::east_opt(19_800).map(DisplayZone::Fixed)
        );
        assert_eq!(
            DisplayZone::parse_offset("-0800"),
            FixedOffset::west_opt(28_800).map(DisplayZone::Fixed)
        );
        assert_eq!(DisplayZone::parse_offset("05:30"), None);
        assert_eq!(DisplayZone::parse_offset("+5:3"), None);
        assert_eq!(DisplayZone::parse_offset("+01:75"), None);
    }

    #[test]
    fn renders_in_the_configured_offset() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 23, 15, 7).unwrap();
        let zone = DisplayZone::parse_offset("+02:00").unwrap();
        assert_eq!(zone.time_of_day(ts), "01:15:07");
        assert_eq!(zone.timestamp(ts), "2025-03-02 01:15:07");
        assert_eq!(DisplayZone::utc().time_of_day(ts), "23:15:07");
    }

    #[test]
    fn round2_keeps_sign() {
        assert_eq!(round2(4.000000000000001), 4.0);
        assert_eq!(round2(-6.004), -6.0);
        assert_eq!(round2(1.236), 1.24);
    }
}

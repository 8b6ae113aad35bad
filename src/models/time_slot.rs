//! Time slot model.
//!
//! A time slot is a named interval within one day, scoped to a single
//! generation run. Overlap is evaluated on the open interval: slots
//! that merely touch (one ends when the other starts) do not overlap.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named `[start, end)` interval within a day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Display name (e.g., "Slot 1").
    pub name: String,
    /// Start of the slot.
    pub start: NaiveTime,
    /// End of the slot.
    pub end: NaiveTime,
}

/// Raw slot as submitted by a client (`"09:30"`-style bounds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotInput {
    pub slot_name: String,
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlotInput {
    /// Creates a raw slot.
    pub fn new(
        slot_name: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            slot_name: slot_name.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}

impl TimeSlot {
    /// Creates a new time slot.
    pub fn new(name: impl Into<String>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Parses a slot from `"HH:MM"` or `"HH:MM:SS"` bounds.
    pub fn parse(
        name: impl Into<String>,
        start: &str,
        end: &str,
    ) -> Result<Self, chrono::ParseError> {
        Ok(Self::new(name, parse_time(start)?, parse_time(end)?))
    }

    /// Whether `start < end`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Whether two slots overlap (`start_a < end_b && start_b < end_a`).
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}–{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot::parse("S", start, end).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        let a = slot("09:30", "12:30");
        let b = slot("09:30:00", "12:30:00");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "09:30–12:30");
        assert!(TimeSlot::parse("S", "9.30", "12:30").is_err());
    }

    #[test]
    fn test_overlap() {
        let a = slot("09:00", "11:00");
        let b = slot("10:00", "12:00");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = slot("11:00", "13:00"); // touching
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_validity() {
        assert!(slot("09:00", "11:00").is_valid());
        assert!(!slot("11:00", "09:00").is_valid());
        assert!(!slot("11:00", "11:00").is_valid());
    }
}

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An open start time the backend offered for one staff/service/date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub date: NaiveDate,
    /// Business-local wall-clock time exactly as the backend sent it.
    pub start_time: String,
}

/// The (staff, service, date) triple a slot list was fetched for.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotKey {
    pub staff_id: String,
    pub service_id: String,
    pub date: NaiveDate,
}

impl Slot {
    /// Whether `time` names this slot. `"9:00"` and `"09:00"` are the same.
    pub fn matches(&self, time: &str) -> bool {
        let time = time.trim();
        if self.start_time == time {
            return true;
        }
        match (parse_clock(&self.start_time), parse_clock(time)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Parses the `availableSlots` payload. Entries may be objects
    /// (`{date, startTime, available}`) or bare `"HH:MM"` strings. Closed
    /// slots are dropped and a missing date falls back to `requested`.
    /// Entries dated any other day than `requested` are dropped.
    pub fn list_from_response(value: &Value, requested: NaiveDate) -> Vec<Slot> {
        let entries = value
            .get("availableSlots")
            .or_else(|| value.get("slots"))
            .unwrap_or(value)
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut slots: Vec<Slot> = entries
            .iter()
            .filter_map(|entry| parse_entry(entry, requested))
            .filter(|slot| slot.date == requested)
            .collect();

        slots.sort_by(|a, b| {
            (a.date, parse_clock(&a.start_time), &a.start_time)
                .cmp(&(b.date, parse_clock(&b.start_time), &b.start_time))
        });
        slots.dedup();
        slots
    }
}

fn parse_entry(entry: &Value, requested: NaiveDate) -> Option<Slot> {
    if let Some(time) = entry.as_str() {
        return Some(Slot {
            date: requested,
            start_time: time.trim().to_string(),
        });
    }

    if entry["available"].as_bool() == Some(false) {
        return None;
    }

    let start_time = entry["startTime"]
        .as_str()
        .or_else(|| entry["time"].as_str())
        .or_else(|| entry["start"].as_str())?
        .trim()
        .to_string();
    if start_time.is_empty() {
        return None;
    }

    let date = entry["date"]
        .as_str()
        .and_then(|d| NaiveDate::parse_from_str(d.get(..10).unwrap_or(d), "%Y-%m-%d").ok())
        .unwrap_or(requested);

    Some(Slot { date, start_time })
}

/// Parses `H:MM`, `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

//! Timestamp parsing over a fixed set of layouts.
//!
//! Layouts are tried in order until one accepts the text. The order adapts: whichever layout
//! succeeded last moves to the front, so a service that always receives RFC-3339 stops paying
//! for the layouts ahead of it. Reordering never changes *which* values parse, only how fast.
//!
//! Layouts without zone information produce UTC. The time-only layout anchors on
//! `0000-01-01`.

use crate::error::CoercionErrorKind;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::sync::{LazyLock, PoisonError, RwLock};

/// A textual timestamp layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `2006-01-02 15:04:05`
    DateTime,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `2006-01-02T15:04:05.999999999Z07:00`
    Rfc3339Nano,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `Mon Jan  2 15:04:05 2006`
    Ansic,
    /// `2006-01-02`
    DateOnly,
    /// `15:04:05`
    TimeOnly,
}

impl Layout {
    /// Every layout, in the initial trial order.
    pub const ALL: [Self; 8] = [
        Self::DateTime,
        Self::Rfc3339,
        Self::Rfc3339Nano,
        Self::Rfc1123,
        Self::Rfc1123Z,
        Self::Ansic,
        Self::DateOnly,
        Self::TimeOnly,
    ];

    /// Parse `raw` with this layout only.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::DateTime => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(utc),
            Self::Rfc3339 => {
                if raw.contains('.') {
                    return None;
                }
                DateTime::parse_from_rfc3339(raw).ok()
            }
            Self::Rfc3339Nano => DateTime::parse_from_rfc3339(raw).ok(),
            Self::Rfc1123 => parse_rfc1123(raw),
            Self::Rfc1123Z => DateTime::parse_from_str(raw, "%a, %d %b %Y %H:%M:%S %z").ok(),
            Self::Ansic => NaiveDateTime::parse_from_str(raw, "%a %b %e %H:%M:%S %Y")
                .ok()
                .map(utc),
            Self::DateOnly => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| utc(date.and_time(NaiveTime::MIN))),
            Self::TimeOnly => {
                let time = NaiveTime::parse_from_str(raw, "%H:%M:%S").ok()?;
                NaiveDate::from_ymd_opt(0, 1, 1).map(|date| utc(date.and_time(time)))
            }
        }
    }
}

fn utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&naive).fixed_offset()
}

/// RFC-1123 with a zone abbreviation. Abbreviations unknown to RFC-2822 are read as UTC.
fn parse_rfc1123(raw: &str) -> Option<DateTime<FixedOffset>> {
    let (head, zone) = raw.rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    DateTime::parse_from_rfc2822(raw).ok().or_else(|| {
        NaiveDateTime::parse_from_str(head, "%a, %d %b %Y %H:%M:%S")
            .ok()
            .map(utc)
    })
}

/// A list whose last successful element is tried first next time.
#[derive(Debug)]
pub struct LastSuccessOrder<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Copy + PartialEq> LastSuccessOrder<T> {
    /// Create a list in the given initial order.
    #[must_use]
    pub fn new(items: impl Into<Vec<T>>) -> Self {
        Self {
            items: RwLock::new(items.into()),
        }
    }

    /// Current trial order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Move `item` to the front.
    pub fn promote(&self, item: T) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter().position(|i| *i == item) {
            Some(pos) if pos > 0 => {
                let found = items.remove(pos);
                items.insert(0, found);
            }
            _ => {}
        }
    }

    /// Try each item in order and promote the first that yields a value.
    pub fn find_map<R>(&self, mut f: impl FnMut(T) -> Option<R>) -> Option<R> {
        let order = self.snapshot();
        for (pos, item) in order.into_iter().enumerate() {
            if let Some(found) = f(item) {
                if pos > 0 {
                    self.promote(item);
                }
                return Some(found);
            }
        }
        None
    }
}

static LAYOUTS: LazyLock<LastSuccessOrder<Layout>> =
    LazyLock::new(|| LastSuccessOrder::new(Layout::ALL));

/// Parse `raw` with the first layout that accepts it.
///
/// # Errors
///
/// Returns [`CoercionErrorKind::Timestamp`] when no layout accepts the text.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, CoercionErrorKind> {
    LAYOUTS
        .find_map(|layout| layout.parse(raw))
        .ok_or_else(|| CoercionErrorKind::Timestamp {
            value: raw.to_string(),
        })
}

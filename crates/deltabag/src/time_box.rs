//! Observable point-in-time values.
//!
//! A [`TimeBox`] wraps a mutable instant whose components (year, month,
//! hour, …) can be set in place. After every in-place mutation the box
//! reports itself to its owning tracked node through a registered
//! callback, so the mutation is recorded exactly as if the whole value
//! had been reassigned to its key.

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Timelike, Utc};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback fired after every in-place mutation, receiving the box.
pub type Notify = Rc<dyn Fn(&TimeBox)>;

struct Inner {
    value: DateTime<Utc>,
    notify: Option<Notify>,
}

/// A mutable point-in-time value observable by a tracked node.
///
/// Cloning clones the handle: both handles mutate the same instant. Use
/// [`TimeBox::detached`] for an independent value copy without a
/// callback.
#[derive(Clone)]
pub struct TimeBox {
    inner: Rc<RefCell<Inner>>,
}

impl TimeBox {
    pub fn new(value: DateTime<Utc>) -> TimeBox {
        TimeBox {
            inner: Rc::new(RefCell::new(Inner {
                value,
                notify: None,
            })),
        }
    }

    /// The current instant.
    pub fn value(&self) -> DateTime<Utc> {
        self.inner.borrow().value
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.inner.borrow().value.timestamp_millis()
    }

    /// The instant rendered as an RFC 3339 string with millisecond
    /// precision — the form boxes take in materialized diffs.
    pub fn to_value(&self) -> Value {
        Value::String(
            self.inner
                .borrow()
                .value
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }

    /// Same underlying cell.
    pub fn ptr_eq(a: &TimeBox, b: &TimeBox) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// An independent copy of the current instant, with no callback.
    pub fn detached(&self) -> TimeBox {
        TimeBox::new(self.value())
    }

    pub(crate) fn register(&self, notify: Notify) {
        self.inner.borrow_mut().notify = Some(notify);
    }

    /// Detach the callback. A stale box superseded at its key keeps
    /// working as a plain mutable instant but no longer reports.
    pub fn unregister(&self) {
        self.inner.borrow_mut().notify = None;
    }

    // ── In-place mutators ─────────────────────────────────────────────────

    /// Set the instant from milliseconds since the Unix epoch.
    pub fn set_timestamp_millis(&self, millis: i64) -> i64 {
        self.apply(|_| Utc.timestamp_millis_opt(millis).single())
    }

    /// Set the millisecond component.
    pub fn set_milliseconds(&self, milliseconds: u32) -> i64 {
        self.apply(|v| {
            milliseconds
                .checked_mul(1_000_000)
                .and_then(|nanos| v.with_nanosecond(nanos))
        })
    }

    /// Set the second component.
    pub fn set_seconds(&self, seconds: u32) -> i64 {
        self.apply(|v| v.with_second(seconds))
    }

    /// Set the minute component.
    pub fn set_minutes(&self, minutes: u32) -> i64 {
        self.apply(|v| v.with_minute(minutes))
    }

    /// Set the hour component.
    pub fn set_hours(&self, hours: u32) -> i64 {
        self.apply(|v| v.with_hour(hours))
    }

    /// Set the day-of-month component (1-based).
    pub fn set_day(&self, day: u32) -> i64 {
        self.apply(|v| v.with_day(day))
    }

    /// Set the month component (1-based).
    pub fn set_month(&self, month: u32) -> i64 {
        self.apply(|v| v.with_month(month))
    }

    /// Set the year component.
    pub fn set_year(&self, year: i32) -> i64 {
        self.apply(|v| v.with_year(year))
    }

    /// Apply one mutation, then notify. Out-of-range components leave the
    /// instant unchanged; the notification still fires and the owning
    /// node's equality check decides whether anything is recorded.
    fn apply(&self, f: impl FnOnce(DateTime<Utc>) -> Option<DateTime<Utc>>) -> i64 {
        let (stamp, notify) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(next) = f(inner.value) {
                inner.value = next;
            }
            (inner.value.timestamp_millis(), inner.notify.clone())
        };
        if let Some(notify) = notify {
            notify(self);
        }
        stamp
    }
}

impl fmt::Debug for TimeBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeBox({})", self.value().to_rfc3339())
    }
}

/// Boxes compare by their instant, not by cell identity.
impl PartialEq for TimeBox {
    fn eq(&self, other: &TimeBox) -> bool {
        self.value() == other.value()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

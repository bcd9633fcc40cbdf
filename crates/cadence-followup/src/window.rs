// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business-hour window in tenant local time.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike, Utc};

use cadence_core::types::FollowUpConfig;
use cadence_core::CadenceError;

/// Hours of the day during which proactive sends are allowed.
///
/// `start < end` is `[start, end)`; `start > end` wraps past midnight;
/// `start == end` is always open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessWindow {
    start_hour: u32,
    end_hour: u32,
    offset: FixedOffset,
}

impl BusinessWindow {
    pub fn new(start_hour: u8, end_hour: u8, utc_offset_minutes: i32) -> Result<Self, CadenceError> {
        if start_hour > 23 || end_hour > 23 {
            return Err(CadenceError::Validation(format!(
                "business hours must be within 0-23, got {start_hour}-{end_hour}"
            )));
        }
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                CadenceError::Validation(format!("utc offset out of range: {utc_offset_minutes} minutes"))
            })?;
        Ok(Self {
            start_hour: u32::from(start_hour),
            end_hour: u32::from(end_hour),
            offset,
        })
    }

    pub fn from_config(config: &FollowUpConfig) -> Result<Self, CadenceError> {
        Self::new(config.start_hour, config.end_hour, config.utc_offset_minutes)
    }

    fn contains_hour(&self, hour: u32) -> bool {
        match self.start_hour.cmp(&self.end_hour) {
            std::cmp::Ordering::Equal => true,
            std::cmp::Ordering::Less => self.start_hour <= hour && hour < self.end_hour,
            std::cmp::Ordering::Greater => hour >= self.start_hour || hour < self.end_hour,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.contains_hour(at.with_timezone(&self.offset).hour())
    }

    /// `at` itself when the window is open, else the next window start.
    pub fn next_open(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        if self.contains(at) {
            return at;
        }
        let local = at.with_timezone(&self.offset);
        // Outside the window the start is either later today or tomorrow.
        let day = if local.hour() < self.start_hour {
            local.date_naive()
        } else {
            local.date_naive() + Duration::days(1)
        };
        let Some(start) = day.and_hms_opt(self.start_hour, 0, 0) else {
            return at;
        };
        match self.offset.from_local_datetime(&start).single() {
            Some(open) => open.with_timezone(&Utc),
            None => at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn plain_window_is_half_open() {
        let w = BusinessWindow::new(8, 22, 0).unwrap();
        assert!(!w.contains(utc(7, 59)));
        assert!(w.contains(utc(8, 0)));
        assert!(w.contains(utc(21, 59)));
        assert!(!w.contains(utc(22, 0)));
        assert!(!w.contains(utc(23, 0)));
    }

    #[test]
    fn wrapping_window() {
        let w = BusinessWindow::new(20, 6, 0).unwrap();
        assert!(w.contains(utc(23, 0)));
        assert!(w.contains(utc(2, 0)));
        assert!(!w.contains(utc(6, 0)));
        assert!(!w.contains(utc(12, 0)));
        assert_eq!(w.next_open(utc(12, 0)), utc(20, 0));
    }

    #[test]
    fn equal_bounds_means_always_open() {
        let w = BusinessWindow::new(9, 9, 0).unwrap();
        for h in 0..24 {
            assert!(w.contains(utc(h, 30)));
        }
    }

    #[test]
    fn next_open_rolls_to_tomorrow_after_close() {
        let w = BusinessWindow::new(8, 22, 0).unwrap();
        assert_eq!(w.next_open(utc(10, 0)), utc(10, 0));
        assert_eq!(w.next_open(utc(6, 15)), utc(8, 0));
        assert_eq!(
            w.next_open(utc(23, 0)),
            Utc.with_ymd_and_hms(2026, 3, 3, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn offset_shifts_into_local_time() {
        // UTC-3: 23:00 UTC is 20:00 local, inside 8-22.
        let w = BusinessWindow::new(8, 22, -180).unwrap();
        assert!(w.contains(utc(23, 0)));
        // 02:00 UTC is 23:00 local the previous day; next open is 08:00 local = 11:00 UTC.
        assert!(!w.contains(utc(2, 0)));
        assert_eq!(w.next_open(utc(2, 0)), utc(11, 0));
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(BusinessWindow::new(24, 8, 0).is_err());
        assert!(BusinessWindow::new(8, 22, 24 * 60 * 60).is_err());
    }
}

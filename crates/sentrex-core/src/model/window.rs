//! Issue lookback windows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SentrexError;

/// Fixed lookback duration over which issues are queried.
///
/// Serialized as the same token Sentry's `age:-<window>` query uses, which is
/// also the key used in the persisted cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "14d")]
    FourteenDays,
}

impl TimeWindow {
    /// All windows in projection order.
    pub const ALL: [TimeWindow; 3] = [TimeWindow::OneHour, TimeWindow::OneDay, TimeWindow::FourteenDays];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::OneHour => "1h",
            TimeWindow::OneDay => "24h",
            TimeWindow::FourteenDays => "14d",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = SentrexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeWindow::OneHour),
            "24h" => Ok(TimeWindow::OneDay),
            "14d" => Ok(TimeWindow::FourteenDays),
            other => Err(SentrexError::Config(format!("unknown time window: {other}"))),
        }
    }
}

/// Set of enabled windows, iterated in `TimeWindow::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSet {
    one_hour: bool,
    one_day: bool,
    fourteen_days: bool,
}

impl WindowSet {
    pub fn new(one_hour: bool, one_day: bool, fourteen_days: bool) -> Self {
        Self { one_hour, one_day, fourteen_days }
    }

    pub fn only(window: TimeWindow) -> Self {
        let mut set = Self::default();
        set.enable(window);
        set
    }

    pub fn enable(&mut self, window: TimeWindow) {
        match window {
            TimeWindow::OneHour => self.one_hour = true,
            TimeWindow::OneDay => self.one_day = true,
            TimeWindow::FourteenDays => self.fourteen_days = true,
        }
    }

    pub fn contains(&self, window: TimeWindow) -> bool {
        match window {
            TimeWindow::OneHour => self.one_hour,
            TimeWindow::OneDay => self.one_day,
            TimeWindow::FourteenDays => self.fourteen_days,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.one_hour || self.one_day || self.fourteen_days)
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeWindow> + '_ {
        TimeWindow::ALL.into_iter().filter(|w| self.contains(*w))
    }
}

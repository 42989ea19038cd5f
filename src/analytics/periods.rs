use crate::domain::model::DateRange;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preset periods offered next to the date pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickRange {
    Last30Days,
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    ThisYear,
}

impl QuickRange {
    pub const ALL: [QuickRange; 6] = [
        QuickRange::Last30Days,
        QuickRange::Today,
        QuickRange::Yesterday,
        QuickRange::ThisWeek,
        QuickRange::ThisMonth,
        QuickRange::ThisYear,
    ];

    pub fn resolve(self, today: NaiveDate) -> DateRange {
        match self {
            QuickRange::Last30Days => DateRange::new(today - Duration::days(30), today),
            QuickRange::Today => DateRange::single(today),
            QuickRange::Yesterday => DateRange::single(today - Duration::days(1)),
            QuickRange::ThisWeek => {
                let monday =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                DateRange::new(monday, monday + Duration::days(6))
            }
            QuickRange::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                DateRange::new(first, last_day_of_month(today))
            }
            QuickRange::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                DateRange::new(first, today)
            }
        }
    }

    /// Value used in query strings and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            QuickRange::Last30Days => "last30",
            QuickRange::Today => "today",
            QuickRange::Yesterday => "yesterday",
            QuickRange::ThisWeek => "week",
            QuickRange::ThisMonth => "month",
            QuickRange::ThisYear => "year",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuickRange::Last30Days => "Ultimi 30 giorni",
            QuickRange::Today => "Oggi",
            QuickRange::Yesterday => "Ieri",
            QuickRange::ThisWeek => "Settimana",
            QuickRange::ThisMonth => "Mese in corso",
            QuickRange::ThisYear => "Anno corrente",
        }
    }
}

impl fmt::Display for QuickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for QuickRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuickRange::ALL
            .into_iter()
            .find(|q| q.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let keys: Vec<&str> = QuickRange::ALL.iter().map(|q| q.key()).collect();
                format!("unknown range '{}', expected one of: {}", s, keys.join(", "))
            })
    }
}

fn last_day_of_month(day: NaiveDate) -> NaiveDate {
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first_of_next| first_of_next - Duration::days(1))
        .unwrap_or(day)
}

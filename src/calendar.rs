use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::ValidationError;

pub const MIN_YEAR: i32 = 2016;
pub const MAX_YEAR: i32 = 2030;

/// The set of valid trade dates between `MIN_YEAR` and `MAX_YEAR`.
#[derive(Debug, Clone)]
pub struct Calendar {
    dates: BTreeSet<NaiveDate>,
}

impl Calendar {
    pub fn new() -> Self {
        let mut dates = BTreeSet::new();

        if let (Some(first), Some(last)) = (first_trade_date(), last_trade_date()) {
            let mut date = first;
            while date <= last {
                if is_weekday(date) && !is_holiday(date) {
                    dates.insert(date);
                }
                date += Duration::days(1);
            }
        }

        Calendar { dates }
    }

    /// Process-wide calendar, built on first use.
    pub fn known() -> &'static Calendar {
        static KNOWN: OnceLock<Calendar> = OnceLock::new();
        KNOWN.get_or_init(Calendar::new)
    }

    pub fn is_trade_date(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn min_trade_date(&self) -> Option<TradeDate> {
        self.dates.first().copied().map(TradeDate)
    }

    pub fn max_trade_date(&self) -> Option<TradeDate> {
        self.dates.last().copied().map(TradeDate)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn trade_dates(&self) -> impl Iterator<Item = TradeDate> + '_ {
        self.dates.iter().copied().map(TradeDate)
    }

    pub fn trade_dates_in_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<TradeDate>, ValidationError> {
        let invalid = || ValidationError::InvalidMonth { year, month };

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(invalid());
        }
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        Ok(self
            .dates
            .range(start..end)
            .copied()
            .map(TradeDate)
            .collect())
    }

    fn next_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.dates.range(date.succ_opt()?..).next().copied()
    }

    fn prev_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.dates.range(..date).next_back().copied()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new()
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_holiday(date: NaiveDate) -> bool {
    matches!((date.month(), date.day()), (1, 1) | (12, 25))
}

// First non-holiday Monday of MIN_YEAR.
fn first_trade_date() -> Option<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(MIN_YEAR, 1, 1)?;
    while date.weekday() != Weekday::Mon || is_holiday(date) {
        date = date.succ_opt()?;
    }
    Some(date)
}

// Last non-holiday Friday of MAX_YEAR.
fn last_trade_date() -> Option<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(MAX_YEAR, 12, 31)?;
    while date.weekday() != Weekday::Fri || is_holiday(date) {
        date = date.pred_opt()?;
    }
    Some(date)
}

/// A calendar date on which trading occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    pub fn new(date: NaiveDate) -> Result<Self, ValidationError> {
        Self::with_calendar(Calendar::known(), date)
    }

    pub fn with_calendar(calendar: &Calendar, date: NaiveDate) -> Result<Self, ValidationError> {
        if calendar.is_trade_date(date) {
            Ok(TradeDate(date))
        } else {
            Err(ValidationError::NotATradeDate(date))
        }
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, ValidationError> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ValidationError::InvalidMonth { year, month })?;
        Self::new(date)
    }

    /// Days elapsed since 0001-01-01.
    pub fn from_day_number(day_number: i32) -> Result<Self, ValidationError> {
        let date = day_number
            .checked_add(1)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .ok_or(ValidationError::TimeOverflow)?;
        Self::new(date)
    }

    pub fn day_number(self) -> i32 {
        self.0.num_days_from_ce() - 1
    }

    pub fn value(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn next(self) -> Result<Self, ValidationError> {
        Calendar::known()
            .next_after(self.0)
            .map(TradeDate)
            .ok_or(ValidationError::NotATradeDate(self.0))
    }

    pub fn prev(self) -> Result<Self, ValidationError> {
        Calendar::known()
            .prev_before(self.0)
            .map(TradeDate)
            .ok_or(ValidationError::NotATradeDate(self.0))
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%m/%d/%Y"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_bounds() {
        let calendar = Calendar::known();
        assert_eq!(calendar.min_trade_date().unwrap().value(), date(2016, 1, 4));
        assert_eq!(calendar.max_trade_date().unwrap().value(), date(2030, 12, 27));
        assert_eq!(calendar.len(), 3889);
    }

    #[test]
    fn test_weekends_and_holidays_excluded() {
        assert!(TradeDate::new(date(2016, 1, 9)).is_err());
        assert!(TradeDate::new(date(2016, 1, 10)).is_err());
        assert!(TradeDate::new(date(2018, 1, 1)).is_err());
        assert!(TradeDate::new(date(2017, 12, 25)).is_err());
        assert!(TradeDate::new(date(2015, 12, 31)).is_err());
        assert!(TradeDate::new(date(2016, 1, 1)).is_err());
        assert!(TradeDate::new(date(2018, 1, 2)).is_ok());
    }

    #[test]
    fn test_day_number() {
        let trade_date = TradeDate::from_ymd(2016, 1, 4).unwrap();
        assert_eq!(trade_date.day_number(), 735_966);
        assert_eq!(TradeDate::from_day_number(735_966).unwrap(), trade_date);
    }

    #[test]
    fn test_next_and_prev() {
        let friday = TradeDate::from_ymd(2016, 1, 8).unwrap();
        let monday = friday.next().unwrap();
        assert_eq!(monday.value(), date(2016, 1, 11));
        assert_eq!(monday.prev().unwrap(), friday);
        assert!(Calendar::known().min_trade_date().unwrap().prev().is_err());
    }

    #[test]
    fn test_trade_dates_in_month() {
        let dates = Calendar::known().trade_dates_in_month(2016, 1).unwrap();
        assert_eq!(dates.len(), 20);
        assert_eq!(dates[0].value(), date(2016, 1, 4));
        assert_eq!(dates[19].value(), date(2016, 1, 29));
        assert!(Calendar::known().trade_dates_in_month(2015, 12).is_err());
        assert!(Calendar::known().trade_dates_in_month(2016, 13).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TradeDate::from_ymd(2016, 1, 4).unwrap().to_string(), "01/04/2016");
    }
}

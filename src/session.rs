use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::calendar::TradeDate;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Market {
    NewYork,
    London,
    Combined,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::NewYork, Market::London, Market::Combined];

    pub fn code(self) -> &'static str {
        match self {
            Market::NewYork => "NYC",
            Market::London => "LDN",
            Market::Combined => "CMB",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Market::NewYork => "NewYork",
            Market::London => "London",
            Market::Combined => "Combined",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|market| market.code() == code)
            .ok_or_else(|| ValidationError::UnknownCode {
                kind: "market code",
                value: code.to_string(),
            })
    }

    // Opening hour in UTC and window length in hours.
    fn window(self) -> (u32, i64) {
        match self {
            Market::NewYork => (13, 9),
            Market::London => (8, 9),
            Market::Combined => (8, 14),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive trading window for one trade date and market, in US Eastern local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Session {
    trade_date: TradeDate,
    market: Market,
    min_tick_on: TickOn,
    max_tick_on: TickOn,
}

impl Session {
    pub fn new(trade_date: TradeDate, market: Market) -> Result<Self, ValidationError> {
        let (hour, hours) = market.window();

        let open_utc = trade_date
            .value()
            .and_hms_opt(hour, 0, 0)
            .ok_or(ValidationError::TimeOverflow)?;
        let min = utc_to_eastern(open_utc).ok_or(ValidationError::TimeOverflow)?;
        let max = min
            .checked_add_signed(Duration::hours(hours) - Duration::milliseconds(1))
            .ok_or(ValidationError::TimeOverflow)?;

        Ok(Session {
            trade_date,
            market,
            min_tick_on: TickOn(min),
            max_tick_on: TickOn(max),
        })
    }

    pub fn trade_date(&self) -> TradeDate {
        self.trade_date
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn min_tick_on(&self) -> TickOn {
        self.min_tick_on
    }

    pub fn max_tick_on(&self) -> TickOn {
        self.max_tick_on
    }

    pub fn in_session(&self, value: NaiveDateTime) -> bool {
        value >= self.min_tick_on.0 && value <= self.max_tick_on.0
    }

    pub fn contains(&self, tick_on: TickOn) -> bool {
        self.in_session(tick_on.0)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}: {} to {})",
            self.trade_date,
            self.market,
            self.min_tick_on.0.format("%H:%M:%S"),
            self.max_tick_on.0.format("%H:%M:%S%.3f")
        )
    }
}

fn nth_sunday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n)
}

// US rule since 2007: 2am local on the 2nd Sunday of March to 2am local on
// the 1st Sunday of November.
fn is_us_dst(utc: NaiveDateTime) -> Option<bool> {
    let year = utc.year();
    let start = nth_sunday(year, 3, 2)?.and_hms_opt(7, 0, 0)?;
    let end = nth_sunday(year, 11, 1)?.and_hms_opt(6, 0, 0)?;
    Some(utc >= start && utc < end)
}

fn utc_to_eastern(utc: NaiveDateTime) -> Option<NaiveDateTime> {
    let offset = if is_us_dst(utc)? { 4 } else { 5 };
    utc.checked_sub_signed(Duration::hours(offset))
}

const TICKS_PER_MILLISECOND: i64 = 10_000;
const MILLISECONDS_PER_DAY: i64 = 86_400_000;

/// Millisecond-precision Eastern timestamp validated against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickOn(NaiveDateTime);

impl TickOn {
    pub fn new(value: NaiveDateTime, session: &Session) -> Result<Self, ValidationError> {
        if value.nanosecond() % 1_000_000 != 0 {
            return Err(ValidationError::SubMillisecond(value.to_string()));
        }
        let tick_on = TickOn(value);
        if !session.contains(tick_on) {
            return Err(ValidationError::OutOfSession {
                value: tick_on.to_string(),
                session: session.to_string(),
            });
        }
        Ok(tick_on)
    }

    /// Parses `MM/dd/yyyy HH:mm:ss.fff`.
    pub fn parse(s: &str, session: &Session) -> Result<Self, ValidationError> {
        let value = NaiveDateTime::parse_from_str(s.trim(), "%m/%d/%Y %H:%M:%S%.f")
            .map_err(|_| ValidationError::InvalidTimestamp(s.to_string()))?;
        Self::new(value, session)
    }

    /// Builds a timestamp from 100ns ticks since 0001-01-01.
    pub fn from_ticks(ticks: i64, session: &Session) -> Result<Self, ValidationError> {
        Self::new(ticks_to_datetime(ticks)?, session)
    }

    pub fn value(&self) -> NaiveDateTime {
        self.0
    }

    /// 100ns ticks since 0001-01-01.
    pub fn ticks(&self) -> i64 {
        let days = (self.0.date().num_days_from_ce() - 1) as i64;
        let time = self.0.time();
        let millis = time.num_seconds_from_midnight() as i64 * 1_000
            + (time.nanosecond() / 1_000_000) as i64;
        (days * MILLISECONDS_PER_DAY + millis) * TICKS_PER_MILLISECOND
    }

    pub fn millis_since(&self, earlier: TickOn) -> i64 {
        (self.0 - earlier.0).num_milliseconds()
    }

    // Unvalidated; callers re-check session bounds on insertion.
    pub(crate) fn add_millis(&self, millis: i32) -> Result<Self, ValidationError> {
        self.0
            .checked_add_signed(Duration::milliseconds(millis as i64))
            .map(TickOn)
            .ok_or(ValidationError::TimeOverflow)
    }
}

fn ticks_to_datetime(ticks: i64) -> Result<NaiveDateTime, ValidationError> {
    if ticks < 0 {
        return Err(ValidationError::TimeOverflow);
    }
    if ticks % TICKS_PER_MILLISECOND != 0 {
        return Err(ValidationError::SubMillisecond(format!("{ticks} ticks")));
    }

    let total = ticks / TICKS_PER_MILLISECOND;
    let days =
        i32::try_from(total / MILLISECONDS_PER_DAY).map_err(|_| ValidationError::TimeOverflow)?;
    let millis = total % MILLISECONDS_PER_DAY;

    let date = days
        .checked_add(1)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or(ValidationError::TimeOverflow)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (millis / 1_000) as u32,
        ((millis % 1_000) * 1_000_000) as u32,
    )
    .ok_or(ValidationError::TimeOverflow)?;

    Ok(date.and_time(time))
}

impl fmt::Display for TickOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%m/%d/%Y %H:%M:%S%.3f"))
    }
}

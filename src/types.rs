use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::rate::{Digits, Rate};
use crate::session::{Session, TickOn};

/// Two-byte format version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MajorMinor {
    pub major: u8,
    pub minor: u8,
}

impl MajorMinor {
    pub const fn new(major: u8, minor: u8) -> Self {
        MajorMinor { major, minor }
    }
}

impl fmt::Display for MajorMinor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Storage form of a tick set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Csv,
    Sts,
}

impl DataKind {
    pub fn extension(self) -> &'static str {
        match self {
            DataKind::Csv => "csv",
            DataKind::Sts => "sts",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(DataKind::Csv),
            "sts" => Some(DataKind::Sts),
            _ => None,
        }
    }
}

/// Side of the quote a feed follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Bid,
    Ask,
    #[default]
    Mid,
}

impl PriceSource {
    pub fn select(self, tick: &Tick) -> Rate {
        match self {
            PriceSource::Bid => tick.bid(),
            PriceSource::Ask => tick.ask(),
            PriceSource::Mid => tick.mid(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick {
    tick_on: TickOn,
    bid: Rate,
    ask: Rate,
}

impl Tick {
    pub fn new(tick_on: TickOn, bid: Rate, ask: Rate) -> Result<Self, ValidationError> {
        if ask < bid {
            return Err(ValidationError::AskBelowBid {
                bid: bid.value(),
                ask: ask.value(),
            });
        }
        Ok(Tick { tick_on, bid, ask })
    }

    /// Parses a `TickOn,Bid,Ask` line.
    pub fn parse(line: &str, digits: Digits, session: &Session) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 3 {
            return Err(ValidationError::InvalidField {
                field: "tick",
                value: line.to_string(),
            });
        }

        let tick_on = TickOn::parse(fields[0], session)?;
        let bid = parse_rate("bid", fields[1], digits)?;
        let ask = parse_rate("ask", fields[2], digits)?;

        Tick::new(tick_on, bid, ask)
    }

    pub fn tick_on(&self) -> TickOn {
        self.tick_on
    }

    pub fn bid(&self) -> Rate {
        self.bid
    }

    pub fn ask(&self) -> Rate {
        self.ask
    }

    pub fn mid(&self) -> Rate {
        Rate::new_unchecked((self.bid.value() + self.ask.value()) / 2)
    }

    pub fn spread(&self) -> i32 {
        self.ask - self.bid
    }

    pub fn to_csv_string(&self, digits: Digits) -> String {
        format!(
            "{},{},{}",
            self.tick_on,
            self.bid.format(digits),
            self.ask.format(digits)
        )
    }
}

fn parse_rate(field: &'static str, value: &str, digits: Digits) -> Result<Rate, ValidationError> {
    let float = value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidField {
            field,
            value: value.to_string(),
        })?;
    Rate::from_float(float, digits)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub tick_on: TickOn,
    pub rate: Rate,
}

impl Point {
    pub fn new(tick_on: TickOn, rate: Rate) -> Self {
        Point { tick_on, rate }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn as_char(self) -> char {
        match self {
            Trend::Up => 'U',
            Trend::Down => 'D',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Brick {
    pub open: Point,
    pub close: Point,
}

impl Brick {
    pub fn new(open: Point, close: Point) -> Self {
        Brick { open, close }
    }

    pub fn trend(&self) -> Trend {
        if self.open.rate < self.close.rate {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    pub fn to_csv_string(&self, digits: Digits) -> String {
        format!(
            "{},{},{},{}",
            self.open.tick_on,
            self.open.rate.format(digits),
            self.close.tick_on,
            self.close.rate.format(digits)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TradeDate;
    use crate::session::Market;
    use chrono::Duration;

    fn session() -> Session {
        Session::new(TradeDate::from_ymd(2016, 1, 4).unwrap(), Market::NewYork).unwrap()
    }

    fn rate(value: i32) -> Rate {
        Rate::from_int(value).unwrap()
    }

    #[test]
    fn test_ask_below_bid_rejected() {
        let tick_on = session().min_tick_on();
        assert!(Tick::new(tick_on, rate(10), rate(9)).is_err());
        assert!(Tick::new(tick_on, rate(10), rate(10)).is_ok());
    }

    #[test]
    fn test_mid_and_spread() {
        let tick = Tick::new(session().min_tick_on(), rate(108_510), rate(108_513)).unwrap();
        assert_eq!(tick.mid().value(), 108_511);
        assert_eq!(tick.spread(), 3);
    }

    #[test]
    fn test_csv_round_trip() {
        let session = session();
        let tick_on = TickOn::new(
            session.min_tick_on().value() + Duration::milliseconds(1_234),
            &session,
        )
        .unwrap();
        let tick = Tick::new(tick_on, rate(108_510), rate(108_513)).unwrap();

        let line = tick.to_csv_string(Digits::Five);
        assert_eq!(line, "01/04/2016 08:00:01.234,1.08510,1.08513");
        assert_eq!(Tick::parse(&line, Digits::Five, &session).unwrap(), tick);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        let session = session();
        assert!(Tick::parse("01/04/2016 08:00:01.234,1.08510", Digits::Five, &session).is_err());
        assert!(Tick::parse("01/04/2016 08:00:01.234,abc,1.0851", Digits::Five, &session).is_err());
        let early = "01/04/2016 07:59:59.999,1.0851,1.0851";
        assert!(Tick::parse(early, Digits::Five, &session).is_err());
    }

    #[test]
    fn test_brick_trend() {
        let tick_on = session().min_tick_on();
        let up = Brick::new(Point::new(tick_on, rate(10)), Point::new(tick_on, rate(15)));
        let down = Brick::new(Point::new(tick_on, rate(15)), Point::new(tick_on, rate(10)));
        assert_eq!(up.trend(), Trend::Up);
        assert_eq!(down.trend(), Trend::Down);
    }
}

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::rate::{Digits, Rate};

/// Vendor a tick set was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    SquidEyes,
    Dukascopy,
    HistData,
    ForexCom,
    OandaCorp,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::SquidEyes,
        Source::Dukascopy,
        Source::HistData,
        Source::ForexCom,
        Source::OandaCorp,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Source::SquidEyes => "SE",
            Source::Dukascopy => "DC",
            Source::HistData => "HD",
            Source::ForexCom => "FC",
            Source::OandaCorp => "OC",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Source::SquidEyes => "SquidEyes",
            Source::Dukascopy => "Dukascopy",
            Source::HistData => "HistData",
            Source::ForexCom => "ForexCom",
            Source::OandaCorp => "OandaCorp",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|source| source.code() == code)
            .ok_or_else(|| ValidationError::UnknownCode {
                kind: "source code",
                value: code.to_string(),
            })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    EurUsd,
    GbpUsd,
    UsdJpy,
}

impl Symbol {
    pub const ALL: [Symbol; 3] = [Symbol::EurUsd, Symbol::GbpUsd, Symbol::UsdJpy];

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::EurUsd => "EURUSD",
            Symbol::GbpUsd => "GBPUSD",
            Symbol::UsdJpy => "USDJPY",
        }
    }

    pub fn digits(self) -> Digits {
        match self {
            Symbol::EurUsd | Symbol::GbpUsd => Digits::Five,
            Symbol::UsdJpy => Digits::Three,
        }
    }
}

/// A currency pair and the precision it is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    symbol: Symbol,
    digits: Digits,
}

impl Pair {
    pub fn new(symbol: Symbol) -> Self {
        Pair {
            symbol,
            digits: symbol.digits(),
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn digits(&self) -> Digits {
        self.digits
    }

    pub fn format(&self, rate: Rate) -> String {
        rate.format(self.digits)
    }
}

impl From<Symbol> for Pair {
    fn from(symbol: Symbol) -> Self {
        Pair::new(symbol)
    }
}

impl FromStr for Pair {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .into_iter()
            .find(|symbol| symbol.as_str() == s)
            .map(Pair::new)
            .ok_or_else(|| ValidationError::UnknownCode {
                kind: "pair",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol.as_str())
    }
}

use std::path::{Path, PathBuf};

use bincode::{Decode, Encode, config};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::calendar::{Calendar, TradeDate};
use crate::error::{FormatError, ValidationError};
use crate::pair::{Pair, Source};
use crate::session::Market;
use crate::tick_set::TickSet;
use crate::types::{DataKind, MajorMinor};

pub const BUNDLE_VERSION: MajorMinor = MajorMinor::new(1, 0);

#[derive(Debug, Encode, Decode, PartialEq, Eq)]
struct Entry {
    file_name: String,
    sha256: String,
    payload: Vec<u8>,
}

#[derive(Debug, Encode, Decode)]
struct Archive {
    major: u8,
    minor: u8,
    entries: Vec<Entry>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A month of tick sets for one source, pair and market.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    source: Source,
    pair: Pair,
    year: i32,
    month: u32,
    market: Market,
    trade_dates: Vec<TradeDate>,
    tick_sets: Vec<TickSet>,
}

impl Bundle {
    pub fn new(
        source: Source,
        pair: Pair,
        year: i32,
        month: u32,
        market: Market,
    ) -> Result<Self, ValidationError> {
        let trade_dates = Calendar::known().trade_dates_in_month(year, month)?;
        if trade_dates.is_empty() {
            return Err(ValidationError::InvalidMonth { year, month });
        }

        Ok(Bundle {
            source,
            pair,
            year,
            month,
            market,
            trade_dates,
            tick_sets: Vec::new(),
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn len(&self) -> usize {
        self.tick_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tick_sets.is_empty()
    }

    pub fn tick_sets(&self) -> &[TickSet] {
        &self.tick_sets
    }

    /// Every trade date of the month has a tick set.
    pub fn is_complete(&self) -> bool {
        self.tick_sets.len() == self.trade_dates.len()
    }

    pub fn add(&mut self, tick_set: TickSet) -> Result<(), ValidationError> {
        if tick_set.is_empty() {
            return Err(ValidationError::EmptyTickSet);
        }

        check("source", self.source.code(), tick_set.source().code())?;
        check("pair", &self.pair.to_string(), &tick_set.pair().to_string())?;
        check("market", self.market.code(), tick_set.session().market().code())?;

        let trade_date = tick_set.session().trade_date();
        if !self.trade_dates.contains(&trade_date) {
            return Err(ValidationError::BundleMismatch {
                field: "trade date",
                expected: format!("{}-{:02}", self.year, self.month),
                found: trade_date.to_string(),
            });
        }

        if let Some(last) = self.tick_sets.last() {
            let previous = last.session().trade_date();
            if trade_date <= previous {
                return Err(ValidationError::OutOfOrder {
                    previous: previous.to_string(),
                    found: trade_date.to_string(),
                });
            }
        }

        self.tick_sets.push(tick_set);
        Ok(())
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{:02}_{}_EST.stsb",
            self.source.code(),
            self.pair,
            self.year,
            self.month,
            self.market.code()
        )
    }

    pub fn blob_name(&self) -> String {
        format!(
            "{}/BUNDLES/{}/{}/{}/{}",
            self.source.code(),
            self.pair,
            self.market.code(),
            self.year,
            self.file_name()
        )
    }

    pub fn full_path<P: AsRef<Path>>(&self, base: P) -> PathBuf {
        self.blob_name()
            .split('/')
            .fold(base.as_ref().to_path_buf(), |path, part| path.join(part))
    }

    pub fn save(&self) -> Result<Vec<u8>, FormatError> {
        let mut entries = Vec::with_capacity(self.tick_sets.len());
        for tick_set in &self.tick_sets {
            let payload = tick_set.save(DataKind::Sts)?;
            entries.push(Entry {
                file_name: tick_set.file_name(DataKind::Sts),
                sha256: sha256_hex(&payload),
                payload,
            });
        }

        let archive = Archive {
            major: BUNDLE_VERSION.major,
            minor: BUNDLE_VERSION.minor,
            entries,
        };
        let bytes = bincode::encode_to_vec(&archive, config::standard())?;
        info!(
            bundle = %self.file_name(),
            tick_sets = self.len(),
            bytes = bytes.len(),
            "saved bundle"
        );
        Ok(bytes)
    }

    /// Replaces the tick sets with the archive content, or leaves them untouched on failure.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        let (archive, read): (Archive, usize) =
            bincode::decode_from_slice(bytes, config::standard())?;
        if read != bytes.len() {
            return Err(FormatError::TrailingBytes(bytes.len() - read));
        }

        let found = MajorMinor::new(archive.major, archive.minor);
        if found != BUNDLE_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: BUNDLE_VERSION,
                found,
            });
        }

        let mut staged = self.empty();
        for entry in archive.entries {
            if sha256_hex(&entry.payload) != entry.sha256 {
                return Err(FormatError::ChecksumMismatch(entry.file_name));
            }
            let mut tick_set = TickSet::from_file_name(&entry.file_name)?;
            tick_set.load(&entry.payload, DataKind::Sts)?;
            staged.add(tick_set)?;
        }

        info!(bundle = %self.file_name(), tick_sets = staged.len(), "loaded bundle");
        self.tick_sets = staged.tick_sets;
        Ok(())
    }

    fn empty(&self) -> Bundle {
        Bundle {
            source: self.source,
            pair: self.pair,
            year: self.year,
            month: self.month,
            market: self.market,
            trade_dates: self.trade_dates.clone(),
            tick_sets: Vec::new(),
        }
    }
}

fn check(field: &'static str, expected: &str, found: &str) -> Result<(), ValidationError> {
    if expected == found {
        Ok(())
    } else {
        Err(ValidationError::BundleMismatch {
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::Symbol;
    use crate::rate::Rate;
    use crate::session::{Session, TickOn};
    use crate::types::Tick;
    use chrono::Duration;

    fn tick_set(day: u32, market: Market) -> TickSet {
        tick_set_on(TradeDate::from_ymd(2016, 1, day).unwrap(), market)
    }

    fn tick_set_on(trade_date: TradeDate, market: Market) -> TickSet {
        let session = Session::new(trade_date, market).unwrap();
        let mut tick_set = TickSet::new(Source::Dukascopy, Pair::new(Symbol::EurUsd), session);
        for (millis, bid) in [(0, 108_510), (25, 108_512), (7_000, 108_490)] {
            let value = session.min_tick_on().value() + Duration::milliseconds(millis);
            let bid = Rate::from_int(bid).unwrap();
            let ask = bid.checked_add(3).unwrap();
            let tick_on = TickOn::new(value, &session).unwrap();
            tick_set.add(Tick::new(tick_on, bid, ask).unwrap()).unwrap();
        }
        tick_set
    }

    fn bundle() -> Bundle {
        month(1)
    }

    fn month(month: u32) -> Bundle {
        Bundle::new(Source::Dukascopy, Pair::new(Symbol::EurUsd), 2016, month, Market::NewYork)
            .unwrap()
    }

    #[test]
    fn test_names() {
        let bundle = bundle();
        assert_eq!(bundle.file_name(), "DC_EURUSD_2016_01_NYC_EST.stsb");
        assert_eq!(
            bundle.blob_name(),
            "DC/BUNDLES/EURUSD/NYC/2016/DC_EURUSD_2016_01_NYC_EST.stsb"
        );
    }

    #[test]
    fn test_add_rules() {
        let mut bundle = bundle();

        let mut empty = tick_set(4, Market::NewYork);
        empty.clear();
        assert_eq!(bundle.add(empty), Err(ValidationError::EmptyTickSet));
        assert!(matches!(
            bundle.add(tick_set(4, Market::London)),
            Err(ValidationError::BundleMismatch { field: "market", .. })
        ));

        bundle.add(tick_set(5, Market::NewYork)).unwrap();
        assert!(matches!(
            bundle.add(tick_set(4, Market::NewYork)),
            Err(ValidationError::OutOfOrder { .. })
        ));
        assert!(bundle.add(tick_set(5, Market::NewYork)).is_err());
        bundle.add(tick_set(6, Market::NewYork)).unwrap();

        assert_eq!(bundle.len(), 2);
        assert!(!bundle.is_complete());
    }

    #[test]
    fn test_other_month_rejected() {
        let mut bundle = month(2);
        assert!(matches!(
            bundle.add(tick_set(4, Market::NewYork)),
            Err(ValidationError::BundleMismatch { field: "trade date", .. })
        ));
    }

    #[test]
    fn test_complete_month_round_trip() {
        let mut bundle = bundle();
        for trade_date in Calendar::known().trade_dates_in_month(2016, 1).unwrap() {
            bundle.add(tick_set_on(trade_date, Market::NewYork)).unwrap();
        }
        assert!(bundle.is_complete());

        let bytes = bundle.save().unwrap();
        let mut loaded = self::bundle();
        loaded.load(&bytes).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bundle = bundle();
        bundle.add(tick_set(4, Market::NewYork)).unwrap();

        let mut archive = Archive {
            major: BUNDLE_VERSION.major,
            minor: BUNDLE_VERSION.minor,
            entries: Vec::new(),
        };
        let payload = bundle.tick_sets()[0].save(DataKind::Sts).unwrap();
        archive.entries.push(Entry {
            file_name: bundle.tick_sets()[0].file_name(DataKind::Sts),
            sha256: sha256_hex(b"something else"),
            payload,
        });
        let bytes = bincode::encode_to_vec(&archive, config::standard()).unwrap();

        let mut loaded = self::bundle();
        assert!(matches!(loaded.load(&bytes), Err(FormatError::ChecksumMismatch(_))));
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_version_mismatch() {
        let archive = Archive {
            major: 2,
            minor: 0,
            entries: Vec::new(),
        };
        let bytes = bincode::encode_to_vec(&archive, config::standard()).unwrap();
        assert!(matches!(
            bundle().load(&bytes),
            Err(FormatError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bundle = bundle();
        bundle.add(tick_set(4, Market::NewYork)).unwrap();
        let mut bytes = bundle.save().unwrap();
        bytes.push(0);

        let mut loaded = self::bundle();
        assert!(matches!(loaded.load(&bytes), Err(FormatError::TrailingBytes(1))));
        assert!(loaded.is_empty());
    }
}

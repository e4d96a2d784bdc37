use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

use crate::calendar::TradeDate;
use crate::delta_encoding::TickDelta;
use crate::error::{FormatError, ValidationError};
use crate::pair::{Pair, Source};
use crate::rate::Rate;
use crate::session::{Market, Session, TickOn};
use crate::types::{DataKind, MajorMinor, Tick};
use crate::wire;

/// Version tag written ahead of the compressed payload.
pub const VERSION: MajorMinor = MajorMinor::new(1, 0);

/// Ordered ticks for one (source, pair, session).
#[derive(Debug, Clone, PartialEq)]
pub struct TickSet {
    source: Source,
    pair: Pair,
    session: Session,
    ticks: Vec<Tick>,
}

impl TickSet {
    pub fn new(source: Source, pair: Pair, session: Session) -> Self {
        TickSet {
            source,
            pair,
            session,
            ticks: Vec::new(),
        }
    }

    /// Parses `{Source}_{Pair}_{yyyyMMdd}_{Market}_EST.{sts|csv}` into an empty set.
    pub fn from_file_name(file_name: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::InvalidFileName(file_name.to_string());

        let (stem, ext) = file_name.rsplit_once('.').ok_or_else(invalid)?;
        DataKind::from_extension(ext).ok_or_else(invalid)?;

        let fields: Vec<&str> = stem.split('_').collect();
        let [source, pair, date, market, zone] = fields.as_slice() else {
            return Err(invalid());
        };
        if *zone != "EST" {
            return Err(invalid());
        }

        let source = Source::from_code(source)?;
        let pair: Pair = pair.parse()?;
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid())?;
        let market = Market::from_code(market)?;
        let session = Session::new(TradeDate::new(date)?, market)?;

        Ok(TickSet::new(source, pair, session))
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tick> {
        self.ticks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Tick> {
        self.ticks.get(index)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    /// Appends a tick that lies in the session and does not precede the last tick.
    pub fn add(&mut self, tick: Tick) -> Result<(), ValidationError> {
        if !self.session.contains(tick.tick_on()) {
            return Err(ValidationError::OutOfSession {
                value: tick.tick_on().to_string(),
                session: self.session.to_string(),
            });
        }

        if let Some(last) = self.ticks.last() {
            if tick.tick_on() < last.tick_on() {
                return Err(ValidationError::OutOfOrder {
                    previous: last.tick_on().to_string(),
                    found: tick.tick_on().to_string(),
                });
            }
        }

        self.ticks.push(tick);
        Ok(())
    }

    /// Appends every tick or none of them.
    pub fn add_range<I>(&mut self, ticks: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = Tick>,
    {
        let len = self.ticks.len();
        for tick in ticks {
            if let Err(err) = self.add(tick) {
                self.ticks.truncate(len);
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn file_name(&self, kind: DataKind) -> String {
        format!(
            "{}_{}_{}_{}_EST.{}",
            self.source.code(),
            self.pair,
            self.session.trade_date().value().format("%Y%m%d"),
            self.session.market().code(),
            kind.extension()
        )
    }

    pub fn blob_name(&self, kind: DataKind) -> String {
        format!(
            "{}/TICKSETS/{}/{}/{}/{}",
            self.source.code(),
            self.session.market().code(),
            self.pair,
            self.session.trade_date().year(),
            self.file_name(kind)
        )
    }

    pub fn full_path<P: AsRef<Path>>(&self, base: P, kind: DataKind) -> PathBuf {
        self.blob_name(kind)
            .split('/')
            .fold(base.as_ref().to_path_buf(), |path, part| path.join(part))
    }

    pub fn metadata(&self, kind: DataKind) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("Count", self.len().to_string()),
            ("CreatedOn", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
            ("Market", self.session.market().to_string()),
            ("Pair", self.pair.to_string()),
            ("SaveAs", kind.extension().to_uppercase()),
            ("Source", self.source.to_string()),
            ("TradeDate", self.session.trade_date().value().format("%Y-%m-%d").to_string()),
            ("Version", VERSION.to_string()),
        ])
    }

    pub fn save(&self, kind: DataKind) -> Result<Vec<u8>, FormatError> {
        let bytes = match kind {
            DataKind::Csv => self.encode_text(),
            DataKind::Sts => self.encode_binary()?,
        };
        debug!(
            file = %self.file_name(kind),
            ticks = self.len(),
            bytes = bytes.len(),
            "saved tick set"
        );
        Ok(bytes)
    }

    /// Replaces the ticks with the decoded content, or leaves them untouched on failure.
    pub fn load(&mut self, bytes: &[u8], kind: DataKind) -> Result<(), FormatError> {
        let ticks = match kind {
            DataKind::Csv => self.decode_text(bytes)?,
            DataKind::Sts => self.decode_binary(bytes)?,
        };
        debug!(
            file = %self.file_name(kind),
            ticks = ticks.len(),
            bytes = bytes.len(),
            "loaded tick set"
        );
        self.ticks = ticks;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: &mut W, kind: DataKind) -> Result<usize, FormatError> {
        let bytes = self.save(kind)?;
        w.write_all(&bytes)?;
        Ok(bytes.len())
    }

    pub fn read_from<R: Read>(&mut self, r: &mut R, kind: DataKind) -> Result<(), FormatError> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        self.load(&bytes, kind)
    }

    pub fn write_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        kind: DataKind,
    ) -> Result<(), FormatError> {
        let mut file = File::create(path)?;
        self.write_to(&mut file, kind)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn read_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        kind: DataKind,
    ) -> Result<(), FormatError> {
        let mut file = File::open(path)?;
        self.read_from(&mut file, kind)
    }

    fn encode_text(&self) -> Vec<u8> {
        let digits = self.pair.digits();
        let mut text = String::new();
        for tick in &self.ticks {
            text.push_str(&tick.to_csv_string(digits));
            text.push('\n');
        }
        text.into_bytes()
    }

    fn decode_text(&self, bytes: &[u8]) -> Result<Vec<Tick>, FormatError> {
        let text = std::str::from_utf8(bytes).map_err(|err| FormatError::InvalidText {
            line: 0,
            reason: err.to_string(),
        })?;

        let mut staged = self.empty();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let invalid = |err: ValidationError| FormatError::InvalidText {
                line: index + 1,
                reason: err.to_string(),
            };
            let tick = Tick::parse(line, self.pair.digits(), &self.session).map_err(invalid)?;
            staged.add(tick).map_err(invalid)?;
        }

        Ok(staged.ticks)
    }

    fn encode_binary(&self) -> Result<Vec<u8>, FormatError> {
        let mut payload = Vec::new();

        payload.extend_from_slice(&utc_now_ticks().to_le_bytes());
        wire::write_string(&mut payload, self.source.name());
        wire::write_string(&mut payload, self.pair.symbol().as_str());
        payload.extend_from_slice(&self.session.trade_date().day_number().to_le_bytes());
        wire::write_string(&mut payload, self.session.market().name());

        let count =
            i32::try_from(self.ticks.len()).map_err(|_| FormatError::InvalidCount(i32::MAX))?;
        payload.extend_from_slice(&count.to_le_bytes());

        if let Some(first) = self.ticks.first() {
            payload.extend_from_slice(&first.tick_on().ticks().to_le_bytes());
            payload.extend_from_slice(&first.bid().value().to_le_bytes());
            payload.extend_from_slice(&first.ask().value().to_le_bytes());

            for pair in self.ticks.windows(2) {
                let (previous, tick) = (&pair[0], &pair[1]);
                let millis = tick.tick_on().millis_since(previous.tick_on());
                let delta = TickDelta {
                    millis: i32::try_from(millis).map_err(|_| ValidationError::TimeOverflow)?,
                    bid: tick.bid() - previous.bid(),
                    ask: tick.ask() - previous.ask(),
                };
                delta.encode(&mut payload);
            }
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&payload)?;
        let compressed = encoder.finish()?;

        let mut bytes = Vec::with_capacity(compressed.len() + 2);
        bytes.push(VERSION.major);
        bytes.push(VERSION.minor);
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }

    fn decode_binary(&self, bytes: &[u8]) -> Result<Vec<Tick>, FormatError> {
        let mut pos = 0;
        let major = wire::read_u8(bytes, &mut pos)?;
        let minor = wire::read_u8(bytes, &mut pos)?;
        let found = MajorMinor::new(major, minor);
        if found != VERSION {
            warn!(expected = %VERSION, %found, "tick set version mismatch");
            return Err(FormatError::VersionMismatch {
                expected: VERSION,
                found,
            });
        }

        let mut payload = Vec::new();
        GzDecoder::new(&bytes[pos..]).read_to_end(&mut payload)?;

        let buf = payload.as_slice();
        let mut pos = 0;

        let _created_on = wire::read_i64(buf, &mut pos)?;
        let source = wire::read_string(buf, &mut pos)?;
        self.check_identity("source", self.source.name(), source)?;
        let symbol = wire::read_string(buf, &mut pos)?;
        self.check_identity("pair", self.pair.symbol().as_str(), symbol)?;
        let day_number = wire::read_i32(buf, &mut pos)?;
        let expected_day = self.session.trade_date().day_number().to_string();
        self.check_identity("trade date", &expected_day, day_number.to_string())?;
        let market = wire::read_string(buf, &mut pos)?;
        self.check_identity("market", self.session.market().name(), market)?;

        let count = wire::read_i32(buf, &mut pos)?;
        if count < 0 {
            return Err(FormatError::InvalidCount(count));
        }

        let mut staged = self.empty();
        if count > 0 {
            let tick_on = wire::read_i64(buf, &mut pos)?;
            let bid = Rate::from_int(wire::read_i32(buf, &mut pos)?)?;
            let ask = Rate::from_int(wire::read_i32(buf, &mut pos)?)?;
            let mut previous = Tick::new(TickOn::from_ticks(tick_on, &self.session)?, bid, ask)?;
            staged.add(previous)?;

            for _ in 1..count {
                let delta = TickDelta::decode(buf, &mut pos)?;
                let tick = Tick::new(
                    previous.tick_on().add_millis(delta.millis)?,
                    previous.bid().checked_add(delta.bid)?,
                    previous.ask().checked_add(delta.ask)?,
                )?;
                staged.add(tick)?;
                previous = tick;
            }
        }

        if pos != buf.len() {
            return Err(FormatError::TrailingBytes(buf.len() - pos));
        }

        Ok(staged.ticks)
    }

    fn check_identity(
        &self,
        field: &'static str,
        expected: &str,
        found: String,
    ) -> Result<(), FormatError> {
        if expected == found {
            return Ok(());
        }
        warn!(field, expected, found = %found, "tick set identity mismatch");
        Err(FormatError::Mismatch {
            field,
            expected: expected.to_string(),
            found,
        })
    }

    fn empty(&self) -> TickSet {
        TickSet::new(self.source, self.pair, self.session)
    }
}

// 100ns ticks since 0001-01-01.
fn utc_now_ticks() -> i64 {
    let now = Utc::now().naive_utc();
    let days = (now.date().num_days_from_ce() - 1) as i64;
    let micros = now.time().num_seconds_from_midnight() as i64 * 1_000_000
        + (now.time().nanosecond() / 1_000) as i64;
    days * 864_000_000_000 + micros * 10
}

impl fmt::Display for TickSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name(DataKind::Sts))
    }
}

impl<'a> IntoIterator for &'a TickSet {
    type Item = &'a Tick;
    type IntoIter = std::slice::Iter<'a, Tick>;

    fn into_iter(self) -> Self::IntoIter {
        self.ticks.iter()
    }
}

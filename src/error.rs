use thiserror::Error;

use crate::types::MajorMinor;

/// Rejected input at a constructor or append boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("rate {value} is outside 1..=999999")]
    RateOutOfRange { value: i64 },

    #[error("{value} is not a valid {digits}-digit rate")]
    InvalidFloatRate { value: f64, digits: u32 },

    #[error("unsupported digit count: {0}")]
    InvalidDigits(u32),

    #[error("{0} is not a trade date")]
    NotATradeDate(chrono::NaiveDate),

    #[error("{year}-{month:02} is outside the trading calendar")]
    InvalidMonth { year: i32, month: u32 },

    #[error("{value} falls outside {session}")]
    OutOfSession { value: String, session: String },

    #[error("{0} carries sub-millisecond precision")]
    SubMillisecond(String),

    #[error("unparseable timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("timestamp arithmetic overflowed")]
    TimeOverflow,

    #[error("ask {ask} is below bid {bid}")]
    AskBelowBid { bid: i32, ask: i32 },

    #[error("tick at {found} precedes the previous tick at {previous}")]
    OutOfOrder { previous: String, found: String },

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("unknown {kind}: {value:?}")]
    UnknownCode { kind: &'static str, value: String },

    #[error("an empty tick set may not be bundled")]
    EmptyTickSet,

    #[error("tick set {field} {found:?} does not match the bundle's {expected:?}")]
    BundleMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },
}

/// Decode or encode failure for a tick set, text file or bundle.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("stream truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        expected: MajorMinor,
        found: MajorMinor,
    },

    #[error("{field} mismatch: expected {expected:?}, found {found:?}")]
    Mismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("negative tick count: {0}")]
    InvalidCount(i32),

    #[error("invalid packed header 0x{0:02X}")]
    InvalidHeader(u8),

    #[error("{0} trailing bytes after the last tick")]
    TrailingBytes(usize),

    #[error("invalid string in payload")]
    InvalidString,

    #[error("line {line}: {reason}")]
    InvalidText { line: usize, reason: String },

    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("checksum mismatch for {0}")]
    ChecksumMismatch(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive encoding failed: {0}")]
    ArchiveEncode(#[from] bincode::error::EncodeError),

    #[error("archive decoding failed: {0}")]
    ArchiveDecode(#[from] bincode::error::DecodeError),
}

/// Invalid feed or settings parameters.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("{feed}: brick size {value} is outside {min}..={max}")]
    InvalidBrickSize {
        feed: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("{feed}: retained_bricks must be at least 1")]
    InvalidRetention { feed: &'static str },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
}

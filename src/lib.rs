mod brick_feed;
mod bundle;
mod calendar;
mod delta_encoding;
mod error;
mod feed;
mod grid_renko;
mod pair;
mod rate;
mod renko;
mod session;
mod settings;
mod tick_set;
mod types;
mod wire;

pub use brick_feed::{BrickEvent, BrickFeed};
pub use bundle::{BUNDLE_VERSION, Bundle};
pub use calendar::{Calendar, MAX_YEAR, MIN_YEAR, TradeDate};
pub use error::{ConfigurationError, FormatError, ValidationError};
pub use feed::{BrickListener, RenkoEvent};
pub use grid_renko::GridRenkoFeed;
pub use pair::{Pair, Source, Symbol};
pub use rate::{Digits, Rate};
pub use renko::RenkoFeed;
pub use session::{Market, Session, TickOn};
pub use settings::{
    BRICK_FEED_SIZES, BrickFeedSettings, DEFAULT_RETAINED_BRICKS, GRID_RENKO_SIZES,
    GridRenkoSettings, RENKO_SIZES, RenkoSettings, Settings,
};
pub use tick_set::{TickSet, VERSION};
pub use types::{Brick, DataKind, MajorMinor, Point, PriceSource, Tick, Trend};

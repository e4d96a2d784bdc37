use tracing::trace;

use crate::error::{ConfigurationError, ValidationError};
use crate::feed::{BrickListener, BrickWindow, Listeners, pattern};
use crate::rate::Rate;
use crate::session::TickOn;
use crate::settings::{self, BRICK_FEED_SIZES, BrickFeedSettings, DEFAULT_RETAINED_BRICKS};
use crate::types::{Brick, Point, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickEvent {
    pub tick: Tick,
    pub brick: Brick,
    pub is_closed: bool,
    /// Closed by the same tick as a later brick, without touching the tick itself.
    pub is_virtual: bool,
    pub is_first_tick_of_bar: bool,
}

/// Closes a brick each time the mid price moves a fixed distance from the last close.
pub struct BrickFeed {
    ticks_per_brick: i32,
    state: Option<(TickOn, i32)>,
    last_brick_was_closed: bool,
    bricks: BrickWindow,
    listeners: Listeners<BrickEvent>,
}

impl BrickFeed {
    pub fn new(ticks_per_brick: i32) -> Result<Self, ConfigurationError> {
        Self::from_settings(&BrickFeedSettings {
            ticks_per_brick,
            retained_bricks: DEFAULT_RETAINED_BRICKS,
        })
    }

    pub fn from_settings(settings: &BrickFeedSettings) -> Result<Self, ConfigurationError> {
        settings::validate_size("brick_feed", settings.ticks_per_brick, BRICK_FEED_SIZES)?;
        settings::validate_retention("brick_feed", settings.retained_bricks)?;

        Ok(BrickFeed {
            ticks_per_brick: settings.ticks_per_brick,
            state: None,
            last_brick_was_closed: false,
            bricks: BrickWindow::new(settings.retained_bricks),
            listeners: Listeners::default(),
        })
    }

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: BrickListener<BrickEvent> + 'static,
    {
        self.listeners.subscribe(listener);
    }

    pub fn ticks_per_brick(&self) -> i32 {
        self.ticks_per_brick
    }

    /// Number of retained closed bricks.
    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.len() == 0
    }

    /// Closed brick by age, newest first.
    pub fn get(&self, index: usize) -> Option<&Brick> {
        self.bricks.get(index)
    }

    /// Retained closed bricks, oldest first.
    pub fn bricks(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.iter()
    }

    /// Trends of the newest `max_trends` closed bricks, oldest on the left.
    pub fn pattern(&self, max_trends: usize) -> String {
        let skip = self.bricks.len().saturating_sub(max_trends);
        pattern(self.bricks.iter().skip(skip))
    }

    pub fn handle_tick(&mut self, tick: &Tick) -> Result<Vec<BrickEvent>, ValidationError> {
        let tick_on = tick.tick_on();
        let mid = tick.mid();

        let Some((mut open_on, mut last)) = self.state else {
            let point = Point::new(tick_on, mid);
            let events = vec![BrickEvent {
                tick: *tick,
                brick: Brick::new(point, point),
                is_closed: false,
                is_virtual: false,
                is_first_tick_of_bar: true,
            }];
            self.state = Some((tick_on, mid.value()));
            self.listeners.notify(&events);
            return Ok(events);
        };

        let step = self.ticks_per_brick;
        let mut closed = Vec::new();
        while mid.value() > last + step {
            closed.push(Brick::new(
                Point::new(open_on, Rate::from_int(last)?),
                Point::new(tick_on, Rate::from_int(last + step)?),
            ));
            last += step;
            open_on = tick_on;
        }
        while mid.value() < last - step {
            closed.push(Brick::new(
                Point::new(open_on, Rate::from_int(last)?),
                Point::new(tick_on, Rate::from_int(last - step)?),
            ));
            last -= step;
            open_on = tick_on;
        }
        let open = Point::new(open_on, Rate::from_int(last)?);

        let mut events = Vec::with_capacity(closed.len() + 1);
        let count = closed.len();
        for (index, brick) in closed.into_iter().enumerate() {
            trace!(open = %brick.open.rate, close = %brick.close.rate, "closed brick");
            self.bricks.push(brick);
            self.last_brick_was_closed = true;
            events.push(BrickEvent {
                tick: *tick,
                brick,
                is_closed: true,
                is_virtual: index + 1 < count,
                is_first_tick_of_bar: false,
            });
        }

        if mid.value() != last || count == 0 {
            events.push(BrickEvent {
                tick: *tick,
                brick: Brick::new(open, Point::new(tick_on, mid)),
                is_closed: false,
                is_virtual: false,
                is_first_tick_of_bar: self.last_brick_was_closed,
            });
            self.last_brick_was_closed = false;
        }

        self.state = Some((open_on, last));
        self.listeners.notify(&events);
        Ok(events)
    }
}

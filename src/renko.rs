use tracing::trace;

use crate::error::{ConfigurationError, ValidationError};
use crate::feed::{BrickListener, BrickWindow, Listeners, RenkoEvent, pattern};
use crate::rate::Rate;
use crate::session::{Session, TickOn};
use crate::settings::{self, RENKO_SIZES, RenkoSettings};
use crate::types::{Brick, Point, PriceSource, Tick, Trend};

#[derive(Debug, Clone, Copy)]
struct Progress {
    open_on: TickOn,
    open: i32,
    last: Option<Brick>,
}

impl Progress {
    fn close(
        &mut self,
        closed: &mut Vec<Brick>,
        open: Point,
        tick_on: TickOn,
        limit: i32,
    ) -> Result<(), ValidationError> {
        let brick = Brick::new(open, Point::new(tick_on, Rate::from_int(limit)?));
        closed.push(brick);
        self.last = Some(brick);
        self.open_on = tick_on;
        self.open = limit;
        Ok(())
    }

    fn rise(
        &mut self,
        closed: &mut Vec<Brick>,
        rate: i32,
        tick_on: TickOn,
        size: i32,
    ) -> Result<(), ValidationError> {
        while rate > self.open + size {
            let open = Point::new(self.open_on, Rate::from_int(self.open)?);
            self.close(closed, open, tick_on, self.open + size)?;
        }
        Ok(())
    }

    fn fall(
        &mut self,
        closed: &mut Vec<Brick>,
        rate: i32,
        tick_on: TickOn,
        size: i32,
    ) -> Result<(), ValidationError> {
        while rate < self.open - size {
            let open = Point::new(self.open_on, Rate::from_int(self.open)?);
            self.close(closed, open, tick_on, self.open - size)?;
        }
        Ok(())
    }
}

/// Trend-following Renko: a reversal must clear a full brick beyond the
/// previous brick's open, and the reversal brick starts at that open.
pub struct RenkoFeed {
    session: Session,
    brick_ticks: i32,
    price: PriceSource,
    raise_open_bricks: bool,
    progress: Option<Progress>,
    bricks: BrickWindow,
    listeners: Listeners<RenkoEvent>,
}

impl RenkoFeed {
    pub fn new(
        session: Session,
        price: PriceSource,
        brick_ticks: i32,
        raise_open_bricks: bool,
    ) -> Result<Self, ConfigurationError> {
        Self::from_settings(
            session,
            &RenkoSettings {
                brick_ticks,
                price,
                raise_open_bricks,
                ..RenkoSettings::default()
            },
        )
    }

    pub fn from_settings(
        session: Session,
        settings: &RenkoSettings,
    ) -> Result<Self, ConfigurationError> {
        settings::validate_size("renko", settings.brick_ticks, RENKO_SIZES)?;
        settings::validate_retention("renko", settings.retained_bricks)?;

        Ok(RenkoFeed {
            session,
            brick_ticks: settings.brick_ticks,
            price: settings.price,
            raise_open_bricks: settings.raise_open_bricks,
            progress: None,
            bricks: BrickWindow::new(settings.retained_bricks),
            listeners: Listeners::default(),
        })
    }

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: BrickListener<RenkoEvent> + 'static,
    {
        self.listeners.subscribe(listener);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn brick_ticks(&self) -> i32 {
        self.brick_ticks
    }

    pub fn price(&self) -> PriceSource {
        self.price
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

    /// Trends of the retained closed bricks before the newest one, oldest on
    /// the left, optionally limited to bricks that opened inside the session.
    pub fn pattern(&self, in_session: bool) -> String {
        let settled = self.bricks.len().saturating_sub(1);
        pattern(
            self.bricks
                .iter()
                .take(settled)
                .filter(|brick| !in_session || self.session.contains(brick.open.tick_on)),
        )
    }

    pub fn handle_tick(&mut self, tick: &Tick) -> Result<Vec<RenkoEvent>, ValidationError> {
        let tick_on = tick.tick_on();
        let rate = self.price.select(tick);
        let value = rate.value();
        let size = self.brick_ticks;

        let mut closed = Vec::new();
        let progress = match self.progress {
            None => Progress {
                open_on: tick_on,
                open: value,
                last: None,
            },
            Some(mut progress) => {
                if value > progress.open {
                    match progress.last {
                        Some(last) if last.trend() == Trend::Down => {
                            let limit = last.open.rate.value() + size;
                            if value > limit {
                                progress.close(&mut closed, last.open, tick_on, limit)?;
                                progress.rise(&mut closed, value, tick_on, size)?;
                            }
                        }
                        _ => progress.rise(&mut closed, value, tick_on, size)?,
                    }
                } else if value < progress.open {
                    match progress.last {
                        Some(last) if last.trend() == Trend::Up => {
                            let limit = last.open.rate.value() - size;
                            if value < limit {
                                progress.close(&mut closed, last.open, tick_on, limit)?;
                                progress.fall(&mut closed, value, tick_on, size)?;
                            }
                        }
                        _ => progress.fall(&mut closed, value, tick_on, size)?,
                    }
                }
                progress
            }
        };

        let open = Point::new(progress.open_on, Rate::from_int(progress.open)?);
        let mut events: Vec<RenkoEvent> = closed
            .into_iter()
            .map(|brick| RenkoEvent {
                tick: *tick,
                brick,
                is_closed: true,
            })
            .collect();
        for event in &events {
            trace!(
                open = %event.brick.open.rate,
                close = %event.brick.close.rate,
                "closed renko brick"
            );
            self.bricks.push(event.brick);
        }

        if self.raise_open_bricks {
            events.push(RenkoEvent {
                tick: *tick,
                brick: Brick::new(open, Point::new(tick_on, rate)),
                is_closed: false,
            });
        }

        self.progress = Some(progress);
        self.listeners.notify(&events);
        Ok(events)
    }
}

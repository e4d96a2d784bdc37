use tracing::trace;

use crate::error::{ConfigurationError, ValidationError};
use crate::feed::{BrickListener, BrickWindow, Listeners, RenkoEvent, pattern};
use crate::rate::Rate;
use crate::session::{Session, TickOn};
use crate::settings::{self, DEFAULT_RETAINED_BRICKS, GRID_RENKO_SIZES, GridRenkoSettings};
use crate::types::{Brick, Point, Tick};

/// Renko bricks locked to a fixed price grid anchored at the first mid price.
///
/// The feed tracks the lower edge of the grid cell holding the price. A rise
/// closes once the price reaches two cells above that edge and a fall once it
/// reaches one cell below, so every brick spans exactly one grid step.
pub struct GridRenkoFeed {
    session: Session,
    ticks_per_brick: i32,
    state: Option<(TickOn, i32)>,
    bricks: BrickWindow,
    listeners: Listeners<RenkoEvent>,
}

impl GridRenkoFeed {
    pub fn new(session: Session, ticks_per_brick: i32) -> Result<Self, ConfigurationError> {
        Self::from_settings(
            session,
            &GridRenkoSettings {
                ticks_per_brick,
                retained_bricks: DEFAULT_RETAINED_BRICKS,
            },
        )
    }

    pub fn from_settings(
        session: Session,
        settings: &GridRenkoSettings,
    ) -> Result<Self, ConfigurationError> {
        let ticks_per_brick = settings.ticks_per_brick;
        settings::validate_size("grid_renko", ticks_per_brick, GRID_RENKO_SIZES)?;
        settings::validate_retention("grid_renko", settings.retained_bricks)?;

        Ok(GridRenkoFeed {
            session,
            ticks_per_brick,
            state: None,
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

    pub fn ticks_per_brick(&self) -> i32 {
        self.ticks_per_brick
    }

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

    /// Trends of the newest `max_trends` bricks, oldest on the left.
    pub fn pattern(&self, max_trends: usize) -> String {
        let skip = self.bricks.len().saturating_sub(max_trends);
        pattern(self.bricks.iter().skip(skip))
    }

    pub fn handle_tick(&mut self, tick: &Tick) -> Result<Vec<RenkoEvent>, ValidationError> {
        let tick_on = tick.tick_on();
        if !self.session.contains(tick_on) {
            return Err(ValidationError::OutOfSession {
                value: tick_on.to_string(),
                session: self.session.to_string(),
            });
        }

        let mid = tick.mid().value();
        let step = self.ticks_per_brick;
        let (mut open_on, mut edge) = self.state.unwrap_or((tick_on, mid - mid % step));

        let mut closed = Vec::new();
        while mid >= edge + 2 * step {
            edge += step;
            closed.push(self.brick(open_on, edge, tick_on, edge + step)?);
            open_on = tick_on;
        }
        while mid <= edge - step {
            edge -= step;
            closed.push(self.brick(open_on, edge + step, tick_on, edge)?);
            open_on = tick_on;
        }

        let events: Vec<RenkoEvent> = closed
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
                "closed grid brick"
            );
            self.bricks.push(event.brick);
        }

        self.state = Some((open_on, edge));
        self.listeners.notify(&events);
        Ok(events)
    }

    fn brick(
        &self,
        open_on: TickOn,
        open: i32,
        close_on: TickOn,
        close: i32,
    ) -> Result<Brick, ValidationError> {
        Ok(Brick::new(
            Point::new(open_on, Rate::from_int(open)?),
            Point::new(close_on, Rate::from_int(close)?),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TradeDate;
    use crate::session::Market;
    use crate::types::Trend;
    use chrono::Duration;

    fn session() -> Session {
        Session::new(TradeDate::from_ymd(2016, 1, 4).unwrap(), Market::NewYork).unwrap()
    }

    fn tick(session: &Session, seconds: i64, mid: i32) -> Tick {
        let value = session.min_tick_on().value() + Duration::seconds(seconds);
        let rate = Rate::from_int(mid).unwrap();
        Tick::new(TickOn::new(value, session).unwrap(), rate, rate).unwrap()
    }

    fn closes(events: &[RenkoEvent]) -> Vec<(i32, i32)> {
        events
            .iter()
            .map(|e| (e.brick.open.rate.value(), e.brick.close.rate.value()))
            .collect()
    }

    #[test]
    fn test_invalid_size() {
        assert!(GridRenkoFeed::new(session(), 0).is_err());
        assert!(GridRenkoFeed::new(session(), 201).is_err());
        assert!(GridRenkoFeed::new(session(), 1).is_ok());
    }

    #[test]
    fn test_grid_anchor() {
        let session = session();
        let mut feed = GridRenkoFeed::new(session, 10).unwrap();

        assert!(feed.handle_tick(&tick(&session, 0, 1234)).unwrap().is_empty());
        assert!(feed.handle_tick(&tick(&session, 1, 1249)).unwrap().is_empty());
        let events = feed.handle_tick(&tick(&session, 2, 1250)).unwrap();
        assert_eq!(closes(&events), vec![(1240, 1250)]);
        assert_eq!(events[0].brick.open.tick_on, tick(&session, 0, 1234).tick_on());
    }

    #[test]
    fn test_reversal_gives_back_last_brick() {
        let session = session();
        let mut feed = GridRenkoFeed::new(session, 10).unwrap();

        let mut all = Vec::new();
        for (seconds, mid) in [(0, 1000), (1, 1020), (2, 1030), (3, 1000), (4, 1030)] {
            all.extend(feed.handle_tick(&tick(&session, seconds, mid)).unwrap());
        }

        assert_eq!(
            closes(&all),
            vec![(1010, 1020), (1020, 1030), (1020, 1010), (1010, 1000), (1010, 1020), (1020, 1030)]
        );
        for pair in all.windows(2) {
            let (previous, next) = (pair[0].brick, pair[1].brick);
            let expected = if previous.trend() == next.trend() {
                previous.close.rate
            } else {
                previous.open.rate
            };
            assert_eq!(next.open.rate, expected);
        }
        assert_eq!(feed.pattern(3), "DUU");
        assert_eq!(feed.pattern(100), "UUDDUU");
        assert_eq!(feed.get(0).unwrap().trend(), Trend::Up);
    }

    #[test]
    fn test_unit_size_bricks_trend_with_price() {
        let session = session();
        let mut feed = GridRenkoFeed::new(session, 1).unwrap();

        let mut all = Vec::new();
        for (seconds, mid) in [(0, 1000), (1, 1003), (2, 1000)] {
            all.extend(feed.handle_tick(&tick(&session, seconds, mid)).unwrap());
        }

        assert_eq!(closes(&all), vec![(1001, 1002), (1002, 1003), (1002, 1001), (1001, 1000)]);
        assert_eq!(feed.pattern(4), "UUDD");
    }

    #[test]
    fn test_odd_size_bricks_span_one_step() {
        let session = session();
        let mut feed = GridRenkoFeed::new(session, 5).unwrap();

        let mut all = Vec::new();
        for (seconds, mid) in [(0, 1000), (1, 1030), (2, 1012), (3, 1040)] {
            all.extend(feed.handle_tick(&tick(&session, seconds, mid)).unwrap());
        }

        assert_eq!(all.len(), 11);
        assert_eq!(all[0].brick.open.rate.value(), 1005);
        assert_eq!(feed.pattern(100), "UUUUUDDUUUU");
        for event in &all {
            assert_eq!((event.brick.close.rate - event.brick.open.rate).abs(), 5);
        }
        for pair in all.windows(2) {
            let (previous, next) = (pair[0].brick, pair[1].brick);
            let expected = if previous.trend() == next.trend() {
                previous.close.rate
            } else {
                previous.open.rate
            };
            assert_eq!(next.open.rate, expected);
        }
    }

    #[test]
    fn test_out_of_session_rejected() {
        let session = session();
        let london = Session::new(session.trade_date(), Market::London).unwrap();
        let mut feed = GridRenkoFeed::new(session, 10).unwrap();

        let rate = Rate::from_int(1000).unwrap();
        let early = Tick::new(london.min_tick_on(), rate, rate).unwrap();
        assert!(matches!(
            feed.handle_tick(&early),
            Err(ValidationError::OutOfSession { .. })
        ));
    }
}

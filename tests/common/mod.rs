#![allow(dead_code)]

use chrono::Duration;
use fxdata::{Market, Pair, Rate, Session, Source, Symbol, Tick, TickOn, TickSet, TradeDate};

pub const SCENARIO_START: i32 = 108_000;
pub const SCENARIO_LEG: i32 = 200;

pub fn session(year: i32, month: u32, day: u32, market: Market) -> Session {
    Session::new(TradeDate::from_ymd(year, month, day).unwrap(), market).unwrap()
}

pub fn scenario_session() -> Session {
    session(2016, 1, 4, Market::NewYork)
}

pub fn tick_at(session: &Session, millis: i64, bid: i32, ask: i32) -> Tick {
    let value = session.min_tick_on().value() + Duration::milliseconds(millis);
    Tick::new(
        TickOn::new(value, session).unwrap(),
        Rate::from_int(bid).unwrap(),
        Rate::from_int(ask).unwrap(),
    )
    .unwrap()
}

/// Prices for the up, down, up scenario, one unit per tick.
pub fn scenario_prices() -> Vec<i32> {
    let mut prices = vec![SCENARIO_START];
    let mut price = SCENARIO_START;
    for step in [1, -1, 1] {
        for _ in 0..SCENARIO_LEG {
            price += step;
            prices.push(price);
        }
    }
    prices
}

/// EURUSD/NewYork/2016-01-04 ticks whose mid follows `scenario_prices`.
pub fn scenario_tick_set() -> TickSet {
    let session = scenario_session();
    let mut tick_set = TickSet::new(Source::Dukascopy, Pair::new(Symbol::EurUsd), session);
    for (index, price) in scenario_prices().into_iter().enumerate() {
        let millis = index as i64 * 250;
        tick_set.add(tick_at(&session, millis, price - 1, price + 1)).unwrap();
    }
    tick_set
}

use std::collections::VecDeque;

use crate::types::{Brick, Tick};

/// Receives every brick a feed emits, in emission order.
pub trait BrickListener<E> {
    fn on_brick(&mut self, event: &E);
}

impl<E, F> BrickListener<E> for F
where
    F: FnMut(&E),
{
    fn on_brick(&mut self, event: &E) {
        self(event)
    }
}

pub(crate) struct Listeners<E> {
    listeners: Vec<Box<dyn BrickListener<E>>>,
}

impl<E> Listeners<E> {
    pub(crate) fn subscribe<L>(&mut self, listener: L)
    where
        L: BrickListener<E> + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn notify(&mut self, events: &[E]) {
        for event in events {
            for listener in self.listeners.iter_mut() {
                listener.on_brick(event);
            }
        }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Listeners {
            listeners: Vec::new(),
        }
    }
}

/// Brick emitted by a Renko feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenkoEvent {
    pub tick: Tick,
    pub brick: Brick,
    pub is_closed: bool,
}

/// Fixed-capacity window of closed bricks, oldest first.
#[derive(Debug, Clone)]
pub(crate) struct BrickWindow {
    bricks: VecDeque<Brick>,
    capacity: usize,
}

impl BrickWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        BrickWindow {
            bricks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, brick: Brick) {
        if self.bricks.len() == self.capacity {
            self.bricks.pop_front();
        }
        self.bricks.push_back(brick);
    }

    pub(crate) fn len(&self) -> usize {
        self.bricks.len()
    }

    /// Newest first.
    pub(crate) fn get(&self, index: usize) -> Option<&Brick> {
        self.bricks.iter().rev().nth(index)
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &Brick> + ExactSizeIterator {
        self.bricks.iter()
    }
}

pub(crate) fn pattern<'a, I>(bricks: I) -> String
where
    I: IntoIterator<Item = &'a Brick>,
{
    bricks.into_iter().map(|brick| brick.trend().as_char()).collect()
}

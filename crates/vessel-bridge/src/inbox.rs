//! Inbound message routing and the pre-subscription backlog.

use std::collections::VecDeque;
use std::fmt;

/// Callback receiving each message the module emits.
pub type Consumer = Box<dyn FnMut(Vec<u8>) + Send + 'static>;

/// Where a delivered message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed straight to the registered consumer
    Consumed,
    /// Held in the backlog until a consumer registers
    Buffered,
}

/// Routes inbound messages to the single active consumer.
///
/// Messages that arrive before any consumer is registered are kept in
/// arrival order and flushed to the first consumer that attaches. Once a
/// consumer exists the backlog stays empty; registering again replaces the
/// consumer and never replays earlier messages.
#[derive(Default)]
pub struct Inbox {
    backlog: VecDeque<Vec<u8>>,
    consumer: Option<Consumer>,
}

impl Inbox {
    /// Create an inbox with no consumer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one message.
    pub fn deliver(&mut self, message: Vec<u8>) -> Delivery {
        match self.consumer.as_mut() {
            Some(consumer) => {
                consumer(message);
                Delivery::Consumed
            }
            None => {
                self.backlog.push_back(message);
                Delivery::Buffered
            }
        }
    }

    /// Replace the consumer, then flush the backlog to it in arrival order.
    ///
    /// Returns the number of backlog messages flushed.
    pub fn set_consumer(&mut self, consumer: Consumer) -> usize {
        if self.consumer.is_some() {
            tracing::warn!("replacing active data consumer");
        }
        let consumer = self.consumer.insert(consumer);
        let flushed = self.backlog.len();
        for message in self.backlog.drain(..) {
            consumer(message);
        }
        flushed
    }

    /// Messages waiting for a consumer.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("backlog", &self.backlog.len())
            .field("has_consumer", &self.consumer.is_some())
            .finish()
    }
}

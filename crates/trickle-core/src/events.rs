//! Typed notifications emitted by the engine after successful state changes.
//!
//! Observers are called synchronously, in registration order, while the
//! operation that produced the event is still serialized against others.
//! They must not call back into the engine.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::constants::DEFAULT_EVENT_LOG_CAPACITY;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FaucetEvent {
    /// A claim was credited.
    ClaimSucceeded {
        requester: Address,
        #[serde(with = "crate::types::amount_str")]
        amount: u128,
        timestamp: u64,
    },
    /// The administrator set the pause flag (possibly to its current value).
    PauseStateChanged { paused: bool },
    /// The administrator bound a ledger.
    LedgerBound { ledger: Address },
}

/// Receiver of engine events.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &FaucetEvent);
}

/// Bounded in-memory history of the most recent events.
pub struct EventLog {
    events: Mutex<VecDeque<FaucetEvent>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Events oldest first.
    pub fn events(&self) -> Vec<FaucetEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// The `n` most recent events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<FaucetEvent> {
        let events = self.events.lock();
        let skip = events.len().saturating_sub(n);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventObserver for EventLog {
    fn on_event(&self, event: &FaucetEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pause(paused: bool) -> FaucetEvent {
        FaucetEvent::PauseStateChanged { paused }
    }

    #[test]
    fn log_keeps_order() {
        let log = EventLog::new(8);
        log.on_event(&pause(true));
        log.on_event(&pause(false));
        assert_eq!(log.events(), vec![pause(true), pause(false)]);
    }

    #[test]
    fn log_evicts_oldest_at_capacity() {
        let log = EventLog::new(2);
        log.on_event(&FaucetEvent::LedgerBound { ledger: Address::repeat_byte(1) });
        log.on_event(&pause(true));
        log.on_event(&pause(false));
        assert_eq!(log.len(), 2);
        assert_eq!(log.events(), vec![pause(true), pause(false)]);
    }

    #[test]
    fn zero_capacity_log_stays_empty() {
        let log = EventLog::new(0);
        log.on_event(&pause(true));
        assert!(log.is_empty());
    }

    #[test]
    fn recent_returns_tail() {
        let log = EventLog::default();
        for i in 0..5u64 {
            log.on_event(&FaucetEvent::ClaimSucceeded {
                requester: Address::repeat_byte(i as u8),
                amount: 1,
                timestamp: i,
            });
        }
        let tail = log.recent(2);
        assert_eq!(tail.len(), 2);
        assert!(matches!(tail[1], FaucetEvent::ClaimSucceeded { timestamp: 4, .. }));
        assert_eq!(log.recent(100).len(), 5);
    }

    #[test]
    fn claim_event_roundtrips_through_json() {
        let event = FaucetEvent::ClaimSucceeded {
            requester: Address::repeat_byte(3),
            amount: u128::MAX,
            timestamp: 42,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(&format!("\"amount\":\"{}\"", u128::MAX)));
        let back: FaucetEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_serializes_with_tag() {
        let json = serde_json::to_string(&pause(true)).unwrap();
        assert_eq!(json, r#"{"event":"pause_state_changed","paused":true}"#);
    }
}

/*
 * This file is part of gpadc.
 *
 * Copyright (C) 2025 gpadc contributors
 *
 * gpadc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gpadc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gpadc. If not, see <https://www.gnu.org/licenses/>.
 */

//! Single-slot completion handoff
//!
//! One producer (the interrupt path) posts at most one value per armed
//! request; one consumer waits for it with a deadline. Each arm hands out a
//! [`Ticket`]; a post carrying any other ticket is dropped, so a signal that
//! belongs to an earlier, already abandoned request can never resolve a
//! later one.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Identifies one armed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(pub(crate) u32);

/// Result of a bounded wait
#[derive(Debug, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Value(T),
    TimedOut,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    armed: bool,
    value: Option<T>,
}

/// Bounded single-slot channel between the interrupt path and one waiter
#[derive(Debug)]
pub struct CompletionChannel<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Default for CompletionChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompletionChannel<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                generation: 0,
                armed: false,
                value: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Drop any unconsumed value and accept exactly one post for the new ticket
    pub fn arm(&self) -> Ticket {
        let mut slot = self.slot.lock();
        slot.generation = slot.generation.wrapping_add(1);
        slot.armed = true;
        slot.value = None;
        Ticket(slot.generation)
    }

    /// Stop accepting posts and discard anything not yet consumed
    pub fn disarm(&self) {
        let mut slot = self.slot.lock();
        slot.armed = false;
        slot.value = None;
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().armed
    }

    /// Post the value for `ticket`. Returns false when the post was dropped.
    pub fn post(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !slot.armed || slot.generation != ticket.0 || slot.value.is_some() {
            return false;
        }
        slot.value = Some(value);
        drop(slot);
        self.ready.notify_one();
        true
    }

    /// Wait until the value for `ticket` arrives or `timeout` elapses
    pub fn wait_timeout(&self, ticket: Ticket, timeout: Duration) -> WaitOutcome<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            if slot.generation != ticket.0 {
                return WaitOutcome::TimedOut;
            }
            if let Some(value) = slot.value.take() {
                return WaitOutcome::Value(value);
            }
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                return match slot.value.take() {
                    Some(value) if slot.generation == ticket.0 => WaitOutcome::Value(value),
                    _ => WaitOutcome::TimedOut,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_post_then_wait() {
        let channel = CompletionChannel::new();
        let ticket = channel.arm();
        assert!(channel.post(ticket, 42u32));
        assert_eq!(channel.wait_timeout(ticket, Duration::from_millis(10)), WaitOutcome::Value(42));
    }

    #[test]
    fn test_wait_times_out_without_post() {
        let channel: CompletionChannel<u32> = CompletionChannel::new();
        let ticket = channel.arm();
        let start = Instant::now();
        assert_eq!(channel.wait_timeout(ticket, Duration::from_millis(20)), WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_post_rejected_when_disarmed() {
        let channel = CompletionChannel::new();
        let ticket = channel.arm();
        channel.disarm();
        assert!(!channel.post(ticket, 1u32));
        assert!(!channel.is_armed());
    }

    #[test]
    fn test_holds_at_most_one_value() {
        let channel = CompletionChannel::new();
        let ticket = channel.arm();
        assert!(channel.post(ticket, 1u32));
        assert!(!channel.post(ticket, 2u32));
        assert_eq!(channel.wait_timeout(ticket, Duration::from_millis(10)), WaitOutcome::Value(1));
    }

    #[test]
    fn test_stale_ticket_cannot_resolve_new_request() {
        let channel = CompletionChannel::new();
        let old = channel.arm();
        channel.disarm();

        let new = channel.arm();
        assert_ne!(old, new);
        assert!(!channel.post(old, 7u32));
        assert_eq!(channel.wait_timeout(new, Duration::from_millis(10)), WaitOutcome::TimedOut);
    }

    #[test]
    fn test_rearm_discards_unconsumed_value() {
        let channel = CompletionChannel::new();
        let first = channel.arm();
        assert!(channel.post(first, 5u32));

        let second = channel.arm();
        assert_eq!(channel.wait_timeout(second, Duration::from_millis(10)), WaitOutcome::TimedOut);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let channel = Arc::new(CompletionChannel::new());
        let ticket = channel.arm();

        let producer = {
            let channel = channel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                channel.post(ticket, 0xabcu32)
            })
        };

        let outcome = channel.wait_timeout(ticket, Duration::from_secs(1));
        assert!(producer.join().unwrap());
        assert_eq!(outcome, WaitOutcome::Value(0xabc));
    }
}

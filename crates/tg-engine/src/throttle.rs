//! Sliding-window rate governor for CC output.
//!
//! Messages are stamped on enqueue and at most `max_rate` of them may sit in
//! the one-second window. Draining releases a share proportional to the time
//! since the last drain, so bursts are spread out instead of flooding the
//! transport.

use core::time::Duration;

use arrayvec::ArrayVec;
use heapless::Deque;

use crate::dispatch::CcMessage;

/// Upper bound on `max_rate` and the queue's storage.
pub const MAX_QUEUE: usize = 1024;

pub const DEFAULT_MAX_RATE: u32 = 100;

const WINDOW: Duration = Duration::from_secs(1);
const MIN_DRAIN_INTERVAL: Duration = Duration::from_millis(10);

pub type Drained = ArrayVec<CcMessage, MAX_QUEUE>;

pub struct ThrottleQueue {
    queue: Deque<(CcMessage, Duration), MAX_QUEUE>,
    max_rate: u32,
    last_drain: Duration,
}

impl ThrottleQueue {
    pub fn new(max_rate: u32) -> Self {
        Self {
            queue: Deque::new(),
            max_rate: clamp_rate(max_rate),
            last_drain: Duration::ZERO,
        }
    }

    pub fn max_rate(&self) -> u32 {
        self.max_rate
    }

    /// Change the rate. Queued messages beyond the new bound stay until drained.
    pub fn set_max_rate(&mut self, max_rate: u32) {
        self.max_rate = clamp_rate(max_rate);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue `msg` stamped at `now`. Returns false when the window is full.
    pub fn enqueue(&mut self, msg: CcMessage, now: Duration) -> bool {
        self.evict(now);
        if self.queue.len() >= self.max_rate as usize {
            return false;
        }
        self.queue.push_back((msg, now)).is_ok()
    }

    /// Release the share of messages due since the last drain.
    pub fn drain(&mut self, now: Duration) -> Drained {
        let mut out = Drained::new();
        let elapsed = now.saturating_sub(self.last_drain);
        if elapsed < MIN_DRAIN_INTERVAL {
            return out;
        }
        self.last_drain = now;

        let due = (self.max_rate as u128 * elapsed.as_millis() / 1000).max(1);
        let count = due.min(self.queue.len() as u128) as usize;
        for _ in 0..count {
            match self.queue.pop_front() {
                Some((msg, _)) => out.push(msg),
                None => break,
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    fn evict(&mut self, now: Duration) {
        while let Some((_, stamp)) = self.queue.front() {
            if now.saturating_sub(*stamp) > WINDOW {
                self.queue.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for ThrottleQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RATE)
    }
}

fn clamp_rate(rate: u32) -> u32 {
    rate.clamp(1, MAX_QUEUE as u32)
}

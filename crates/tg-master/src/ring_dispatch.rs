//! Lock-free hand-off of sequencer output to the transport thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tg_engine::{CcMessage, Dispatcher, Trigger};
use tracing::warn;

#[derive(Debug, Default)]
struct DropCounters {
    triggers: AtomicU64,
    ccs: AtomicU64,
}

/// Events lost because the consumer fell behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dropped {
    pub triggers: u64,
    pub ccs: u64,
}

/// Producer half, owned by the sequencer. Never blocks; a full ring drops.
pub struct RingDispatcher {
    triggers: HeapProd<Trigger>,
    ccs: HeapProd<CcMessage>,
    dropped: Arc<DropCounters>,
}

/// Consumer half, polled by whatever forwards events to hardware.
pub struct OutputReceiver {
    triggers: HeapCons<Trigger>,
    ccs: HeapCons<CcMessage>,
    dropped: Arc<DropCounters>,
    reported: Dropped,
}

/// Build a connected pair with room for `capacity` events of each kind.
pub fn ring_dispatcher(capacity: usize) -> (RingDispatcher, OutputReceiver) {
    let (trigger_tx, trigger_rx) = HeapRb::<Trigger>::new(capacity).split();
    let (cc_tx, cc_rx) = HeapRb::<CcMessage>::new(capacity).split();
    let dropped = Arc::new(DropCounters::default());
    (
        RingDispatcher { triggers: trigger_tx, ccs: cc_tx, dropped: dropped.clone() },
        OutputReceiver { triggers: trigger_rx, ccs: cc_rx, dropped, reported: Dropped::default() },
    )
}

impl Dispatcher for RingDispatcher {
    fn send_trigger(&mut self, trigger: Trigger) {
        if self.triggers.try_push(trigger).is_err() {
            self.dropped.triggers.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn send_cc(&mut self, msg: CcMessage) {
        if self.ccs.try_push(msg).is_err() {
            self.dropped.ccs.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl OutputReceiver {
    pub fn pop_trigger(&mut self) -> Option<Trigger> {
        self.triggers.try_pop()
    }

    pub fn pop_cc(&mut self) -> Option<CcMessage> {
        self.ccs.try_pop()
    }

    /// Everything queued so far, triggers first.
    pub fn drain(&mut self) -> (Vec<Trigger>, Vec<CcMessage>) {
        let triggers = self.triggers.pop_iter().collect();
        let ccs = self.ccs.pop_iter().collect();
        (triggers, ccs)
    }

    pub fn dropped(&self) -> Dropped {
        Dropped {
            triggers: self.dropped.triggers.load(Ordering::Relaxed),
            ccs: self.dropped.ccs.load(Ordering::Relaxed),
        }
    }

    /// Warn about drops since the last report. Returns the new totals.
    pub fn report_drops(&mut self) -> Dropped {
        let now = self.dropped();
        if now != self.reported {
            warn!(
                triggers = now.triggers - self.reported.triggers,
                ccs = now.ccs - self.reported.ccs,
                "output ring overflow"
            );
            self.reported = now;
        }
        now
    }
}

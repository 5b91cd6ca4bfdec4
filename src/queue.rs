//! Per-worker job queues with one lane per sender.
//!
//! Each worker owns a [`WorkQueue`]; every producer (each worker plus the
//! controller) gets a dedicated lane into it, so enqueueing never blocks and
//! FIFO order holds per (sender, receiver) pair (there is no global order).
//! The consumer blocks until any lane has an item, choosing among ready lanes
//! at random so no sender can be starved.

use crossbeam_channel::{unbounded, Receiver, Select, Sender};

/// The consuming side of one worker's queue.
pub struct WorkQueue<T> {
    lanes: Vec<Receiver<T>>,
}

/// One producer's handles into every worker's queue.
///
/// A `LaneSender` must only be used by the single producer it was built for;
/// per-lane FIFO is only meaningful with one sender per lane.
pub struct LaneSender<T> {
    lane: usize,
    txs: Vec<Sender<T>>,
}

/// Builds `workers` queues, each with `senders` lanes, and returns the
/// matching sender handles (handle `i` feeds lane `i` of every queue).
pub fn build<T>(workers: usize, senders: usize) -> (Vec<WorkQueue<T>>, Vec<LaneSender<T>>) {
    let mut lanes_per_queue: Vec<Vec<Receiver<T>>> =
        (0..workers).map(|_| Vec::with_capacity(senders)).collect();
    let mut handles = Vec::with_capacity(senders);

    for lane in 0..senders {
        let mut txs = Vec::with_capacity(workers);
        for queue_lanes in lanes_per_queue.iter_mut() {
            let (tx, rx) = unbounded();
            txs.push(tx);
            queue_lanes.push(rx);
        }
        handles.push(LaneSender { lane, txs });
    }

    let queues = lanes_per_queue
        .into_iter()
        .map(|lanes| WorkQueue { lanes })
        .collect();
    (queues, handles)
}

impl<T> LaneSender<T> {
    /// This sender's lane index.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Enqueues `item` for `worker`. Never blocks. A send to a worker that
    /// has already shut down is silently dropped; termination is
    /// asynchronous and late jobs are abandoned.
    pub fn send_to(&self, worker: usize, item: T) {
        let _ = self.txs[worker].send(item);
    }
}

impl<T> WorkQueue<T> {
    /// Number of lanes feeding this queue.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// True when no lane holds a pending item.
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(|rx| rx.is_empty())
    }

    /// Blocks until an item is available on any lane and returns it, or
    /// returns `None` once every lane has disconnected.
    ///
    /// Ready lanes are chosen at random, which is what gives the fairness
    /// guarantee: a lane with a pending item is picked with probability at
    /// least 1/lanes on every call.
    pub fn dequeue(&self) -> Option<T> {
        let mut sel = Select::new();
        for rx in &self.lanes {
            sel.recv(rx);
        }

        let mut live = self.lanes.len();
        loop {
            if live == 0 {
                return None;
            }
            let op = sel.select();
            let idx = op.index();
            match op.recv(&self.lanes[idx]) {
                Ok(item) => return Some(item),
                Err(_) => {
                    // Lane disconnected; stop polling it.
                    sel.remove(idx);
                    live -= 1;
                }
            }
        }
    }
}

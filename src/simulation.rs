use crate::base_station::BaseStations;
use crate::call::{Call, CallRecord};
use crate::stats::Stats;
use log::debug;
use slotmap::{new_key_type, SlotMap};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

new_key_type! {
    pub struct CallKey;
}

#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub num_stations: usize,
    pub channels_per_station: u32,
    pub reserve_policy: bool,
    pub cell_width: f64,
}

// The next pending timeline point of one active call. BinaryHeap is a
// max-heap, so the ordering is reversed to pop the earliest point first.
// Ties break by admission order, which keeps replays of the same stream
// identical.
struct NextEvent {
    at: f64,
    order: u64,
    call: CallKey,
}

impl Ord for NextEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .partial_cmp(&other.at)
            .expect("event times are finite")
            .then_with(|| self.order.cmp(&other.order))
            .reverse()
    }
}

impl PartialOrd for NextEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NextEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NextEvent {}

pub struct Simulation {
    config: SimConfig,
    stations: BaseStations,
    clock: f64,
    active: SlotMap<CallKey, Call>,
    events: BinaryHeap<NextEvent>,
    admissions: u64,
    stats: Stats,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            stations: BaseStations::new(config.num_stations, config.channels_per_station),
            config,
            clock: 0.0,
            active: SlotMap::with_key(),
            events: BinaryHeap::new(),
            admissions: 0,
            stats: Stats::default(),
        }
    }

    /// Drive one run to completion: repeatedly apply the globally earliest
    /// pending event, either the eligible arrival or an active call's next
    /// timeline point. Active events win ties against the arrival. The run
    /// ends once the stream is exhausted and every admitted call has
    /// reached a terminal outcome, so the three outcome counters always
    /// account for the whole stream.
    pub fn run(mut self, mut records: impl ExactSizeIterator<Item = CallRecord>) -> Stats {
        self.stats.total_calls = records.len() as u64;
        let mut pending = records.next().map(|r| (self.clock + r.arrival_gap, r));

        loop {
            let next_active = self.events.peek().map(|ev| ev.at);
            if let Some((at, record)) = pending {
                if next_active.map_or(true, |t| at < t) {
                    self.admit(at, record);
                    // the next arrival gap counts from this admission
                    // attempt whether or not the call got a channel
                    pending = records.next().map(|r| (self.clock + r.arrival_gap, r));
                } else {
                    self.step();
                }
            } else if next_active.is_some() {
                self.step();
            } else {
                break;
            }
        }

        debug_assert!(self.active.is_empty());
        debug_assert_eq!(
            self.stats.blocked + self.stats.dropped + self.stats.completed,
            self.stats.total_calls
        );
        debug!(
            "run finished: reserve_policy={} blocked={} dropped={} completed={}",
            self.config.reserve_policy,
            self.stats.blocked,
            self.stats.dropped,
            self.stats.completed
        );
        self.stats
    }

    fn admit(&mut self, at: f64, record: CallRecord) {
        debug_assert!(at >= self.clock);
        self.clock = at;

        let cell = (record.start_position / self.config.cell_width).floor() as usize;
        if !self.stations.acquire(cell) {
            self.stats.blocked += 1;
            return;
        }

        let call = Call::activate(record, self.clock, self.config.cell_width);
        let first = call
            .timeline
            .front()
            .expect("a fresh timeline is never empty")
            .at;
        let key = self.active.insert(call);
        self.events.push(NextEvent {
            at: first,
            order: self.admissions,
            call: key,
        });
        self.admissions += 1;
    }

    fn step(&mut self) {
        let ev = match self.events.pop() {
            Some(ev) => ev,
            None => return,
        };
        debug_assert!(ev.at >= self.clock);
        self.clock = ev.at;

        let (point, crossing, from_cell) = {
            let call = self
                .active
                .get_mut(ev.call)
                .expect("heap entries track live calls only");
            let point = call
                .timeline
                .pop_front()
                .expect("an active call keeps a pending point");
            (point, !call.timeline.is_empty(), call.current_cell)
        };
        let dest = (point.position / self.config.cell_width).floor() as usize;

        if crossing {
            debug_assert_eq!(dest, from_cell + 1);
            if self
                .stations
                .handover(from_cell, from_cell + 1, self.config.reserve_policy)
            {
                let call = &mut self.active[ev.call];
                call.current_cell = from_cell + 1;
                let at = call
                    .timeline
                    .front()
                    .expect("a crossing leaves points behind it")
                    .at;
                self.events.push(NextEvent {
                    at,
                    order: ev.order,
                    call: ev.call,
                });
            } else {
                self.active.remove(ev.call);
                self.stats.dropped += 1;
            }
        } else {
            debug_assert_eq!(dest, from_cell);
            self.stations.release(from_cell);
            self.active.remove(ev.call);
            self.stats.completed += 1;
        }
    }
}

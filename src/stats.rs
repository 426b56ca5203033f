/// Terminal-outcome counters for one simulation run. Every call ends in
/// exactly one of the three outcomes, so after a run
/// `blocked + dropped + completed == total_calls`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    pub total_calls: u64,
    pub blocked: u64,
    pub dropped: u64,
    pub completed: u64,
}

impl Stats {
    pub fn block_rate(&self) -> f64 {
        self.rate(self.blocked)
    }

    pub fn drop_rate(&self) -> f64 {
        self.rate(self.dropped)
    }

    fn rate(&self, count: u64) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            count as f64 / self.total_calls as f64
        }
    }
}

pub struct BaseStations {
    occupied: Vec<u32>,
    channels_per_station: u32,
}

impl BaseStations {
    pub fn new(num_stations: usize, channels_per_station: u32) -> Self {
        Self {
            occupied: vec![0; num_stations],
            channels_per_station,
        }
    }

    /// Take a channel for a new call. Indices past the last station are
    /// off-network and always succeed.
    pub fn acquire(&mut self, idx: usize) -> bool {
        self.add(idx, self.channels_per_station)
    }

    /// Take a channel for a handover under the guard-channel policy: one
    /// channel above the normal admission capacity stays usable here.
    pub fn acquire_guarded(&mut self, idx: usize) -> bool {
        self.add(idx, self.channels_per_station + 1)
    }

    /// Give a channel back. Releasing an empty or off-network cell is a
    /// no-op, a double release from a malformed call history must not
    /// underflow the counter.
    pub fn release(&mut self, idx: usize) {
        if let Some(count) = self.occupied.get_mut(idx) {
            *count = count.saturating_sub(1);
        }
    }

    /// Move a call from one cell to the next. The source channel is
    /// vacated even when the destination rejects the call, the caller
    /// records the rejection as a drop.
    pub fn handover(&mut self, from: usize, to: usize, guarded: bool) -> bool {
        self.release(from);
        if guarded {
            self.acquire_guarded(to)
        } else {
            self.acquire(to)
        }
    }

    fn add(&mut self, idx: usize, limit: u32) -> bool {
        let count = match self.occupied.get_mut(idx) {
            Some(count) => count,
            None => return true,
        };
        if *count < limit {
            *count += 1;
            debug_assert!(*count <= self.channels_per_station + 1);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    fn occupancy(&self, idx: usize) -> u32 {
        self.occupied.get(idx).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_stops_at_capacity() {
        let mut bss = BaseStations::new(1, 2);
        assert!(bss.acquire(0));
        assert!(bss.acquire(0));
        assert!(!bss.acquire(0));
        assert_eq!(bss.occupancy(0), 2);
    }

    #[test]
    fn guarded_acquire_allows_one_extra_channel() {
        let mut bss = BaseStations::new(1, 1);
        assert!(bss.acquire(0));
        assert!(!bss.acquire(0));
        assert!(bss.acquire_guarded(0));
        assert!(!bss.acquire_guarded(0));
        assert_eq!(bss.occupancy(0), 2);
    }

    #[test]
    fn off_network_cells_never_reject() {
        let mut bss = BaseStations::new(2, 1);
        assert!(bss.acquire(2));
        assert!(bss.acquire(17));
        assert!(bss.acquire_guarded(2));
        bss.release(2);
        assert_eq!(bss.occupancy(2), 0);
    }

    #[test]
    fn releasing_an_empty_cell_is_a_noop() {
        let mut bss = BaseStations::new(1, 3);
        bss.release(0);
        assert_eq!(bss.occupancy(0), 0);
        assert!(bss.acquire(0));
        bss.release(0);
        bss.release(0);
        assert_eq!(bss.occupancy(0), 0);
    }

    #[test]
    fn rejected_handover_still_vacates_the_source_cell() {
        let mut bss = BaseStations::new(2, 1);
        assert!(bss.acquire(0));
        assert!(bss.acquire(1));
        assert!(!bss.handover(0, 1, false));
        assert_eq!(bss.occupancy(0), 0);
        assert_eq!(bss.occupancy(1), 1);
    }

    #[test]
    fn guarded_handover_succeeds_into_a_full_cell() {
        let mut bss = BaseStations::new(2, 1);
        assert!(bss.acquire(0));
        assert!(bss.acquire(1));
        assert!(bss.handover(0, 1, true));
        assert_eq!(bss.occupancy(0), 0);
        assert_eq!(bss.occupancy(1), 2);
    }
}

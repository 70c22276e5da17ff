//! Coalesced scan progress
//!
//! Percentages use integer arithmetic, rounding half up, clamped to 100. A
//! store that reports zero records counts as complete from the first record.

/// Integer percentage of `visited` out of `total`.
pub fn percent(visited: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let visited = visited as u128;
    let total = total as u128;
    let pct = (200 * visited + total) / (2 * total);
    pct.min(100) as u8
}

/// Emits the first percentage, then only ones above the last emitted.
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    total: u64,
    last: Option<u8>,
}

impl ProgressMeter {
    pub fn new(total: u64) -> Self {
        Self { total, last: None }
    }

    /// Returns the new percentage if it differs from the last emitted value.
    pub fn advance(&mut self, visited: u64) -> Option<u8> {
        let pct = percent(visited, self.total);
        match self.last {
            Some(last) if pct <= last => None,
            _ => {
                self.last = Some(pct);
                Some(pct)
            }
        }
    }

    pub fn last_emitted(&self) -> Option<u8> {
        self.last
    }
}

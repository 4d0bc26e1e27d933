//! Run-wide pass/total accounting.

/// Aggregate counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
}

impl RunSummary {
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    /// True when nothing failed, including the empty run.
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Process exit status for the run: `0` when everything passed, `1` otherwise.
    pub fn exit_status(&self) -> i32 {
        if self.all_passed() { 0 } else { 1 }
    }
}

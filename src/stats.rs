/// Counters filled in by the `*_with_stats` operations.
///
/// Owned by the caller and only ever added to, so one value can accumulate
/// across many operations or be reset between them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Single rotations performed. An inside repair counts as two.
    pub rotations: usize,
    /// Nodes compared against while descending.
    pub visits: usize,
    /// Colour flips applied.
    pub flips: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

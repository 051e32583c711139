/// Converts transferred byte counts into percent-complete values.
///
/// Percents are rounded, clamped to `0..=100` and never decrease.
/// An empty payload counts as fully transferred.
#[derive(Debug, Clone)]
pub struct ByteProgress {
    total_bytes: u64,
    transferred_bytes: u64,
    last_percent: u8,
}

impl ByteProgress {
    /// Creates a tracker for a payload of `total_bytes`.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            transferred_bytes: 0,
            last_percent: 0,
        }
    }

    /// Records `bytes` more transferred and returns the current percent.
    pub fn advance(&mut self, bytes: u64) -> u8 {
        self.transferred_bytes = self.transferred_bytes.saturating_add(bytes);
        let percent = self.compute();
        if percent > self.last_percent {
            self.last_percent = percent;
        }
        self.last_percent
    }

    /// Marks the payload as fully transferred.
    pub fn finish(&mut self) -> u8 {
        self.transferred_bytes = self.total_bytes;
        self.last_percent = 100;
        self.last_percent
    }

    /// Returns the last reported percent.
    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    /// Returns bytes transferred so far (capped at the payload size).
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.min(self.total_bytes)
    }

    fn compute(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let sent = self.transferred_bytes.min(self.total_bytes);
        (sent as f64 / self.total_bytes as f64 * 100.0).round() as u8
    }
}

use tracerlog_protocol::TraceEntry;

/// Ordered in-memory log of trace entries awaiting a flush.
///
/// The buffer only decides *when* a flush is due; the caller owns delivery.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: Vec<TraceEntry>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Returns the drained contents when the buffer reached
    /// `limit`, leaving it empty.
    pub fn push(&mut self, entry: TraceEntry, limit: usize) -> Option<Vec<TraceEntry>> {
        self.entries.push(entry);
        if self.entries.len() >= limit.max(1) {
            Some(self.take())
        } else {
            None
        }
    }

    /// Appends an entry without checking the limit.
    pub fn push_unchecked(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Drains every buffered entry, oldest first.
    pub fn take(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Discards every buffered entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

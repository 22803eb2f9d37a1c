//! Per-batch progress reporting

/// Progress after one committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress<'a> {
    /// Table being migrated
    pub table: &'a str,
    /// 1-based batch number within this run
    pub batch: usize,
    /// Rows written by this batch
    pub rows_in_batch: usize,
    /// Rows written by this run so far
    pub rows_done: usize,
    /// Rows that were pending when the run started
    pub rows_total: usize,
}

/// Receives progress as batches commit.
///
/// The job already logs each batch; observers drive extra output such as a
/// terminal progress bar.
pub trait ProgressObserver {
    /// Called once before the first batch
    fn on_start(&self, _table: &str, _rows_total: usize) {}

    /// Called after each committed batch
    fn on_batch(&self, progress: &BatchProgress<'_>);

    /// Called once after the last batch
    fn on_finish(&self, _table: &str) {}
}

/// Observer that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_batch(&self, _progress: &BatchProgress<'_>) {}
}

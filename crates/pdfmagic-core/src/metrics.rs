use serde::Serialize;

/// Summary of one pipeline run, reported alongside the assembled document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessMetrics {
    pub item_count: usize,
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: usize,
    pub processing_time_ms: u64,
}

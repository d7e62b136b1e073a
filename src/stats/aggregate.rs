use super::ProcessingRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const BYTES_PER_MB: f64 = 1024. * 1024.;

/// Running totals for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatAggregate {
    pub date: NaiveDate,
    pub total_images: u64,
    pub total_faces_detected: u64,
    pub total_metadata_removals: u64,
    pub total_face_blurs: u64,
    pub total_original_size_mb: f64,
    pub total_processed_size_mb: f64,
    pub avg_processing_time_ms: f64,
}

impl DailyStatAggregate {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_images: 0,
            total_faces_detected: 0,
            total_metadata_removals: 0,
            total_face_blurs: 0,
            total_original_size_mb: 0.,
            total_processed_size_mb: 0.,
            avg_processing_time_ms: 0.,
        }
    }

    /// Fold one successful record into the totals. Failed records are left
    /// out; returns whether the record was counted.
    pub fn fold(&mut self, record: &ProcessingRecord) -> bool {
        if !record.success {
            return false;
        }

        self.total_images += 1;
        self.total_faces_detected += record.faces_detected as u64;
        if record.metadata_removed {
            self.total_metadata_removals += 1;
        }
        if record.faces_blurred {
            self.total_face_blurs += 1;
        }
        self.total_original_size_mb += record.original_size as f64 / BYTES_PER_MB;
        self.total_processed_size_mb += record.processed_size as f64 / BYTES_PER_MB;
        self.update_avg(record.processing_time_ms as f64);

        true
    }

    // Count is already incremented for the new value
    fn update_avg(&mut self, value: f64) {
        let count = self.total_images as f64;
        self.avg_processing_time_ms = (self.avg_processing_time_ms * (count - 1.) + value) / count;
    }
}

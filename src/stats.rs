use crate::error::RedactError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use aggregate::DailyStatAggregate;
pub use store::{JsonFileStore, MemoryStatsStore};

mod aggregate;
mod store;

/// One face as stored with its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// 1-based position of the face within the image.
    pub index: usize,
    pub confidence: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub expression: Option<String>,
}

/// Everything known about one processing invocation, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source_identity: Option<String>,
    pub user_agent: Option<String>,
    pub original_filename: Option<String>,
    pub processed_filename: Option<String>,
    pub original_size: u64,
    pub processed_size: u64,
    pub metadata_removed: bool,
    pub faces_detected: usize,
    pub faces_blurred: bool,
    pub strength: Option<u32>,
    pub faces: Vec<FaceDetection>,
    pub processing_time_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl ProcessingRecord {
    /// Empty record stamped now, to be filled in as processing goes.
    pub fn started(id: Uuid) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            source_identity: None,
            user_agent: None,
            original_filename: None,
            processed_filename: None,
            original_size: 0,
            processed_size: 0,
            metadata_removed: false,
            faces_detected: 0,
            faces_blurred: false,
            strength: None,
            faces: Vec::new(),
            processing_time_ms: 0,
            success: false,
            error: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Durable home for processing records and the per-day aggregates built
/// from them.
///
/// `record` must apply the aggregate update for one record atomically with
/// respect to other records of the same day.
pub trait StatsStore: Send + Sync {
    fn record(&self, record: ProcessingRecord) -> Result<(), RedactError>;

    fn daily(&self, date: NaiveDate) -> Result<Option<DailyStatAggregate>, RedactError>;

    fn sessions(&self) -> Result<Vec<ProcessingRecord>, RedactError>;
}

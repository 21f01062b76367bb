pub mod approval;
pub mod catalog;
pub mod learning;
pub mod media;

pub use approval::ApprovalWorkflow;
pub use catalog::CourseCatalog;
pub use learning::ProgressTracker;
pub use media::MediaStore;

/// Wall-clock timestamp in the same shape SQLite's CURRENT_TIMESTAMP uses.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

use tracing::warn;

use crate::model::entry::RawLogRecord;
use crate::model::frame::{Field, Frame, VisType};
use crate::normalize::{NormalizedRecord, normalize};

pub fn log_frame(record: NormalizedRecord) -> Frame {
    Frame::new(record.id)
        .with_field(Field::time("time", vec![record.timestamp]))
        .with_field(Field::string("content", record.labels, vec![record.body]))
        .with_visualization(VisType::Logs)
}

pub fn build_frames<I>(records: I) -> Vec<Frame>
where
    I: IntoIterator<Item = NormalizedRecord>,
{
    records.into_iter().map(log_frame).collect()
}

/// Normalizes and frames raw entries in provider order. Entries that cannot be
/// normalized are logged and skipped.
pub fn frames_from_records(records: &[RawLogRecord]) -> Vec<Frame> {
    build_frames(records.iter().filter_map(|record| {
        normalize(record)
            .inspect_err(|err| {
                warn!(insert_id = %record.insert_id, error = %err, "skipping log entry");
            })
            .ok()
    }))
}

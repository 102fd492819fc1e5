use super::chunker::ChunkPlan;
use super::types::{ProgressCallback, TransferProgress};

/// 进度跟踪器
/// 每个分块被宿主确认后发送一次事件
#[derive(Clone)]
pub struct ProgressTracker {
    file_name: String,
    plan: ChunkPlan,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(file_name: impl Into<String>, plan: ChunkPlan, callback: Option<ProgressCallback>) -> Self {
        Self {
            file_name: file_name.into(),
            plan,
            callback,
        }
    }

    pub fn emit_chunk_done(&self, chunk_index: usize) {
        let event = TransferProgress {
            file_name: self.file_name.clone(),
            chunk_index,
            total_chunks: self.plan.total_chunks(),
            percent: self.plan.percent_after(chunk_index),
        };

        log::debug!(
            "{}: chunk {}/{} ({:.1}%)",
            event.file_name,
            chunk_index + 1,
            event.total_chunks,
            event.percent
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn events_carry_plan_totals() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));

        let tracker = ProgressTracker::new("a.png", ChunkPlan::new(2500, 1000), Some(callback));
        for index in 0..3 {
            tracker.emit_chunk_done(index);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|p| p.total_chunks == 3 && p.file_name == "a.png"));
        assert_eq!(seen[2].percent, 100.0);
    }

    #[test]
    fn missing_callback_is_fine() {
        let tracker = ProgressTracker::new("a.png", ChunkPlan::new(10, 1000), None);
        tracker.emit_chunk_done(0);
    }
}

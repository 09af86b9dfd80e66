use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use princess::dag::Stage;
use princess::errors::Result;
use princess::store::{StageStore, StageUpdate};

/// A fake stage store that:
/// - serves a fixed stage list for any project
/// - records every update batch it receives
/// - optionally fails updates, to exercise rollback paths.
pub struct RecordingStore {
    stages: Vec<Stage>,
    batches: Arc<Mutex<Vec<Vec<StageUpdate>>>>,
    fail_updates: bool,
}

impl RecordingStore {
    pub fn new(stages: Vec<Stage>, batches: Arc<Mutex<Vec<Vec<StageUpdate>>>>) -> Self {
        Self {
            stages,
            batches,
            fail_updates: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_updates = true;
        self
    }
}

impl StageStore for RecordingStore {
    fn load_stages(
        &mut self,
        _project: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stage>>> + Send + '_>> {
        let stages = self.stages.clone();
        Box::pin(async move { Ok(stages) })
    }

    fn update_stages(
        &mut self,
        _project: &str,
        updates: Vec<StageUpdate>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let batches = Arc::clone(&self.batches);
        let fail = self.fail_updates;

        Box::pin(async move {
            if fail {
                return Err(anyhow::anyhow!("store unavailable").into());
            }
            batches.lock().unwrap().push(updates);
            Ok(())
        })
    }
}

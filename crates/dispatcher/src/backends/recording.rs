//! RecordingBackend - keeps every post in memory

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use contracts::{ContractError, MetricContext, MetricEvent, MetricValue, MetricsBackend};

/// Process-wide post counter, so ordering is comparable across recorders
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One recorded post
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPost {
    /// Global sequence number, increasing in call order
    pub seq: u64,
    pub event: MetricEvent,
}

/// Backend that appends every post to an ordered in-memory log
///
/// Never fails. Used to observe fan-out order and argument fidelity.
pub struct RecordingBackend {
    name: String,
    log: Mutex<Vec<RecordedPost>>,
}

impl RecordingBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Recorded events, in call order
    pub fn entries(&self) -> Vec<MetricEvent> {
        self.log.lock().iter().map(|p| p.event.clone()).collect()
    }

    /// Recorded posts with their sequence numbers
    pub fn sequenced(&self) -> Vec<RecordedPost> {
        self.log.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

#[async_trait]
impl MetricsBackend for RecordingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn post(
        &self,
        name: &str,
        value: &MetricValue,
        context: &MetricContext,
    ) -> Result<(), ContractError> {
        let event = MetricEvent::new(name, value.clone(), context.clone());
        let mut log = self.log.lock();
        log.push(RecordedPost {
            seq: SEQUENCE.fetch_add(1, Ordering::SeqCst),
            event,
        });
        Ok(())
    }
}

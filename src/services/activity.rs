//! Activity event recording
//!
//! Events are stamped with the session context when recorded and queued to a
//! single worker, which posts them one at a time. Delivery order therefore
//! matches recording order. Failed posts are logged and not retried.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use super::traits::ActivitySink;
use crate::models::{Activity, ActivityEvent, ActivityType, SessionContext};

pub struct ActivityRecorder {
    context: SessionContext,
    tx: Option<mpsc::UnboundedSender<ActivityEvent>>,
    worker: Option<JoinHandle<()>>,
    /// A start or resume has been recorded since the last complete
    started: bool,
}

impl ActivityRecorder {
    pub fn spawn(context: SessionContext, sink: Arc<dyn ActivitySink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(Self::post_loop(rx, sink).in_current_span());
        Self {
            context,
            tx: Some(tx),
            worker: Some(worker),
            started: false,
        }
    }

    async fn post_loop(mut rx: mpsc::UnboundedReceiver<ActivityEvent>, sink: Arc<dyn ActivitySink>) {
        while let Some(event) = rx.recv().await {
            match sink.post(&event).await {
                Ok(()) => debug!(
                    "Posted {} activity for lesson {}",
                    event.activity_type(),
                    event.lesson_id
                ),
                Err(e) => warn!(
                    "Failed to post {} activity for lesson {}: {}",
                    event.activity_type(),
                    event.lesson_id,
                    e
                ),
            }
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Queue an activity. Returns `false` when it was not recorded.
    pub fn record(&mut self, activity: Activity) -> bool {
        match activity.activity_type() {
            ActivityType::Start | ActivityType::Resume => self.started = true,
            ActivityType::Complete if !self.started => {
                warn!(
                    "Skipping complete for lesson {}: playback never started this session",
                    self.context.lesson_id
                );
                return false;
            }
            ActivityType::Complete => self.started = false,
            _ => {}
        }

        let Some(tx) = &self.tx else {
            debug!("Recorder shut down; dropping {}", activity.activity_type());
            return false;
        };
        tx.send(ActivityEvent::new(&self.context, activity)).is_ok()
    }

    /// Stop accepting events and wait for queued ones to be posted
    pub async fn shutdown(&mut self) {
        self.tx = None;
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            warn!("Activity worker for lesson {} failed: {}", self.context.lesson_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryActivitySink;
    use crate::services::traits::MockActivitySink;
    use mockall::Sequence;
    use tracing_test::traced_test;

    fn context() -> SessionContext {
        SessionContext::new("student-1", "lesson-1")
    }

    #[tokio::test]
    async fn test_events_are_posted_in_order_with_context() {
        let sink = Arc::new(InMemoryActivitySink::new());
        let mut recorder = ActivityRecorder::spawn(context(), sink.clone());
        let session_id = recorder.context().session_id;

        recorder.record(Activity::Start { position: 0.0 });
        recorder.record(Activity::Seek {
            from_time: 5.0,
            to_time: 50.0,
        });
        recorder.record(Activity::Pause { position: 50.0 });
        recorder.shutdown().await;

        assert_eq!(
            sink.types().await,
            vec![ActivityType::Start, ActivityType::Seek, ActivityType::Pause]
        );
        let events = sink.events().await;
        assert!(events.iter().all(|e| e.session_id == session_id));
        assert!(events.iter().all(|e| e.student_id == "student-1"));
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_complete_requires_a_start() {
        let sink = Arc::new(InMemoryActivitySink::new());
        let mut recorder = ActivityRecorder::spawn(context(), sink.clone());

        assert!(!recorder.record(Activity::Complete { duration: 60.0 }));
        assert!(recorder.record(Activity::Resume { position: 10.0 }));
        assert!(recorder.record(Activity::Complete { duration: 60.0 }));
        assert!(!recorder.record(Activity::Complete { duration: 60.0 }));
        recorder.shutdown().await;

        assert_eq!(
            sink.types().await,
            vec![ActivityType::Resume, ActivityType::Complete]
        );
        assert!(logs_contain("playback never started"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_posts_are_not_retried() {
        let mut sink = MockActivitySink::new();
        let mut seq = Sequence::new();
        sink.expect_post()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(crate::errors::ServiceError::status("activity", 500, "boom")));
        sink.expect_post()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut recorder = ActivityRecorder::spawn(context(), Arc::new(sink));
        recorder.record(Activity::Start { position: 0.0 });
        recorder.record(Activity::Pause { position: 3.0 });
        recorder.shutdown().await;

        assert!(logs_contain("Failed to post start activity"));
    }

    #[tokio::test]
    async fn test_record_after_shutdown_is_dropped() {
        let sink = Arc::new(InMemoryActivitySink::new());
        let mut recorder = ActivityRecorder::spawn(context(), sink.clone());
        recorder.shutdown().await;

        assert!(!recorder.record(Activity::Start { position: 0.0 }));
        assert!(sink.events().await.is_empty());
    }
}

//! Periodic position checkpoints
//!
//! The checkpointer counts media playback time, not wall-clock time: only
//! forward time-update deltas observed while playing, and no larger than
//! `max_continuous_step`, are accumulated. Seeks move the baseline without
//! counting. Every `cadence` seconds of accumulated playback one checkpoint
//! is handed to a background writer through a `watch` channel, so a slow
//! progress service only ever sees the latest position. Write failures are
//! logged and dropped; the next checkpoint carries a fresh position.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

use super::traits::ProgressStore;
use crate::config::CheckpointConfig;
use crate::models::Checkpoint;

const CADENCE_EPSILON: f64 = 1e-6;

pub struct PositionCheckpointer {
    lesson_id: String,
    cadence: f64,
    max_step: f64,
    flush_on_teardown: bool,
    /// Playback seconds since the last checkpoint
    accumulated: f64,
    /// Playback seconds over the whole session
    played: f64,
    baseline: Option<f64>,
    latest: Option<(f64, f64)>,
    last_emitted: Option<f64>,
    tx: Option<watch::Sender<Option<Checkpoint>>>,
    worker: Option<JoinHandle<()>>,
}

impl PositionCheckpointer {
    /// Start the background writer for one lesson
    pub fn spawn(
        lesson_id: impl Into<String>,
        config: &CheckpointConfig,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let worker = tokio::spawn(Self::write_loop(rx, store).in_current_span());

        Self {
            lesson_id: lesson_id.into(),
            cadence: config.cadence,
            max_step: config.max_continuous_step,
            flush_on_teardown: config.flush_on_teardown,
            accumulated: 0.0,
            played: 0.0,
            baseline: Some(0.0),
            latest: None,
            last_emitted: None,
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    async fn write_loop(mut rx: watch::Receiver<Option<Checkpoint>>, store: Arc<dyn ProgressStore>) {
        while rx.changed().await.is_ok() {
            let checkpoint = rx.borrow_and_update().clone();
            let Some(checkpoint) = checkpoint else {
                continue;
            };
            match store.save(&checkpoint).await {
                Ok(()) => debug!(
                    "Saved position {:.2}/{:.2} for lesson {}",
                    checkpoint.position, checkpoint.duration, checkpoint.lesson_id
                ),
                Err(e) => warn!(
                    "Dropping checkpoint for lesson {} at {:.2}: {}",
                    checkpoint.lesson_id, checkpoint.position, e
                ),
            }
        }
    }

    /// Seconds of playback counted towards the next checkpoint
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Seconds of playback observed this session
    pub fn played(&self) -> f64 {
        self.played
    }

    /// Feed a time update
    pub fn observe(&mut self, time: f64, duration: f64, playing: bool) {
        if playing
            && let Some(baseline) = self.baseline
        {
            let delta = time - baseline;
            if delta > 0.0 && delta <= self.max_step {
                self.accumulated += delta;
                self.played += delta;
            }
        }
        self.baseline = Some(time);

        if duration <= 0.0 {
            return;
        }
        self.latest = Some((time, duration));

        if self.accumulated + CADENCE_EPSILON >= self.cadence {
            self.emit(time, duration);
            // Keep the remainder so checkpoints stay on the cadence grid.
            self.accumulated = (self.accumulated - self.cadence).max(0.0);
        }
    }

    /// Move to a new position without counting the jump as playback
    pub fn rebase(&mut self, position: f64, duration: f64) {
        self.baseline = Some(position);
        if duration > 0.0 {
            self.latest = Some((position, duration));
        }
    }

    fn emit(&mut self, position: f64, duration: f64) {
        let Some(tx) = &self.tx else {
            return;
        };
        let checkpoint = Checkpoint {
            lesson_id: self.lesson_id.clone(),
            position,
            duration,
            captured_at_media_time: self.played,
        };
        debug!(
            "Checkpoint for lesson {} at {:.2} after {:.2}s of playback",
            self.lesson_id, position, self.played
        );
        tx.send_replace(Some(checkpoint));
        self.last_emitted = Some(position);
    }

    /// Flush the final position if it moved, then wait for the writer
    pub async fn shutdown(&mut self) {
        if self.flush_on_teardown
            && let Some((position, duration)) = self.latest
            && self.last_emitted != Some(position)
        {
            self.emit(position, duration);
        }

        self.tx = None;
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("Checkpoint writer for lesson {} failed: {}", self.lesson_id, e);
            } else {
                info!("Checkpoint writer for lesson {} stopped", self.lesson_id);
            }
        }
    }
}

impl Drop for PositionCheckpointer {
    fn drop(&mut self) {
        // Dropping the sender lets the writer finish whatever is queued.
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryProgressStore;
    use crate::services::traits::MockProgressStore;
    use tracing_test::traced_test;

    fn config() -> CheckpointConfig {
        CheckpointConfig::default()
    }

    fn play(checkpointer: &mut PositionCheckpointer, from: f64, to: f64, step: f64, duration: f64) {
        let mut t = from;
        while t + step <= to + 1e-9 {
            t += step;
            checkpointer.observe(t, duration, true);
        }
    }

    #[tokio::test]
    async fn test_first_checkpoint_after_ten_seconds_of_playback() {
        let store = Arc::new(InMemoryProgressStore::new());
        let mut cfg = config();
        cfg.flush_on_teardown = false;
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &cfg, store.clone());

        play(&mut checkpointer, 0.0, 9.75, 0.25, 600.0);
        assert_eq!(checkpointer.last_emitted, None);
        play(&mut checkpointer, 9.75, 10.0, 0.25, 600.0);
        checkpointer.shutdown().await;

        let writes = store.writes().await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].position, 10.0);
        assert_eq!(writes[0].duration, 600.0);
        assert_eq!(writes[0].captured_at_media_time, 10.0);
    }

    #[tokio::test]
    async fn test_seeks_and_pauses_do_not_count() {
        let store = Arc::new(InMemoryProgressStore::new());
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &config(), store.clone());

        play(&mut checkpointer, 0.0, 5.0, 0.25, 600.0);
        checkpointer.rebase(300.0, 600.0);
        checkpointer.observe(300.0, 600.0, true);
        // A large jump without a seek is not continuous playback.
        checkpointer.observe(400.0, 600.0, true);
        checkpointer.observe(401.0, 600.0, false);
        assert!((checkpointer.accumulated() - 5.0).abs() < 1e-9);

        checkpointer.rebase(401.0, 600.0);
        play(&mut checkpointer, 401.0, 406.0, 0.25, 600.0);
        assert_eq!(checkpointer.accumulated(), 0.0);
        assert_eq!(checkpointer.last_emitted, Some(406.0));
    }

    #[tokio::test]
    async fn test_uneven_steps_stay_on_cadence_grid() {
        let store = Arc::new(InMemoryProgressStore::new());
        let mut cfg = config();
        cfg.flush_on_teardown = false;
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &cfg, store.clone());

        let mut emitted = Vec::new();
        for k in 1..=45 {
            checkpointer.observe(0.7 * k as f64, 600.0, true);
            if checkpointer.last_emitted != emitted.last().copied() {
                emitted.extend(checkpointer.last_emitted);
            }
        }
        checkpointer.shutdown().await;

        let expected = [10.5, 20.3, 30.1];
        assert_eq!(emitted.len(), expected.len(), "emitted {emitted:?}");
        for (got, want) in emitted.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "emitted {emitted:?}");
        }
    }

    #[tokio::test]
    async fn test_unknown_duration_skips_checkpoints() {
        let store = Arc::new(InMemoryProgressStore::new());
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &config(), store.clone());

        play(&mut checkpointer, 0.0, 30.0, 0.25, 0.0);
        checkpointer.shutdown().await;

        assert!(store.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_flushes_only_when_moved() {
        let store = Arc::new(InMemoryProgressStore::new());
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &config(), store.clone());

        play(&mut checkpointer, 0.0, 10.0, 0.25, 600.0);
        checkpointer.shutdown().await;
        assert_eq!(store.writes().await.len(), 1);

        let store = Arc::new(InMemoryProgressStore::new());
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &config(), store.clone());
        play(&mut checkpointer, 0.0, 12.5, 0.25, 600.0);
        checkpointer.shutdown().await;

        let positions: Vec<f64> = store.writes().await.iter().map(|c| c.position).collect();
        assert_eq!(positions.last(), Some(&12.5));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_write_failures_are_logged_and_dropped() {
        let mut store = MockProgressStore::new();
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(crate::errors::ServiceError::status("progress", 500, "boom")));

        let mut cfg = config();
        cfg.flush_on_teardown = false;
        let mut checkpointer = PositionCheckpointer::spawn("lesson-1", &cfg, Arc::new(store));
        play(&mut checkpointer, 0.0, 10.0, 0.25, 600.0);
        checkpointer.shutdown().await;

        assert!(logs_contain("Dropping checkpoint for lesson lesson-1"));
    }
}

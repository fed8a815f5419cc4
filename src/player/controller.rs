//! Player controller: one lesson, one backend, one writer
//!
//! The controller owns the [`PlaybackSession`], the adapter, the checkpoint
//! and activity writers and the controls timer. Control commands, backend
//! events, platform-operation outcomes and timer expiries are all handled on
//! the controller, one at a time, so the session only ever has one writer.
//! Platform operations (`play()`, fullscreen) are kept in a
//! `FuturesUnordered` and their outcomes are folded in when they settle.
//!
//! Teardown happens in [`PlayerController::shutdown`], which `run` calls on
//! every exit path; dropping the controller releases the same resources
//! without the final checkpoint flush.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use super::control::ControlCommand;
use super::controls_timer::AutoHideTimer;
use super::handle::{PlayerCommand, PlayerHandle};
use super::session::{PlaybackSession, SessionEvent};
use crate::adapters::{
    AdapterEvent, AdapterOptions, EventSubscription, Fidelity, PlatformHost, PlatformOp,
    SourceAdapter, build_adapter, subscription,
};
use crate::config::Config;
use crate::errors::{PlatformError, PlatformResult, PlayerError, PlayerResult};
use crate::models::{
    Activity, MediaReference, PlaybackState, PlayerSettings, ResolvedSource, SavedPosition,
    SessionContext,
};
use crate::services::{ActivityRecorder, BookmarkStore, PositionCheckpointer, ServiceSet};
use crate::sources::SourceResolver;

/// What to play, for whom, with which preferences
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub student_id: String,
    pub lesson_id: String,
    pub reference: MediaReference,
    pub settings: PlayerSettings,
}

/// Settled platform operation
#[derive(Debug)]
pub(crate) enum OpOutcome {
    Play(PlatformResult<()>),
    Fullscreen {
        entering: bool,
        result: PlatformResult<()>,
    },
}

pub struct PlayerController {
    pub(crate) context: SessionContext,
    source: ResolvedSource,
    pub(crate) settings: PlayerSettings,
    settings_tx: Arc<watch::Sender<PlayerSettings>>,
    pub(crate) session: PlaybackSession,
    pub(crate) adapter: Box<dyn SourceAdapter>,
    pub(crate) fidelity: Fidelity,
    events: EventSubscription,
    pub(crate) pending: FuturesUnordered<BoxFuture<'static, OpOutcome>>,
    /// Transport commands waiting for an in-flight seek
    pub(crate) deferred: VecDeque<ControlCommand>,
    pub(crate) checkpointer: PositionCheckpointer,
    pub(crate) recorder: ActivityRecorder,
    pub(crate) bookmarks: Arc<dyn BookmarkStore>,
    saved: Option<SavedPosition>,
    autoplay_pending: bool,
    pub(crate) play_when_ready: bool,
    pub(crate) controls: AutoHideTimer,
    controls_idle: mpsc::UnboundedReceiver<u64>,
    shut_down: bool,
}

impl PlayerController {
    /// Resolve the source, fetch the saved position, build the backend and
    /// start loading. A failing progress service only costs the resume.
    pub async fn open(
        request: OpenRequest,
        host: &mut dyn PlatformHost,
        services: ServiceSet,
        config: &Config,
    ) -> PlayerResult<Self> {
        let context = SessionContext::new(request.student_id, request.lesson_id);
        let source = SourceResolver::resolve_reference(&request.reference);
        let settings = request.settings;
        info!(
            "Opening lesson {} for student {} ({} source, session {})",
            context.lesson_id, context.student_id, source.provider, context.session_id
        );

        let saved = if settings.resume_position {
            match services.progress.load(&context.lesson_id).await {
                Ok(saved) => saved,
                Err(e) => {
                    warn!(
                        "Could not fetch saved position for lesson {}: {}",
                        context.lesson_id, e
                    );
                    None
                }
            }
        } else {
            None
        };

        // Embedded frames resume through the `start` URL parameter.
        let start_at = saved
            .filter(|s| source.is_embedded() && s.resumable_within(s.duration))
            .map(|s| s.position);

        let (sink, events) = subscription();
        let adapter = build_adapter(
            &source,
            host,
            AdapterOptions {
                subtitles: request.reference.subtitles.clone(),
                autoplay: settings.autoplay,
                start_at,
                embed: config.embed.clone(),
            },
            sink,
        );
        let fidelity = adapter.fidelity();

        let initial = PlaybackState {
            current_time: start_at.unwrap_or(0.0),
            volume: settings.initial_volume(),
            playback_rate: settings.initial_rate(),
            quality: settings.quality.clone(),
            ..PlaybackState::default()
        };

        let mut checkpointer = PositionCheckpointer::spawn(
            context.lesson_id.clone(),
            &config.checkpoint,
            services.progress.clone(),
        );
        if let Some(start) = start_at {
            checkpointer.rebase(start, 0.0);
        }
        let recorder = ActivityRecorder::spawn(context.clone(), services.activity.clone());
        let (controls, controls_idle) = AutoHideTimer::new(config.controls.auto_hide);
        let settings_tx = Arc::new(watch::Sender::new(settings.clone()));

        let mut controller = Self {
            context,
            source,
            autoplay_pending: settings.autoplay,
            settings,
            settings_tx,
            session: PlaybackSession::new(initial),
            adapter,
            fidelity,
            events,
            pending: FuturesUnordered::new(),
            deferred: VecDeque::new(),
            checkpointer,
            recorder,
            bookmarks: services.bookmarks,
            saved: if start_at.is_some() { None } else { saved },
            play_when_ready: false,
            controls,
            controls_idle,
            shut_down: false,
        };

        controller.session.begin_load();
        controller.adapter.load();
        controller.apply_initial_settings();
        Ok(controller)
    }

    fn apply_initial_settings(&mut self) {
        let state = self.session.state();
        let (volume, rate) = (state.volume, state.playback_rate);
        self.adapter.set_volume(volume);
        self.adapter.set_muted(false);
        self.adapter.set_playback_rate(rate);
        if self.settings.quality != crate::config::defaults::DEFAULT_QUALITY {
            self.adapter.set_quality(&self.settings.quality);
        }
    }

    pub fn state(&self) -> &PlaybackState {
        self.session.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.session.subscribe()
    }

    pub fn source(&self) -> &ResolvedSource {
        &self.source
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn fidelity(&self) -> Fidelity {
        self.fidelity
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Replace the preferences the input router and later loads read
    pub fn update_settings(&mut self, settings: PlayerSettings) {
        self.settings = settings.clone();
        self.settings_tx.send_replace(settings);
    }

    pub(crate) fn ensure_open(&self) -> PlayerResult<()> {
        if self.shut_down {
            Err(PlayerError::ShutDown)
        } else {
            Ok(())
        }
    }

    pub(crate) fn track_play(&mut self, op: PlatformOp) {
        self.pending
            .push(async move { OpOutcome::Play(op.await) }.boxed());
    }

    pub(crate) fn track_fullscreen(&mut self, entering: bool, op: PlatformOp) {
        self.pending.push(
            async move {
                OpOutcome::Fullscreen {
                    entering,
                    result: op.await,
                }
            }
            .boxed(),
        );
    }

    fn handle_adapter_event(&mut self, event: AdapterEvent) {
        trace!("Adapter event: {:?}", event);
        let Some(outcome) = self.session.apply(event) else {
            return;
        };

        match outcome {
            SessionEvent::Loaded { duration } => self.on_loaded(duration),
            SessionEvent::TimeChanged {
                time,
                duration,
                playing,
            } => self.checkpointer.observe(time, duration, playing),
            SessionEvent::SeekSettled { time } => {
                let duration = self.session.state().duration;
                self.checkpointer.rebase(time, duration);
                self.replay_deferred();
            }
            SessionEvent::Ended { duration } => {
                info!("Lesson {} finished", self.context.lesson_id);
                self.recorder.record(Activity::Complete { duration });
                self.controls.cancel();
                self.session.set_controls_visible(true);
            }
            SessionEvent::Failed { message } => {
                error!(
                    "Media error in lesson {}: {}",
                    self.context.lesson_id, message
                );
                self.play_when_ready = false;
                self.deferred.clear();
                self.controls.cancel();
                self.session.set_controls_visible(true);
            }
        }
    }

    fn on_loaded(&mut self, duration: f64) {
        info!(
            "Lesson {} loaded (duration {:.1}s)",
            self.context.lesson_id, duration
        );

        if let Some(saved) = self.saved.take()
            && saved.resumable_within(duration)
        {
            let target = self
                .session
                .request_seek(saved.position, self.fidelity.observes_playback);
            self.adapter.seek(target);
            self.checkpointer.rebase(target, duration);
            info!("Resuming lesson {} at {:.1}s", self.context.lesson_id, target);
        }

        if let Some(language) = self.settings.preferred_subtitle().map(str::to_string)
            && self.adapter.subtitle_languages().contains(&language)
            && let Err(e) = self.dispatch(ControlCommand::SetSubtitles(Some(language)))
        {
            debug!("Preferred subtitles not applied: {}", e);
        }

        let autoplay = std::mem::take(&mut self.autoplay_pending);
        if std::mem::take(&mut self.play_when_ready) || autoplay {
            if let Err(e) = self.dispatch(ControlCommand::Play) {
                debug!("Play after load not issued: {}", e);
            }
        }
    }

    fn replay_deferred(&mut self) {
        while !self.session.state().is_seeking {
            let Some(command) = self.deferred.pop_front() else {
                break;
            };
            debug!("Replaying {:?} after seek", command);
            if let Err(e) = self.dispatch(command) {
                debug!("Deferred command failed: {}", e);
            }
        }
    }

    fn handle_op_outcome(&mut self, outcome: OpOutcome) {
        match outcome {
            OpOutcome::Play(Ok(())) => self.session.play_confirmed(),
            OpOutcome::Play(Err(PlatformError::Interrupted)) => {
                debug!("Play request superseded by pause");
            }
            OpOutcome::Play(Err(PlatformError::Detached)) => {
                debug!("Play request dropped: backend detached");
            }
            OpOutcome::Play(Err(e)) => {
                warn!("Play request rejected: {}", e);
                self.session.play_rejected();
                self.controls.cancel();
                self.session.set_controls_visible(true);
            }
            OpOutcome::Fullscreen { entering, result } => {
                if let Err(e) = result {
                    warn!(
                        "Fullscreen {} rejected: {}",
                        if entering { "request" } else { "exit" },
                        e
                    );
                    if self.session.state().is_fullscreen == entering {
                        self.session.set_fullscreen(!entering);
                    }
                }
            }
        }
    }

    fn on_controls_idle(&mut self, generation: u64) {
        if self.controls.is_current(generation) && self.session.state().is_playing {
            trace!("Hiding controls after inactivity");
            self.session.set_controls_visible(false);
        }
    }

    fn next_settled_op(&mut self) -> Option<OpOutcome> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.next().now_or_never().flatten()
    }

    /// Process everything that is already queued without waiting. Returns
    /// the number of items handled.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            if let Some(event) = self.events.try_recv() {
                self.handle_adapter_event(event);
            } else if let Some(outcome) = self.next_settled_op() {
                self.handle_op_outcome(outcome);
            } else if let Ok(generation) = self.controls_idle.try_recv() {
                self.on_controls_idle(generation);
            } else {
                break;
            }
            handled += 1;
        }
        handled
    }

    /// Let background tasks run and drain until nothing new arrives
    pub async fn settle(&mut self) {
        loop {
            tokio::task::yield_now().await;
            if self.drain_events() == 0 {
                break;
            }
        }
    }

    /// Spawn the controller onto the runtime and return a handle to it
    pub fn spawn(self) -> (PlayerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PlayerHandle::new(tx, self.subscribe(), self.settings_tx.clone());
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    /// Serve commands until shutdown or until every handle is gone
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PlayerCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => self.execute(command).await,
                },
                Some(event) = self.events.recv() => self.handle_adapter_event(event),
                Some(outcome) = self.pending.next(), if !self.pending.is_empty() => {
                    self.handle_op_outcome(outcome);
                }
                Some(generation) = self.controls_idle.recv() => self.on_controls_idle(generation),
            }
        }
        self.shutdown().await;
    }

    async fn execute(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Control(command) => {
                if let Err(e) = self.dispatch(command) {
                    warn!("Control command failed: {}", e);
                }
            }
            PlayerCommand::Key(input) => {
                self.handle_key(&input);
            }
            PlayerCommand::Pointer(intent) => {
                if let Err(e) = self.handle_pointer(intent) {
                    warn!("Pointer intent failed: {}", e);
                }
            }
            PlayerCommand::Bookmark(reply) => {
                let result = self.bookmark().await;
                let _ = reply.send(result);
            }
            PlayerCommand::UpdateSettings(settings) => self.update_settings(settings),
            PlayerCommand::Shutdown => {}
        }
    }

    /// Tear everything down: controls timer, backend subscription, pending
    /// operations, then a final checkpoint and the queued activity events.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.drain_events();
        self.shut_down = true;

        self.controls.cancel();
        self.deferred.clear();
        self.adapter.detach();
        self.events.close();
        self.pending.clear();

        self.checkpointer.shutdown().await;
        self.recorder.shutdown().await;
        info!(
            "Closed lesson {} (session {})",
            self.context.lesson_id, self.context.session_id
        );
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        if !self.shut_down {
            self.controls.cancel();
            self.adapter.detach();
            self.events.close();
        }
    }
}

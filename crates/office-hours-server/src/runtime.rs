//! Production event loop.
//!
//! A single [`Runtime`] owns the [`OfficeHours`] state machine. Events from the
//! platform gateway, finished moves and fired timers all arrive on one channel
//! and are processed in order; nothing else touches the state. Actions run
//! against the [`Platform`], the [`StaffStore`] and the timer registry.
//!
//! Quick platform calls (renames, nickname markers, messages) are awaited in
//! order before the next event. Moves and audio playback are spawned: a move
//! reports back with `Event::MoveFinished`, and playback holds the audio lock
//! so only one clip plays at a time.

use std::{future::Future, sync::Arc};

use office_hours_core::{
    Action, Environment, Event, LogLevel, OfficeHours, Recipient, RecoverySnapshot, StaffMember,
    TimerKey,
};
use tokio::sync::{Mutex, mpsc};

use crate::{
    config::RuntimeConfig,
    error::ServerError,
    notice::render_notice,
    platform::{Platform, PlatformError},
    store::StaffStore,
    tasks::TaskRegistry,
};

#[derive(Debug)]
enum Input {
    Event(Event),
    TimerFired { key: TimerKey, generation: u64 },
}

/// Handle for feeding events into a [`Runtime`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Input>,
}

impl EventSender {
    /// Queue an event for processing.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Internal` if the runtime has stopped.
    pub fn send(&self, event: Event) -> Result<(), ServerError> {
        self.tx
            .send(Input::Event(event))
            .map_err(|_| ServerError::Internal("runtime stopped".to_string()))
    }
}

/// Office hours runtime.
pub struct Runtime<E: Environment, P: Platform, S: StaffStore> {
    hours: OfficeHours<E>,
    env: E,
    platform: P,
    store: S,
    config: RuntimeConfig,
    timers: TaskRegistry<TimerKey>,
    tx: mpsc::UnboundedSender<Input>,
    inbox: mpsc::UnboundedReceiver<Input>,
    audio: Arc<Mutex<()>>,
}

impl<E: Environment, P: Platform, S: StaffStore> std::fmt::Debug for Runtime<E, P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("hours", &self.hours)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl<E: Environment, P: Platform, S: StaffStore> Runtime<E, P, S> {
    /// Create a runtime with empty state. Call [`Runtime::recover`] before
    /// [`Runtime::run`] to pick up the roster and live membership.
    pub fn new(env: E, platform: P, store: S, config: RuntimeConfig) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        let hours = OfficeHours::new(env.clone(), config.office_hours.clone());
        Self {
            hours,
            env,
            platform,
            store,
            config,
            timers: TaskRegistry::new(),
            tx,
            inbox,
            audio: Arc::new(Mutex::new(())),
        }
    }

    /// Handle for feeding events in.
    pub fn sender(&self) -> EventSender {
        EventSender { tx: self.tx.clone() }
    }

    /// The state machine.
    pub fn hours(&self) -> &OfficeHours<E> {
        &self.hours
    }

    /// Rebuild state from stored staff records and the platform's current
    /// voice membership, then bring the platform in line with it.
    ///
    /// # Errors
    ///
    /// Fails if the records or the membership cannot be read.
    pub async fn recover(&mut self, roster: Vec<StaffMember>) -> Result<(), ServerError> {
        let records = self.store.list_staff()?;
        let membership = self.platform.membership().await?;
        tracing::info!(
            staff = roster.len(),
            records = records.len(),
            channels = membership.channels.len(),
            waiting = membership.waiting.len(),
            "recovering office hours"
        );

        let snapshot = RecoverySnapshot {
            roster,
            records,
            channels: membership.channels,
            waiting: membership.waiting,
        };
        let (hours, actions) =
            OfficeHours::recover(self.env.clone(), self.config.office_hours.clone(), snapshot);

        self.timers.shutdown().await;
        self.hours = hours;
        self.execute_all(actions).await;
        Ok(())
    }

    /// Process one event and execute the resulting actions.
    pub async fn process(&mut self, event: Event) {
        tracing::debug!(?event, "processing event");
        match self.hours.process_event(event) {
            Ok(actions) => self.execute_all(actions).await,
            Err(e) => tracing::warn!("event rejected: {e}"),
        }
    }

    /// Run until `shutdown` resolves, then cancel all timers.
    pub async fn run(mut self, shutdown: impl Future<Output = ()> + Send) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => self.process(Event::Tick).await,
                Some(input) = self.inbox.recv() => match input {
                    Input::Event(event) => self.process(event).await,
                    Input::TimerFired { key, generation } => {
                        if self.timers.complete(&key, generation) {
                            self.process(Event::TimerFired(key)).await;
                        } else {
                            tracing::debug!(%key, "dropping superseded timer");
                        }
                    },
                },
            }
        }

        tracing::info!(timers = self.timers.len(), "runtime stopping");
        self.timers.shutdown().await;
    }

    async fn execute_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: Action) {
        match action {
            Action::MoveStudent { student, staff, channel } => {
                let platform = self.platform.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let moved = match platform.move_student(student, &channel).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(%student, %staff, "move failed: {e}");
                            false
                        },
                    };
                    let _ = tx.send(Input::Event(Event::MoveFinished { student, staff, moved }));
                });
            },

            Action::DisconnectStudent { student } => {
                report("disconnect", self.platform.disconnect(Recipient::Student(student))).await;
            },

            Action::DisconnectStaff { staff } => {
                report("disconnect", self.platform.disconnect(Recipient::Staff(staff))).await;
            },

            Action::SetQueuePosition { student, position } => {
                report("set queue position", self.platform.set_queue_position(student, position))
                    .await;
            },

            Action::EnsureChannel { staff, name } => {
                report("ensure channel", self.platform.ensure_channel(staff, &name)).await;
            },

            Action::RenameChannel { staff, name } => {
                report("rename channel", self.platform.rename_channel(staff, &name)).await;
            },

            Action::DeleteChannel { staff, farewell: None } => {
                report("delete channel", self.platform.delete_channel(staff)).await;
            },

            Action::DeleteChannel { staff, farewell: Some(clip) } => {
                let platform = self.platform.clone();
                let audio = Arc::clone(&self.audio);
                tokio::spawn(async move {
                    {
                        let _playing = audio.lock().await;
                        report("play audio", platform.play_audio(staff, &clip.asset_path())).await;
                    }
                    report("delete channel", platform.delete_channel(staff)).await;
                });
            },

            Action::PlayAudio { staff, clip } => {
                let platform = self.platform.clone();
                let audio = Arc::clone(&self.audio);
                tokio::spawn(async move {
                    let _playing = audio.lock().await;
                    report("play audio", platform.play_audio(staff, &clip.asset_path())).await;
                });
            },

            Action::Notify(notice) => {
                let text = render_notice(&notice);
                report("send message", self.platform.send_message(notice.recipient(), &text)).await;
            },

            Action::MarkOnBreak { staff, on_break } => {
                report("mark on break", self.platform.mark_on_break(staff, on_break)).await;
            },

            Action::ScheduleTimer { key, at } => {
                let delay = at.saturating_duration_since(self.env.now());
                let env = self.env.clone();
                let tx = self.tx.clone();
                self.timers.schedule(key, move |generation| async move {
                    env.sleep(delay).await;
                    let _ = tx.send(Input::TimerFired { key, generation });
                });
                tracing::trace!(%key, ?delay, "timer scheduled");
            },

            Action::CancelTimer { key } => {
                if self.timers.cancel(&key) {
                    tracing::trace!(%key, "timer cancelled");
                }
            },

            Action::PersistStaff(record) => {
                if let Err(e) = self.store.store_staff(&record) {
                    tracing::warn!(staff = %record.id, "failed to persist staff record: {e}");
                }
            },

            Action::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
            },
        }
    }
}

async fn report(operation: &'static str, call: impl Future<Output = Result<(), PlatformError>>) {
    if let Err(e) = call.await {
        tracing::warn!(operation, "platform call failed: {e}");
    }
}

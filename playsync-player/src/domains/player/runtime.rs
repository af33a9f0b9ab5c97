//! Session event loop and its command handle.
//!
//! The loop owns the [`SessionController`] and multiplexes UI commands,
//! engine property changes, the progress timer and the auto-play countdown.

use std::time::Duration;

use playsync_model::{ContentItem, ItemId, MediaSourceId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use super::controller::SessionController;
use super::messages::SessionCommand;
use super::state::PlaybackSnapshot;
use super::update::update_session;
use crate::error::{PlayerError, Result};
use crate::infra::engine::{PropertyEvent, PropertySubscription};

const COMMAND_BUFFER: usize = 64;
const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable sender side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlayerError::Cancelled)
    }

    pub async fn play_track(
        &self,
        item: ContentItem,
        media_source_id: Option<MediaSourceId>,
    ) -> Result<()> {
        self.send(SessionCommand::PlayTrack {
            item,
            media_source_id,
        })
        .await
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(SessionCommand::TogglePlayPause).await
    }

    pub async fn clear_current_track(&self) -> Result<()> {
        self.send(SessionCommand::ClearCurrentTrack).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }
}

/// Run the session on a background task.
pub fn spawn_session(
    controller: SessionController,
) -> (SessionHandle, JoinHandle<()>) {
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let handle = SessionHandle {
        commands,
        snapshots: controller.subscribe(),
    };
    let task = tokio::spawn(run_session(controller, receiver));
    (handle, task)
}

/// Drive the session until `Shutdown` arrives or every handle is dropped.
pub async fn run_session(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<SessionCommand>,
) {
    let mut timers = SessionTimers::default();

    loop {
        timers.sync(&controller);

        tokio::select! {
            command = commands.recv() => match command {
                None | Some(SessionCommand::Shutdown) => break,
                Some(command) => {
                    let _ = update_session(&mut controller, command).await;
                }
            },
            event = next_event(controller.subscription_mut()) => match event {
                Some(event) => controller.handle_property_event(event).await,
                None => {
                    log::warn!("[Session] Engine property stream closed");
                    if let Some(mut subscription) =
                        controller.subscription_mut().take()
                    {
                        subscription.unsubscribe();
                    }
                }
            },
            _ = tick(&mut timers.progress) => {
                let _ = controller.progress_tick();
            }
            _ = tick(&mut timers.countdown) => {
                if let Err(err) = controller.countdown_tick().await {
                    log::warn!("[Session] Auto-play failed: {err}");
                }
            }
        }
    }

    let final_stop = controller.clear_current_track().await;
    if tokio::time::timeout(SHUTDOWN_FLUSH_TIMEOUT, async {
        let _ = final_stop.outcome().await;
        controller.reporter().settle().await;
    })
    .await
    .is_err()
    {
        log::warn!("[Session] Gave up waiting for pending reports");
    }
    controller.shutdown().await;
}

async fn next_event(
    subscription: &mut Option<PropertySubscription>,
) -> Option<PropertyEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Timers derived from session state before every loop iteration.
#[derive(Debug, Default)]
struct SessionTimers {
    progress: Option<Interval>,
    progress_item: Option<ItemId>,
    countdown: Option<Interval>,
}

impl SessionTimers {
    fn sync(&mut self, controller: &SessionController) {
        let active_item = if controller.progress_timer_active() {
            controller.session().current_item_id().cloned()
        } else {
            None
        };
        if active_item != self.progress_item {
            let period = controller.options().progress_interval;
            self.progress = active_item.as_ref().map(|_| delayed_interval(period));
            self.progress_item = active_item;
        }

        match (controller.autoplay().is_visible(), self.countdown.is_some()) {
            (true, false) => {
                self.countdown = Some(delayed_interval(COUNTDOWN_PERIOD))
            }
            (false, true) => self.countdown = None,
            _ => {}
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use super::state::{BreathingSession, LoadCompletion};
use super::writer::PersistWriter;
use super::{SessionOptions, SessionSnapshot};
use crate::audio::{AudioLoader, AudioTrack};
use crate::catalog::Catalog;
use crate::error::SessionError;
use crate::events::Event;
use crate::storage::ProgressStore;

enum Op {
    Activate,
    Deactivate,
    Start {
        technique_id: Option<String>,
        minutes: Option<u32>,
    },
    ContinueSession,
    StartOver,
    Pause,
    Resume,
    Reset,
    ChangeTechnique(String),
    ChangeDuration(u32),
    SelectAudio(Option<AudioTrack>),
    SetMuted(bool),
    SetVolume(f32),
    ToggleMusicPause,
}

struct Command {
    op: Op,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

/// Cloneable front end to a running session driver.
///
/// The driver stops once every handle has been dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<Event>,
    writer: PersistWriter,
}

/// Start a session driver on the current tokio runtime.
pub fn spawn(
    catalog: Arc<Catalog>,
    store: Arc<dyn ProgressStore>,
    loader: Arc<dyn AudioLoader>,
    options: SessionOptions,
) -> (SessionHandle, JoinHandle<()>) {
    let (writer, writer_task) = PersistWriter::spawn(Arc::clone(&store));
    let (load_tx, load_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(32);

    let session = BreathingSession::new(catalog, store, loader, &options, writer.clone(), load_tx);
    let handle = SessionHandle {
        commands: command_tx,
        snapshots: session.subscribe(),
        events: session.event_sender(),
        writer,
    };

    let task = tokio::spawn(async move {
        run(session, command_rx, load_rx, options.tick_period).await;
        // Every sender is gone once the session is dropped; the writer drains
        // what is left and exits.
        let _ = writer_task.await;
    });
    (handle, task)
}

async fn run(
    mut session: BreathingSession,
    mut commands: mpsc::Receiver<Command>,
    mut loads: mpsc::UnboundedReceiver<LoadCompletion>,
    period: Duration,
) {
    let mut ticker: Option<Interval> = None;

    loop {
        sync_ticker(&mut ticker, session.is_running(), period);

        tokio::select! {
            _ = next_tick(&mut ticker) => session.tick(),
            command = commands.recv() => {
                let Some(Command { op, reply }) = command else {
                    break;
                };
                let result = apply(&mut session, op).await;
                let _ = reply.send(result);
            }
            Some(completion) = loads.recv() => session.finish_load(completion),
        }
    }

    debug!("all session handles dropped; shutting down driver");
    session.deactivate();
}

async fn apply(session: &mut BreathingSession, op: Op) -> Result<(), SessionError> {
    match op {
        Op::Activate => session.activate().await,
        Op::Deactivate => session.deactivate(),
        Op::Start {
            technique_id,
            minutes,
        } => session.start(technique_id.as_deref(), minutes)?,
        Op::ContinueSession => session.continue_session()?,
        Op::StartOver => session.start_over()?,
        Op::Pause => session.pause(),
        Op::Resume => session.resume(),
        Op::Reset => session.reset(),
        Op::ChangeTechnique(id) => session.change_technique(&id)?,
        Op::ChangeDuration(minutes) => session.change_duration(minutes)?,
        Op::SelectAudio(track) => session.select_audio(track),
        Op::SetMuted(muted) => session.set_muted(muted),
        Op::SetVolume(level) => session.set_volume(level),
        Op::ToggleMusicPause => session.toggle_music_pause(),
    }
    Ok(())
}

/// The ticker exists only while the clock runs. A fresh interval starts a
/// full period after (re)starting, so pausing never shortens a second.
fn sync_ticker(ticker: &mut Option<Interval>, running: bool, period: Duration) {
    match (running, ticker.is_some()) {
        (true, false) => {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            *ticker = Some(interval);
        }
        (false, true) => *ticker = None,
        _ => {}
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl SessionHandle {
    async fn send(&self, op: Op) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { op, reply })
            .await
            .map_err(|_| SessionError::DriverClosed)?;
        response.await.map_err(|_| SessionError::DriverClosed)?
    }

    /// Load stored progress and compute the resume offer.
    pub async fn activate(&self) -> Result<(), SessionError> {
        self.send(Op::Activate).await
    }

    pub async fn deactivate(&self) -> Result<(), SessionError> {
        self.send(Op::Deactivate).await
    }

    /// Start fresh. `None` keeps the current technique or duration.
    pub async fn start(
        &self,
        technique_id: Option<&str>,
        minutes: Option<u32>,
    ) -> Result<(), SessionError> {
        self.send(Op::Start {
            technique_id: technique_id.map(str::to_string),
            minutes,
        })
        .await
    }

    pub async fn continue_session(&self) -> Result<(), SessionError> {
        self.send(Op::ContinueSession).await
    }

    pub async fn start_over(&self) -> Result<(), SessionError> {
        self.send(Op::StartOver).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.send(Op::Pause).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.send(Op::Resume).await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(Op::Reset).await
    }

    pub async fn change_technique(&self, technique_id: &str) -> Result<(), SessionError> {
        self.send(Op::ChangeTechnique(technique_id.to_string())).await
    }

    pub async fn change_duration(&self, minutes: u32) -> Result<(), SessionError> {
        self.send(Op::ChangeDuration(minutes)).await
    }

    pub async fn select_audio(&self, track: Option<AudioTrack>) -> Result<(), SessionError> {
        self.send(Op::SelectAudio(track)).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), SessionError> {
        self.send(Op::SetMuted(muted)).await
    }

    pub async fn set_volume(&self, level: f32) -> Result<(), SessionError> {
        self.send(Op::SetVolume(level)).await
    }

    pub async fn toggle_music_pause(&self) -> Result<(), SessionError> {
        self.send(Op::ToggleMusicPause).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Resolve once every progress write issued so far has been attempted.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

//! Driver behavior under a paused tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use breathwork_core::audio::{AudioHandle, AudioLoader, AudioTrack};
use breathwork_core::{
    Catalog, Event, MemoryProgressStore, ProgressRecord, SessionError, SessionHandle,
    SessionOptions, SessionStatus,
};
use breathwork_core::error::AudioError;
use tokio::task::JoinHandle;
use tokio::time::sleep;

type Log = Arc<Mutex<Vec<String>>>;

struct LoggedHandle {
    id: String,
    log: Log,
}

impl AudioHandle for LoggedHandle {
    fn play(&mut self) -> Result<(), AudioError> {
        self.log.lock().unwrap().push(format!("{}:play", self.id));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.log.lock().unwrap().push(format!("{}:pause", self.id));
        Ok(())
    }

    fn set_volume(&mut self, _gain: f32) -> Result<(), AudioError> {
        Ok(())
    }

    fn unload(&mut self) {
        self.log.lock().unwrap().push(format!("{}:unload", self.id));
    }
}

/// Loader whose latency is the track's URI parsed as seconds.
struct SlowLoader {
    log: Log,
}

#[async_trait]
impl AudioLoader for SlowLoader {
    async fn load(&self, track: &AudioTrack) -> Result<Box<dyn AudioHandle>, AudioError> {
        let secs: u64 = track.uri.parse().unwrap_or(0);
        sleep(Duration::from_secs(secs)).await;
        Ok(Box::new(LoggedHandle {
            id: track.id.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

fn spawn_with(store: &MemoryProgressStore, log: &Log) -> (SessionHandle, JoinHandle<()>) {
    breathwork_core::session::spawn(
        Arc::new(Catalog::builtin()),
        Arc::new(store.clone()),
        Arc::new(SlowLoader {
            log: Arc::clone(log),
        }),
        SessionOptions::default(),
    )
}

fn spawn_default(store: &MemoryProgressStore) -> SessionHandle {
    spawn_with(store, &Log::default()).0
}

#[tokio::test(start_paused = true)]
async fn ticks_advance_the_published_clock() {
    let store = MemoryProgressStore::new();
    let session = spawn_default(&store);
    session.activate().await.unwrap();
    session.start(Some("box"), Some(1)).await.unwrap();

    sleep(Duration::from_millis(5_500)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.clock.status, SessionStatus::Running);
    assert_eq!(snapshot.clock.elapsed_secs, 5);
    assert_eq!(snapshot.clock.phase_index, 1);
    assert_eq!(snapshot.clock.phase_remaining, 3);
    assert_eq!(snapshot.clock.phase_label, "Hold");

    session.flush().await;
    assert_eq!(store.record().unwrap().last_session_elapsed_time, 5);
}

#[tokio::test(start_paused = true)]
async fn session_completes_exactly_once_at_boundary() {
    let store = MemoryProgressStore::new();
    let session = spawn_default(&store);
    let mut events = session.subscribe_events();
    session.activate().await.unwrap();
    session.start(Some("box"), Some(1)).await.unwrap();

    sleep(Duration::from_secs(60)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.clock.status, SessionStatus::Completed);
    assert_eq!(snapshot.clock.elapsed_secs, 48);
    assert_eq!(snapshot.clock.completed_cycles, 3);
    assert_eq!(snapshot.progress.total_sessions, 1);
    assert_eq!(snapshot.progress.streak, 1);

    let mut completions = 0;
    while let Ok(event) = events.try_recv() {
        if event.is_completion() {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);

    session.flush().await;
    let record = store.record().unwrap();
    assert_eq!(record.total_sessions, 1);
    assert_eq!(record.technique_sessions("box"), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_elapsed_time() {
    let store = MemoryProgressStore::new();
    let session = spawn_default(&store);
    session.start(None, None).await.unwrap();

    sleep(Duration::from_millis(3_500)).await;
    session.pause().await.unwrap();
    assert_eq!(session.snapshot().clock.elapsed_secs, 3);

    sleep(Duration::from_secs(10)).await;
    let paused = session.snapshot();
    assert_eq!(paused.clock.status, SessionStatus::Paused);
    assert_eq!(paused.clock.elapsed_secs, 3);

    session.resume().await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(session.snapshot().clock.elapsed_secs, 5);
}

#[tokio::test(start_paused = true)]
async fn interrupted_session_is_offered_and_continued() {
    let store = MemoryProgressStore::with_record(ProgressRecord {
        last_selected_technique: Some("478".into()),
        last_selected_duration: Some(1),
        last_session_elapsed_time: 30,
        ..Default::default()
    });
    let session = spawn_default(&store);
    session.activate().await.unwrap();

    let offer = session.snapshot().resume_offer.unwrap();
    assert_eq!(offer.technique_id, "478");
    assert_eq!(offer.position.phase_index, 2);
    assert_eq!(offer.position.phase_remaining, 8);

    session.continue_session().await.unwrap();
    sleep(Duration::from_millis(1_500)).await;
    let snapshot = session.snapshot();
    assert!(snapshot.resume_offer.is_none());
    assert_eq!(snapshot.clock.elapsed_secs, 31);
    assert_eq!(snapshot.clock.phase_remaining, 7);
}

#[tokio::test(start_paused = true)]
async fn rejected_commands_leave_the_timer_running() {
    let store = MemoryProgressStore::new();
    let session = spawn_default(&store);
    session.start(Some("box"), Some(2)).await.unwrap();

    let err = session.change_technique("478").await.unwrap_err();
    assert!(matches!(err, SessionError::SessionActive { .. }));
    assert_eq!(
        session.start(None, None).await,
        Err(SessionError::SessionActive {
            what: "session",
            status: "running".into(),
        })
    );

    sleep(Duration::from_millis(2_500)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.clock.technique_id, "box");
    assert_eq!(snapshot.clock.elapsed_secs, 2);
}

#[tokio::test(start_paused = true)]
async fn superseded_audio_load_never_plays() {
    let store = MemoryProgressStore::new();
    let log = Log::default();
    let (session, _task) = spawn_with(&store, &log);
    session.start(None, None).await.unwrap();

    // A takes 3s to load, B 1s; B is chosen last and must win.
    session
        .select_audio(Some(AudioTrack::new("a", "Track A", "3")))
        .await
        .unwrap();
    session
        .select_audio(Some(AudioTrack::new("b", "Track B", "1")))
        .await
        .unwrap();

    sleep(Duration::from_millis(4_500)).await;
    let audio = session.snapshot().audio;
    assert_eq!(audio.active_track_id.as_deref(), Some("b"));
    assert!(audio.playing);

    let entries = log.lock().unwrap().clone();
    assert!(entries.contains(&"b:play".to_string()));
    assert!(entries.contains(&"a:unload".to_string()));
    assert!(!entries.contains(&"a:play".to_string()));
}

#[tokio::test(start_paused = true)]
async fn reset_releases_audio_and_keeps_stored_position() {
    let store = MemoryProgressStore::new();
    let log = Log::default();
    let (session, _task) = spawn_with(&store, &log);
    session
        .select_audio(Some(AudioTrack::new("rain", "Rain", "0")))
        .await
        .unwrap();
    session.start(None, None).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    assert!(session.snapshot().audio.playing);

    session.reset().await.unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.clock.status, SessionStatus::Idle);
    assert!(snapshot.audio.active_track_id.is_none());
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("rain:unload"));

    session.flush().await;
    assert_eq!(store.record().unwrap().last_session_elapsed_time, 2);

    session.deactivate().await.unwrap();
    session.activate().await.unwrap();
    let offer = session.snapshot().resume_offer.unwrap();
    assert_eq!(offer.position.elapsed_secs, 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_driver() {
    let store = MemoryProgressStore::new();
    let (session, task) = spawn_with(&store, &Log::default());
    let mut events = session.subscribe_events();
    session.activate().await.unwrap();
    session.start(None, None).await.unwrap();
    sleep(Duration::from_millis(4_500)).await;

    drop(session);
    task.await.unwrap();

    // Shutdown deactivates without zeroing the stored position.
    assert_eq!(store.record().unwrap().last_session_elapsed_time, 4);
    let mut saw_start = false;
    while let Ok(event) = events.try_recv() {
        saw_start |= matches!(event, Event::SessionStarted { .. });
    }
    assert!(saw_start);
}

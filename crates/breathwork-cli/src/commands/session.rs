use std::sync::Arc;

use chrono::Local;
use clap::{Args, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use breathwork_core::progress::{completion_message, next_goal};
use breathwork_core::session::{self, SessionHandle};
use breathwork_core::timer::format_clock;
use breathwork_core::{AudioTrack, Config, Event, SessionOptions};

use super::{progress_store, runtime};
use crate::player;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in the foreground until it completes or Ctrl-C
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Technique id (defaults to session.default_technique)
    #[arg(long, short)]
    technique: Option<String>,
    /// Duration preset in minutes (defaults to session.default_duration)
    #[arg(long, short)]
    minutes: Option<u32>,
    /// Backing track URL or file path
    #[arg(long)]
    track: Option<String>,
    /// Start muted
    #[arg(long)]
    muted: bool,
    /// Ignore an interrupted session and start over
    #[arg(long)]
    fresh: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run(args) => runtime()?.block_on(run_session(args)),
    }
}

async fn run_session(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = Arc::new(config.validate()?);
    let store = progress_store(&config)?;

    let mut options = SessionOptions::from_config(&config);
    if args.muted {
        options.muted = true;
    }
    if let Some(uri) = &args.track {
        options.track = Some(AudioTrack::from_uri(uri.as_str()));
    }

    let (handle, task) = session::spawn(catalog, store, player::loader(&config), options);
    let mut events = handle.subscribe_events();
    handle.activate().await?;

    let explicit = args.technique.is_some() || args.minutes.is_some();
    match handle.snapshot().resume_offer {
        Some(offer) if !args.fresh && !explicit => {
            eprintln!(
                "continuing {} at {} of {}",
                offer.technique.name(),
                format_clock(offer.position.elapsed_secs),
                format_clock(offer.total_secs)
            );
            handle.continue_session().await?;
        }
        Some(_) if !explicit => handle.start_over().await?,
        _ => handle.start(args.technique.as_deref(), args.minutes).await?,
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    print_event(&handle, &event, args.json)?;
                    if event.is_completion() {
                        break Outcome::Completed;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break Outcome::Stopped,
            },
            _ = &mut ctrl_c => break Outcome::Interrupted,
        }
    };

    if let Outcome::Interrupted = outcome {
        handle.deactivate().await?;
        eprintln!("stopped; run again to continue where you left off");
    }
    handle.flush().await;

    if let Outcome::Completed = outcome {
        let progress = handle.snapshot().progress;
        if !args.json {
            println!();
            println!("{}", completion_message(progress.streak));
            println!(
                "streak: {}  total sessions: {}",
                progress.streak, progress.total_sessions
            );
            println!("{}", next_goal(progress.streak));
        }
    }

    drop(handle);
    task.await?;
    Ok(())
}

enum Outcome {
    Completed,
    Interrupted,
    Stopped,
}

fn print_event(
    handle: &SessionHandle,
    event: &Event,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let clock = handle.snapshot().clock;
    match event {
        Event::SessionStarted { at, .. } | Event::SessionRestored { at, .. } => {
            println!(
                "{} · {} min · started {}",
                clock.technique_name,
                clock.duration_minutes,
                at.with_timezone(&Local).format("%H:%M")
            );
            println!(
                "{:<12} {:>2}s   cycle {}/{}",
                clock.phase_label,
                clock.phase_remaining,
                clock.completed_cycles + 1,
                clock.target_cycles
            );
        }
        Event::PhaseAdvanced {
            label,
            duration_secs,
            completed_cycles,
            ..
        } => {
            println!(
                "{:<12} {:>2}s   cycle {}/{}   {} left",
                label,
                duration_secs,
                (completed_cycles + 1).min(clock.target_cycles),
                clock.target_cycles,
                format_clock(clock.total_secs.saturating_sub(clock.elapsed_secs))
            );
        }
        Event::SessionCompleted {
            completed_cycles, ..
        } => {
            println!("done · {completed_cycles} cycles");
        }
        Event::SessionPaused { .. } | Event::SessionResumed { .. } | Event::SessionReset { .. } => {}
    }
    Ok(())
}

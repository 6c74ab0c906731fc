use clap::Subcommand;
use serde::Serialize;

use breathwork_core::catalog::Phase;
use breathwork_core::timer::{format_clock, total_session_secs};
use breathwork_core::{Config, Difficulty, Technique};

#[derive(Subcommand)]
pub enum TechniqueAction {
    /// List available techniques
    List,
    /// Show one technique with its session lengths
    Show {
        /// Technique id (e.g. "box", "478")
        id: String,
    },
}

#[derive(Serialize)]
struct TechniqueSummary<'a> {
    id: &'a str,
    name: &'a str,
    difficulty: Difficulty,
    cycle_secs: u32,
    phases: &'a [Phase],
}

#[derive(Serialize)]
struct SessionLength {
    minutes: u32,
    cycles: u32,
    total_secs: u32,
    display: String,
}

#[derive(Serialize)]
struct TechniqueDetail<'a> {
    #[serde(flatten)]
    summary: TechniqueSummary<'a>,
    description: &'a str,
    benefits: &'a [String],
    sessions: Vec<SessionLength>,
}

fn summary(technique: &Technique) -> TechniqueSummary<'_> {
    TechniqueSummary {
        id: technique.id(),
        name: technique.name(),
        difficulty: technique.difficulty(),
        cycle_secs: technique.cycle_secs(),
        phases: technique.phases(),
    }
}

pub fn run(action: TechniqueAction) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Config::load()?.catalog()?;

    match action {
        TechniqueAction::List => {
            let list: Vec<_> = catalog.techniques().iter().map(|t| summary(t)).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        TechniqueAction::Show { id } => {
            let technique = catalog
                .technique(&id)
                .ok_or_else(|| format!("unknown technique: {id}"))?;
            let sessions = catalog
                .durations()
                .iter()
                .map(|d| {
                    let total_secs = total_session_secs(technique, *d);
                    SessionLength {
                        minutes: d.minutes,
                        cycles: d.cycles,
                        total_secs,
                        display: format_clock(total_secs),
                    }
                })
                .collect();
            let detail = TechniqueDetail {
                summary: summary(technique),
                description: technique.description(),
                benefits: technique.benefits(),
                sessions,
            };
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }
    Ok(())
}

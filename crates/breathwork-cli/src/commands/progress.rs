use clap::Subcommand;
use serde::Serialize;

use breathwork_core::progress::{achievements, next_goal, streak_message, Achievement};
use breathwork_core::timer::offer_from_record;
use breathwork_core::{Config, ProgressRecord, ProgressUpdate, ResumeOffer};

use super::{progress_store, runtime};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Print streak, totals, achievements and any resumable session
    Show,
    /// Zero every counter and forget the interrupted session
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct TechniqueShare {
    technique_id: String,
    sessions: u32,
    share_pct: f64,
}

#[derive(Serialize)]
struct ProgressReport {
    record: ProgressRecord,
    streak_message: &'static str,
    next_goal: &'static str,
    achievements: Vec<Achievement>,
    techniques: Vec<TechniqueShare>,
    resume_offer: Option<ResumeOffer>,
}

pub fn run(action: ProgressAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = progress_store(&config)?;
    let rt = runtime()?;

    match action {
        ProgressAction::Show => {
            let catalog = config.catalog()?;
            let record = rt.block_on(store.get_progress())?.unwrap_or_default();
            let techniques = record
                .per_technique_sessions
                .iter()
                .map(|(id, sessions)| TechniqueShare {
                    technique_id: id.clone(),
                    sessions: *sessions,
                    share_pct: record.technique_share_pct(id),
                })
                .collect();
            let report = ProgressReport {
                streak_message: streak_message(record.streak),
                next_goal: next_goal(record.streak),
                achievements: achievements(record.total_sessions, record.streak),
                techniques,
                resume_offer: offer_from_record(&catalog, &record),
                record,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ProgressAction::Reset { yes } => {
            if !yes {
                return Err("refusing to reset progress without --yes".into());
            }
            let update = ProgressUpdate {
                streak: Some(0),
                total_sessions: Some(0),
                techniques: Some(Vec::new()),
                last_session_elapsed_time: Some(0),
                ..Default::default()
            };
            rt.block_on(store.update_progress(update))?;
            println!("progress reset");
        }
    }
    Ok(())
}

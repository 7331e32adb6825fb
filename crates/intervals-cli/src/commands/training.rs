use clap::Subcommand;
use intervals_core::{Config, Database, Training};
use serde::Serialize;

use super::{format_duration, resolve_training, CliResult};

#[derive(Subcommand)]
pub enum TrainingAction {
    /// Create a training
    Create {
        name: String,
        /// Default work seconds for new exercises
        #[arg(long)]
        time: Option<u32>,
        /// Default rest seconds for new exercises
        #[arg(long)]
        rest: Option<u32>,
    },
    /// List trainings, most recently used first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show a training with its exercises
    Show {
        /// Training name, id or id prefix
        training: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a training and its exercises
    Delete { training: String },
    /// Copy a training with all its exercises
    Duplicate {
        training: String,
        /// Name of the copy (defaults to "<name> (copy)")
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Serialize)]
struct TrainingDetail<'a> {
    #[serde(flatten)]
    training: &'a Training,
    exercises: &'a [intervals_core::Exercise],
}

pub fn run(action: TrainingAction) -> CliResult {
    let db = Database::open()?;

    match action {
        TrainingAction::Create { name, time, rest } => {
            let defaults = Config::load_or_default().defaults;
            let draft = Training::new_draft(
                name,
                time.unwrap_or(defaults.time_secs),
                rest.unwrap_or(defaults.rest_secs),
            );
            let saved = db.save_training(&draft)?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        TrainingAction::List { json } => {
            let trainings = db.trainings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&trainings)?);
            } else if trainings.is_empty() {
                println!("no trainings");
            } else {
                for t in &trainings {
                    println!(
                        "{}  {:<24} {:>8}  last used {}",
                        &t.id.to_string()[..8],
                        t.name,
                        format_duration(t.total_time_secs),
                        t.last_used.format("%Y-%m-%d %H:%M"),
                    );
                }
            }
        }
        TrainingAction::Show { training, json } => {
            let training = resolve_training(&db, &training)?;
            let exercises = db.exercises(training.id)?;
            if json {
                let detail = TrainingDetail {
                    training: &training,
                    exercises: &exercises,
                };
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                println!(
                    "{} ({}, {} exercises)",
                    training.name,
                    format_duration(training.total_time_secs),
                    exercises.len()
                );
                for (i, e) in exercises.iter().enumerate() {
                    println!(
                        "{:>3}. {} {:<24} work {:>3}s  rest {:>3}s",
                        i + 1,
                        e.icon.info().glyph,
                        e.name,
                        e.time_secs,
                        e.rest_secs
                    );
                }
            }
        }
        TrainingAction::Delete { training } => {
            let training = resolve_training(&db, &training)?;
            db.delete_training(training.id)?;
            println!("deleted {}", training.name);
        }
        TrainingAction::Duplicate { training, name } => {
            let source = resolve_training(&db, &training)?;
            let name = name.unwrap_or_else(|| format!("{} (copy)", source.name));
            let copy = db.duplicate_training(source.id, &name)?;
            println!("{}", serde_json::to_string_pretty(&copy)?);
        }
    }
    Ok(())
}

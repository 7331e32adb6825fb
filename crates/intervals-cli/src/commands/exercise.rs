use clap::Subcommand;
use intervals_core::{Database, ExerciseIcon};

use super::{resolve_exercise, resolve_training, CliResult};

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// Append an exercise to a training
    Add {
        /// Training name, id or id prefix
        training: String,
        name: String,
        /// Work seconds (defaults to the training's default)
        #[arg(long)]
        time: Option<u32>,
        /// Rest seconds (defaults to the training's default)
        #[arg(long)]
        rest: Option<u32>,
        /// Icon key, e.g. "run", "push_ups"
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove an exercise
    Remove {
        training: String,
        /// 1-based position, id or id prefix
        exercise: String,
    },
    /// Insert a copy right after an exercise
    Duplicate { training: String, exercise: String },
    /// Move an exercise to a new 1-based position
    Move {
        training: String,
        exercise: String,
        to: usize,
    },
}

fn parse_icon(key: &str) -> Result<ExerciseIcon, String> {
    ExerciseIcon::from_key(key).ok_or_else(|| {
        let known: Vec<&str> = ExerciseIcon::ALL.iter().map(|i| i.key()).collect();
        format!("unknown icon '{key}' (expected one of: {})", known.join(", "))
    })
}

pub fn run(action: ExerciseAction) -> CliResult {
    let db = Database::open()?;

    match action {
        ExerciseAction::Add {
            training,
            name,
            time,
            rest,
            icon,
        } => {
            let training = resolve_training(&db, &training)?;
            let mut exercise = training.new_exercise(name);
            if let Some(time) = time {
                exercise.time_secs = time;
            }
            if let Some(rest) = rest {
                exercise.rest_secs = rest;
            }
            if let Some(key) = icon {
                exercise = exercise.with_icon(parse_icon(&key)?);
            }
            db.add_exercise(&exercise)?;
            println!("{}", serde_json::to_string_pretty(&exercise)?);
        }
        ExerciseAction::Remove { training, exercise } => {
            let training = resolve_training(&db, &training)?;
            let exercise = resolve_exercise(&db.exercises(training.id)?, &exercise)?;
            db.remove_exercise(training.id, exercise.id)?;
            println!("removed {}", exercise.name);
        }
        ExerciseAction::Duplicate { training, exercise } => {
            let training = resolve_training(&db, &training)?;
            let exercise = resolve_exercise(&db.exercises(training.id)?, &exercise)?;
            let copy = db.duplicate_exercise(training.id, exercise.id)?;
            println!("{}", serde_json::to_string_pretty(&copy)?);
        }
        ExerciseAction::Move {
            training,
            exercise,
            to,
        } => {
            let training = resolve_training(&db, &training)?;
            let exercise = resolve_exercise(&db.exercises(training.id)?, &exercise)?;
            let index = to.checked_sub(1).ok_or("positions start at 1")?;
            db.move_exercise(training.id, exercise.id, index)?;
            println!("moved {} to position {to}", exercise.name);
        }
    }
    Ok(())
}

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use intervals_core::player::Command;
use intervals_core::storage::session_updater;
use intervals_core::{
    Config, Database, Event, MonotonicClock, PlayState, PlaybackDriver, PlaybackEngine,
    PlayerFrame, SoundEffect, SoundEffectPlayer, SoundPool,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::{format_duration, resolve_training, CliResult};

const BAR_WIDTH: usize = 20;

#[derive(Args)]
pub struct PlayArgs {
    /// Training name, id or id prefix
    training: String,
    /// Print events as JSON lines instead of a status line
    #[arg(long)]
    json: bool,
    /// No terminal bell
    #[arg(long)]
    mute: bool,
}

/// Rings the terminal bell for every effect.
struct TerminalBell;

impl SoundEffectPlayer for TerminalBell {
    fn build(&mut self) -> intervals_core::Result<()> {
        Ok(())
    }

    fn play_sound(&mut self, effect: SoundEffect) {
        tracing::debug!(?effect, "bell");
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }

    fn release(&mut self) {}
}

pub fn run(args: PlayArgs) -> CliResult {
    let db = Database::open()?;
    let training = resolve_training(&db, &args.training)?;
    let exercises = db.exercises(training.id)?;
    if exercises.is_empty() {
        return Err(format!("training '{}' has no exercises", training.name).into());
    }
    db.touch_training(training.id, Utc::now())?;

    let config = Config::load_or_default();
    let tick = Duration::from_millis(config.playback.tick_interval_ms.max(1));

    let mut engine = PlaybackEngine::new(
        training.id,
        exercises,
        config.settings(),
        Arc::new(MonotonicClock::new()),
    )
    .on_session_update(session_updater(db));
    if !args.mute {
        engine = engine.with_sounds(SoundPool::acquire(Box::new(TerminalBell))?);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(play(engine, tick, args.json));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();
    result
}

async fn play(engine: PlaybackEngine, tick: Duration, json: bool) -> CliResult {
    let handle = PlaybackDriver::spawn(engine, tick);
    let mut frames = handle.frames();
    let mut events = handle.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut completed = false;
    let mut last_line = String::new();

    if !json {
        eprintln!("enter: pause/resume  n: next  b: back  q: quit");
    }
    handle.start()?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if json {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                    match event {
                        // Stay around for a restart while someone can type one.
                        Event::TrainingCompleted { .. } => {
                            completed = true;
                            if !stdin_open {
                                break;
                            }
                            if !json {
                                eprintln!("\nr: restart  q: quit");
                            }
                        }
                        Event::Restarted { .. } => completed = false,
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = frames.changed(), if !json => {
                if changed.is_err() {
                    break;
                }
                let line = status_line(&frames.borrow_and_update());
                if line != last_line {
                    print!("\r{line}");
                    std::io::stdout().flush()?;
                    last_line = line;
                }
            },
            line = input.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let commands = key_commands(line.trim(), &handle.frame());
                    if matches!(commands.as_slice(), [Command::Shutdown]) {
                        break;
                    }
                    for command in commands {
                        handle.send(command)?;
                    }
                }
                Ok(None) | Err(_) => {
                    stdin_open = false;
                    if completed {
                        break;
                    }
                }
            },
        }
    }

    let frame = handle.frame();
    handle.shutdown().await;

    if !json {
        println!();
        if let Some(session) = &frame.session {
            let verdict = if session.complete { "completed" } else { "stopped" };
            println!("{verdict} in {}", format_duration(session.duration_secs()));
        }
    }
    Ok(())
}

/// Map a line of keyboard input to driver commands, applied in order.
fn key_commands(key: &str, frame: &PlayerFrame) -> Vec<Command> {
    let index = frame.snapshot.index as i64;
    match key {
        "" | "p" => match frame.snapshot.state {
            PlayState::Paused => vec![Command::Resume],
            PlayState::Starting | PlayState::Running => vec![Command::Pause],
            PlayState::Ready | PlayState::Complete => Vec::new(),
        },
        "n" => vec![Command::Skip(index + 1)],
        "b" => vec![Command::Skip(index - 1)],
        // The engine ignores both unless the training is complete.
        "r" => vec![Command::Restart, Command::Start],
        "q" => vec![Command::Shutdown],
        _ => Vec::new(),
    }
}

fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

fn status_line(frame: &PlayerFrame) -> String {
    let count = frame.snapshot.exercise_count;
    let position = (frame.snapshot.index + 1).min(count);
    format!(
        "{:<20} {:>4}s [{}] {position}/{count}",
        frame.view.label.text(),
        frame.view.readout.secs(),
        progress_bar(frame.view.local_progress, BAR_WIDTH),
    )
}

//! Training playback: the engine state machine, its async driver and the
//! render data derived from it.

mod driver;
mod engine;
mod progress;

pub use driver::{Command, PlaybackDriver, PlaybackHandle, PlayerFrame};
pub use engine::{PlayState, PlaybackEngine, PlaybackSnapshot, SessionCallback, SubPhase};
pub use progress::{
    player_view, rest_label, row_progress, PhaseLabel, PlayerView, Readout, RowPosition,
    RowProgress,
};

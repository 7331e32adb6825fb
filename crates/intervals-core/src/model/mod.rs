mod exercise;
mod session;
mod training;

pub use exercise::{Exercise, ExerciseIcon, IconInfo};
pub use session::Session;
pub use training::Training;

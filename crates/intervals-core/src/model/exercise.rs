use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pictogram shown next to an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseIcon {
    #[default]
    None,
    Run,
    Jump,
    LeftArm,
    RightArm,
    SitUp,
    PushUps,
    Flex,
    Knees,
}

/// Display data for an [`ExerciseIcon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconInfo {
    /// Stable key used in storage and on the command line.
    pub key: &'static str,
    pub label: &'static str,
    pub glyph: &'static str,
}

impl ExerciseIcon {
    pub const ALL: [ExerciseIcon; 9] = [
        ExerciseIcon::None,
        ExerciseIcon::Run,
        ExerciseIcon::Jump,
        ExerciseIcon::LeftArm,
        ExerciseIcon::RightArm,
        ExerciseIcon::SitUp,
        ExerciseIcon::PushUps,
        ExerciseIcon::Flex,
        ExerciseIcon::Knees,
    ];

    pub const fn info(self) -> IconInfo {
        match self {
            ExerciseIcon::None => IconInfo { key: "none", label: "Exercise", glyph: "·" },
            ExerciseIcon::Run => IconInfo { key: "run", label: "Run", glyph: "🏃" },
            ExerciseIcon::Jump => IconInfo { key: "jump", label: "Jump", glyph: "🤸" },
            ExerciseIcon::LeftArm => IconInfo { key: "left_arm", label: "Left arm", glyph: "💪" },
            ExerciseIcon::RightArm => IconInfo { key: "right_arm", label: "Right arm", glyph: "💪" },
            ExerciseIcon::SitUp => IconInfo { key: "sit_up", label: "Sit-ups", glyph: "🧘" },
            ExerciseIcon::PushUps => IconInfo { key: "push_ups", label: "Push-ups", glyph: "🙇" },
            ExerciseIcon::Flex => IconInfo { key: "flex", label: "Flex", glyph: "🦵" },
            ExerciseIcon::Knees => IconInfo { key: "knees", label: "High knees", glyph: "🦿" },
        }
    }

    pub fn key(self) -> &'static str {
        self.info().key
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|icon| icon.key() == key)
    }
}

/// One timed work + rest unit of a training.
///
/// Exercises are values: editing one means building a replacement with the
/// same `id`. `duplicate` is the only way to get a copy with a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    /// Owning training.
    pub training: Uuid,
    pub name: String,
    #[serde(default)]
    pub icon: ExerciseIcon,
    pub time_secs: u32,
    pub rest_secs: u32,
}

impl Exercise {
    pub fn new(training: Uuid, name: impl Into<String>, time_secs: u32, rest_secs: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            training,
            name: name.into(),
            icon: ExerciseIcon::None,
            time_secs,
            rest_secs,
        }
    }

    pub fn with_icon(mut self, icon: ExerciseIcon) -> Self {
        self.icon = icon;
        self
    }

    /// Copy with a fresh id, so list removal can tell the two apart.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    /// Work plus rest, in seconds.
    pub fn total_secs(&self) -> u64 {
        u64::from(self.time_secs) + u64::from(self.rest_secs)
    }

    pub fn total_ms(&self) -> u64 {
        self.total_secs().saturating_mul(1000)
    }

    pub fn work_ms(&self) -> u64 {
        u64::from(self.time_secs).saturating_mul(1000)
    }
}

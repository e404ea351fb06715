mod config;
mod engine;
mod state;

pub use config::{MotionRule, RoundConfig, SwipeRule, TargetLayout};
pub use engine::{start_game, RoundEngine};
pub use state::{Phase, RoundState, RoundTimer, TimerKind};

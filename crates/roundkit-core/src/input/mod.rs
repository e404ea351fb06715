mod evaluator;
mod event;

pub use evaluator::{Evaluator, Outcome, OutcomeReason};
pub use event::{InputEvent, InputKind};

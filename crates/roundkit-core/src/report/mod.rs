//! Session scoring, result computation and best-effort submission.

pub mod api;
mod reporter;
mod result;

pub use api::{BoxFuture, HttpStatsApi, ResultPayload, StatsApi};
pub use reporter::SessionReporter;
pub use result::{AccuracyBasis, ScoringRules, SessionResult, XpPolicy};

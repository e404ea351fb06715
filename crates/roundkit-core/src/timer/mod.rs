mod service;

pub use service::{epoch_ms, Fired, TimerHandle, TimerService};

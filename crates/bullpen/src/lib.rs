//! Bullpen decision engine: ranks relief pitchers by expected runs allowed over
//! the next few batters and explains every ranking it produces.

pub mod config;
pub mod error;
pub mod recommender;
pub mod telemetry;
pub mod training;

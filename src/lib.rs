//! School master-schedule synthesis.
//!
//! A [`data::SchedulingInput`] is validated into a [`domain::Domain`], turned
//! into a mixed integer model by [`builder`], solved by a
//! [`engine::SolvingEngine`] and read back by [`extract`] and [`conflicts`].
//! [`pipeline`] runs one attempt; [`tuner`] searches penalty weights.

pub mod availability;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod conflicts;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod records;
pub mod server;
pub mod tuner;

pub use config::{SolveConfig, TunerConfig};
pub use engine::{HighsEngine, SolvingEngine};
pub use error::ScheduleError;
pub use pipeline::{SolveReport, SolveStatus, run, solve_input};

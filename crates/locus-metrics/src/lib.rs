//! Heuristic fact resolution, geo-labelling and composite metrics.
//!
//! Recomputation is a pure function of business rows, stored facts and the
//! spatial layers; [`MetricsEngine`] runs it over the whole table at once.

pub mod engine;
pub mod error;
pub mod geo;
pub mod rules;

pub use engine::{MetricsEngine, MetricsSettings, compute};
pub use error::{Error, Result};

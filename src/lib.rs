//! Regional update-stress analysis over enrolment, demographic and biometric extracts.
//!
//! Stages run strictly in order: [`discover`] → [`load`] → [`aggregate`] →
//! [`metrics`] → [`report`] / [`figures`]. [`pipeline::run`] drives them all.

pub mod aggregate;
pub mod config;
pub mod discover;
pub mod error;
pub mod figures;
pub mod load;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::{Category, Config, CountFields};
pub use error::PipelineError;

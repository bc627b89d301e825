//! # Algo Intent Engine
//!
//! Runs one intent through normalize, build, group, sign, submit, poll
//! and chain. Each call is an independent pipeline; engines can be shared
//! across tasks.

pub mod chainer;
pub mod config;
pub mod engine;
pub mod signing;
pub mod tracker;

pub use chainer::chain;
pub use config::EngineConfig;
pub use engine::{ChainedReport, Engine, ExecutionReport, PreparedPlan};
pub use signing::collect_signatures;
pub use tracker::SubmissionTracker;

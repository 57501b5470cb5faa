pub mod config;
pub mod logging;

pub mod checksum;
pub mod chunk;
pub mod controller;
pub mod error;
pub mod job;
pub mod run;
pub mod storage;

pub use controller::{JobController, RunOutcome, StopHandle};
pub use error::JobError;
pub use job::{Job, JobSettings, JobUnit, SignatureJob};

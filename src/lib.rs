pub mod alias;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod git;
pub mod logging;
pub mod push;
pub mod release;
pub mod ui;
pub mod warning;

pub use error::{DataVersionError, Result};

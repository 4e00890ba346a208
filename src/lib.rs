#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod progress;
pub mod scan;
pub mod schedule;
pub mod stats;
pub mod store;
pub mod upload;

mod format;
mod logger;

//! Client side of the GenoLab genomic-data platform: uploads sequence files, polls the
//! analysis tasks they start and renders the results.

pub mod config;
pub mod controllers;
pub mod errors;
pub mod models;
pub mod poller;
pub mod render;
pub mod services;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use errors::{GenolabError, GenolabResult};

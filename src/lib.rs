//! Expected points from shot-level expected goals.
//!
//! Every shot of a match is played out as an independent Bernoulli trial with
//! its xG as success probability. Repeating this many times gives a points
//! distribution for both teams, which is reduced to expected points per match.

pub mod cli;
pub mod error;
pub mod model;
pub mod provider;
pub mod report;
pub mod season;
pub mod simulation;
pub mod stats;
#[cfg(test)]
mod tests;

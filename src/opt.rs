//! Simulation-driven placement of new exits on the perimeter of a domain.

pub mod cache;
pub mod codec;
pub mod diversity;
pub mod evaluator;
pub mod greedy;
pub mod operators;
pub mod problem;

#[cfg(test)]
pub(crate) mod testing;

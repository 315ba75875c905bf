//! Marginalia
//!
//! Layout and lifecycle engine for document margin comments.
//!
//! Pure core / impure shell: [`model`], [`state`] and [`layout`] are plain
//! data and pure functions; [`coordinator`] owns the state and talks to the
//! host document and the persistence backend.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod layout;
pub mod logging;
pub mod model;
pub mod scenario;
pub mod state;

#[cfg(test)]
mod test_harness;

//! # aura-core
//!
//! Session gate, route resolution and the health-coach conversation that
//! back the Aura dashboard. The web crate only renders what this crate
//! decides.

pub mod auth;
pub mod coach;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gate;
pub mod insight;
pub mod llm;
pub mod model;
pub mod store;

pub use error::{AuraError, Result};

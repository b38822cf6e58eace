#![deny(warnings)]

//! Engine runtime: the tick pipeline and the instruction dispatcher.
//!
//! Callers hold an `Arc<GameState>` and hand it to [`Engine::dispatch`]
//! together with an [`Instruction`]. The engine mutates a private draft and
//! returns a fresh snapshot, so readers of the previous one never observe a
//! half-applied update.

pub mod config;
pub mod engine;
pub mod tick;

pub use config::{EngineConfig, SuspicionThreshold};
pub use engine::{Engine, Instruction, Outcome, Update};
pub use tick::{tick, TickInput, TickReport};

use sim_content::ContentError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("invalid engine config: {0}")]
    Config(String),
}

// ABOUTME: Root module for hydro-agent - a function-calling chat agent that
// ABOUTME: answers hydrology questions. Re-exports all public types.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod prelude;
pub mod tool;
pub mod tools;

pub use error::HydroError;

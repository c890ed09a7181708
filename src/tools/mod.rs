// ABOUTME: Built-in hydrology tools backed by the water/rain data service.
// ABOUTME: Reservoir levels, rainfall, and station listings.

use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::error::RegistrationError;
use crate::tool::ToolRegistry;

mod hydro;
pub mod matching;
mod rain;
mod reservoir;
mod stations;

pub use hydro::{HydroApi, Record, STATIONS_PAGE_SIZE, StationPage};
pub use matching::best_match;
pub use rain::RainTool;
pub use reservoir::ReservoirTool;
pub use stations::StationsTool;

/// Register the three hydrology tools, sharing one `api` client.
pub fn register_builtin(
    registry: &mut ToolRegistry,
    api: Arc<HydroApi>,
) -> Result<(), RegistrationError> {
    registry.register(ReservoirTool::new(api.clone()))?;
    registry.register(RainTool::new(api.clone()))?;
    registry.register(StationsTool::new(api))?;
    Ok(())
}

/// A registry holding only the hydrology tools.
pub fn hydro_registry(api: Arc<HydroApi>) -> Result<ToolRegistry, RegistrationError> {
    let mut registry = ToolRegistry::new();
    register_builtin(&mut registry, api)?;
    Ok(registry)
}

/// A required argument that may be `null`. Unlike a plain `Option` field,
/// leaving the key out is an error.
fn nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// Treat null and empty arguments alike.
fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

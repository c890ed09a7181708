// ABOUTME: Tool module - declarations, registry, and dispatch.
// ABOUTME: Core abstraction for the capabilities offered to the model.

mod registry;
mod result;
mod spec;
mod traits;

pub use registry::*;
pub use result::*;
pub use spec::*;
pub use traits::*;

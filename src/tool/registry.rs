// ABOUTME: Implements the ToolRegistry - validates tool declarations at
// ABOUTME: registration and dispatches calls by name, always yielding text.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::{Arguments, ParamType, Tool, ToolSpec};
use crate::error::RegistrationError;

/// Text returned when the model asks for a tool that is not registered.
pub fn not_found_message(name: &str) -> String {
    format!("Tool `{}` not found. Please use a provided tool.", name)
}

struct Registered {
    spec: ToolSpec,
    tool: Arc<dyn Tool>,
}

/// The set of tools the model may call.
///
/// Populated once at startup, then shared read-only (typically behind an
/// `Arc`) by every conversation. Specs are listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Registered>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistrationError> {
        self.register_arc(Arc::new(tool))
    }

    /// Validate and register a tool from an Arc.
    ///
    /// Registering a name that already exists replaces the earlier tool and
    /// keeps its position in the listing.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistrationError> {
        let spec = build_spec(tool.as_ref())?;
        tracing::info!(
            tool = %spec.name,
            params = ?spec.params.iter().map(|p| format!("{}: {}", p.name, p.type_tag)).collect::<Vec<_>>(),
            "registered tool"
        );

        match self.index.entry(spec.name.clone()) {
            Entry::Occupied(slot) => {
                tracing::debug!(tool = %spec.name, "replacing previously registered tool");
                self.entries[*slot.get()] = Registered { spec, tool };
            }
            Entry::Vacant(slot) => {
                slot.insert(self.entries.len());
                self.entries.push(Registered { spec, tool });
            }
        }
        Ok(())
    }

    /// Builder-style registration.
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Result<Self, RegistrationError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.entries[i].tool))
    }

    /// Returns true if a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.spec.name.clone()).collect()
    }

    /// Owned copies of every tool spec, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.entries.iter().map(|e| e.spec.clone()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the named tool and return its result as text.
    ///
    /// Never fails: an unknown name yields [`not_found_message`], and an
    /// error or panic inside the tool is rendered into the returned text so
    /// the model can see what went wrong.
    pub async fn dispatch(&self, name: &str, args: Arguments) -> String {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "model requested an unregistered tool");
            return not_found_message(name);
        };

        match AssertUnwindSafe(tool.call(args)).catch_unwind().await {
            Ok(Ok(output)) => {
                let text = output.into_text();
                tracing::info!(tool = name, response = %text, "tool call response");
                text
            }
            Ok(Err(err)) => {
                tracing::warn!(tool = name, error = %err, "tool call failed");
                format!("Tool `{}` failed with an error:\n{:?}", name, err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(tool = name, panic = %message, "tool call panicked");
                format!("Tool `{}` panicked: {}", name, message)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// First non-blank paragraph of a tool's documentation.
fn summary(doc: &str) -> String {
    doc.trim()
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn build_spec(tool: &dyn Tool) -> Result<ToolSpec, RegistrationError> {
    let name = tool.name().to_string();
    let description = summary(tool.description());
    if description.is_empty() {
        return Err(RegistrationError::MissingDescription { tool: name });
    }

    let params = tool.params();
    for (i, param) in params.iter().enumerate() {
        let err_param = || param.name.clone();
        if param.name.trim().is_empty() {
            return Err(RegistrationError::EmptyParamName { tool: name });
        }
        if params[..i].iter().any(|p| p.name == param.name) {
            return Err(RegistrationError::DuplicateParam {
                tool: name,
                param: err_param(),
            });
        }
        if param.type_tag.trim().is_empty() {
            return Err(RegistrationError::MissingType {
                tool: name,
                param: err_param(),
            });
        }
        if param.description.trim().is_empty() {
            return Err(RegistrationError::MissingParamDescription {
                tool: name,
                param: err_param(),
            });
        }
        if ParamType::parse(&param.type_tag).is_none() {
            return Err(RegistrationError::UnknownType {
                tool: name,
                param: err_param(),
                type_tag: param.type_tag.clone(),
            });
        }
    }

    Ok(ToolSpec {
        name,
        description,
        params,
    })
}

//! Targets shipped with the engine.

pub mod json;

use crate::registry::Registry;

/// Register every built-in target.
pub fn register(registry: &mut Registry) {
    json::register(registry);
}

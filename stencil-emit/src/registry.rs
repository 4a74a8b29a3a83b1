//! Name-keyed registry of generation targets.
//!
//! Built once at start-up (usually with [`Registry::with_builtin`]) and
//! passed by reference to [`process`](crate::process) and
//! [`write_raw`](crate::write_raw).

use std::collections::BTreeMap;
use std::sync::Arc;

use stencil_core::FlagSet;

use crate::target::Target;
use crate::targets;

/// Command every target supports regardless of its declared list.
pub const DUMP_COMMAND: &str = "dump";

#[derive(Debug, Default)]
pub struct Registry {
    targets: BTreeMap<String, Arc<Target>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every target shipped with the engine.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        targets::register(&mut registry);
        registry
    }

    /// Store `target` under `name`, returning the target it replaced.
    ///
    /// A later registration under the same name wins.
    pub fn register(&mut self, name: impl Into<String>, target: Target) -> Option<Arc<Target>> {
        let name = name.into();
        let replaced = self.targets.insert(name.clone(), Arc::new(target));
        if replaced.is_some() {
            tracing::warn!(target_name = %name, "target registered twice; keeping the later one");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Target>> {
        self.targets.get(name)
    }

    /// Registered target names, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    /// Whether `name` applies to `command`.
    ///
    /// [`DUMP_COMMAND`] always applies. An unregistered name or a target
    /// without a command list applies to everything.
    pub fn is_for(&self, name: &str, command: &str) -> bool {
        if command == DUMP_COMMAND {
            return true;
        }
        self.targets
            .get(name)
            .map_or(true, |target| target.supports(command))
    }

    /// Extra options declared by every target whose command list allows
    /// `command`. Unlike [`is_for`](Self::is_for), `dump` gets no special
    /// treatment here.
    pub fn flags(&self, command: &str) -> Vec<FlagSet> {
        self.targets
            .iter()
            .filter(|(_, target)| target.supports(command))
            .flat_map(|(name, target)| target.flag_sets(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use stencil_core::{FlagKind, FlagOption, StaticSource};

    use crate::error::EngineError;
    use crate::process::Emitter;

    fn noop(_: &mut Emitter<'_>, _: &Value) -> Result<(), EngineError> {
        Ok(())
    }

    fn target(ext: &str) -> Target {
        Target::new(StaticSource::new(), noop).file_ext(ext)
    }

    #[test]
    fn types_are_sorted() {
        let mut registry = Registry::new();
        registry.register("zeta", target(".z"));
        registry.register("alpha", target(".a"));
        assert_eq!(registry.types(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = Registry::new();
        assert!(registry.register("go", target(".go")).is_none());
        let replaced = registry.register("go", target(".golang")).expect("replaced");
        assert_eq!(replaced.ext(), ".go");
        assert_eq!(registry.get("go").map(|t| t.ext()), Some(".golang"));
    }

    #[test]
    fn dump_and_unknown_targets_always_apply() {
        let mut registry = Registry::new();
        registry.register("go", target(".go").for_commands(["schema"]));
        assert!(registry.is_for("go", DUMP_COMMAND));
        assert!(registry.is_for("go", "schema"));
        assert!(!registry.is_for("go", "query"));
        assert!(registry.is_for("missing", "query"));
    }

    #[test]
    fn flags_cover_applicable_targets_only() {
        let mut registry = Registry::new();
        registry.register(
            "go",
            target(".go")
                .for_commands(["schema"])
                .flag(FlagOption::new("go-pkg", FlagKind::String, "package")),
        );
        registry.register(
            "any",
            target(".txt").flag(FlagOption::new("any-flag", FlagKind::Bool, "anything")),
        );
        let keys = |cmd: &str| {
            registry
                .flags(cmd)
                .into_iter()
                .map(|f| format!("{}:{}", f.target, f.name))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys("schema"), vec!["any:any-flag", "go:go-pkg"]);
        assert_eq!(keys("query"), vec!["any:any-flag"]);
    }

    #[test]
    fn dump_flags_skip_restricted_targets() {
        let mut registry = Registry::new();
        registry.register(
            "go",
            target(".go")
                .for_commands(["schema"])
                .flag(FlagOption::new("go-pkg", FlagKind::String, "package")),
        );
        assert!(registry.is_for("go", DUMP_COMMAND));
        assert!(registry.flags(DUMP_COMMAND).is_empty());

        registry.register(
            "any",
            target(".txt").flag(FlagOption::new("any-flag", FlagKind::Bool, "anything")),
        );
        let names: Vec<_> = registry.flags(DUMP_COMMAND).into_iter().map(|f| f.target).collect();
        assert_eq!(names, vec!["any"]);
    }

    #[test]
    fn builtin_registry_has_json() {
        let registry = Registry::with_builtin();
        assert!(registry.types().contains(&"json"));
    }
}

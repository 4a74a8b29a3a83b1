//! Script extension: target-defined template helpers written in Lua.
//!
//! A resource tree may contain [`FUNCS_RESOURCE`]. When present it is
//! evaluated in a sandboxed Lua 5.4 state that only has the `table`,
//! `string`, `math` and `utf8` libraries, plus a `stencil` table exposing the
//! engine's casing helpers. The script must define a global
//! `Init(config)` returning `(functions, err)`:
//!
//! ```lua
//! function Init(config)
//!   return {
//!     shout = function(s) return string.upper(s) .. "!" end,
//!   }, nil
//! end
//! ```
//!
//! Every returned function becomes both a tera filter (called as
//! `fn(value, args)`) and a tera function (called as `fn(args)`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mlua::{
    Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, MultiValue, RegistryKey, StdLib, Table,
    Value as LuaValue, VmState,
};
use tera::Value;

use stencil_core::{CancelFlag, RunConfig, SourceError, TemplateSource};

use crate::error::ExtensionError;
use crate::filters::CASES;
use crate::funcs::FuncMap;

/// Script resource looked up at the root of the active resource tree.
pub const FUNCS_RESOURCE: &str = "funcs.lua";

/// Required entry point.
pub const INIT_FN: &str = "Init";

/// Global table through which scripts reach engine helpers.
const HOST_TABLE: &str = "stencil";

/// Instructions between cancellation checks.
const HOOK_INTERVAL: u32 = 10_000;

/// Evaluate the source's script extension, if it has one.
///
/// Returns `Ok(None)` when the resource is absent.
pub fn load_extension(
    source: &dyn TemplateSource,
    config: &RunConfig,
) -> Result<Option<FuncMap>, ExtensionError> {
    if config.cancel.is_cancelled() {
        return Err(ExtensionError::Read(SourceError::Cancelled));
    }
    let buf = match source.read(FUNCS_RESOURCE) {
        Ok(buf) => buf,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(ExtensionError::Read(e)),
    };
    let script = String::from_utf8(buf).map_err(|_| ExtensionError::Utf8)?;
    tracing::debug!(target_type = %config.template_type, "evaluating {FUNCS_RESOURCE}");

    let lua = sandbox(&config.cancel).map_err(ExtensionError::Eval)?;
    lua.load(script.as_str())
        .set_name(FUNCS_RESOURCE)
        .exec()
        .map_err(ExtensionError::Eval)?;

    let init = match lua.globals().get::<LuaValue>(INIT_FN).map_err(ExtensionError::Eval)? {
        LuaValue::Nil => return Err(ExtensionError::MissingInit),
        LuaValue::Function(f) => f,
        other => {
            return Err(ExtensionError::InitShape {
                found: other.type_name().to_string(),
            })
        }
    };

    let cfg = lua.to_value(config).map_err(ExtensionError::Eval)?;
    let (funcs, err) = init
        .call::<(LuaValue, LuaValue)>(cfg)
        .map_err(|e| ExtensionError::Init {
            message: e.to_string(),
        })?;
    match err {
        LuaValue::Nil => {}
        LuaValue::String(s) => {
            return Err(ExtensionError::Init {
                message: s.to_string_lossy().to_string(),
            })
        }
        other => {
            return Err(ExtensionError::Init {
                message: format!("non-nil {} error value", other.type_name()),
            })
        }
    }

    let table = match funcs {
        LuaValue::Nil => return Ok(Some(FuncMap::new())),
        LuaValue::Table(t) => t,
        other => {
            return Err(ExtensionError::InitShape {
                found: format!("Init returning a {}", other.type_name()),
            })
        }
    };

    let mut names = Vec::new();
    for pair in table.clone().pairs::<String, LuaValue>() {
        let (name, value) = pair.map_err(ExtensionError::Eval)?;
        if !matches!(value, LuaValue::Function(_)) {
            return Err(ExtensionError::NotCallable {
                name,
                found: value.type_name().to_string(),
            });
        }
        names.push(name);
    }
    names.sort();

    let key = lua.create_registry_value(table).map_err(ExtensionError::Eval)?;
    let host = Arc::new(ScriptHost {
        lua: Mutex::new(lua),
        funcs: key,
    });

    let mut map = FuncMap::new();
    for name in names {
        let func = ScriptFunc {
            host: Arc::clone(&host),
            name: name.clone(),
        };
        map.insert_filter(name.clone(), func.clone());
        map.insert_function(name, func);
    }
    tracing::debug!(
        count = map.filter_names().count(),
        "registered script funcs from {FUNCS_RESOURCE}"
    );
    Ok(Some(map))
}

/// A Lua state restricted to side-effect-free libraries, with file-loading
/// base functions removed.
fn sandbox(cancel: &CancelFlag) -> mlua::Result<Lua> {
    let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8;
    let lua = Lua::new_with(libs, LuaOptions::default())?;

    let flag = cancel.clone();
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
        move |_lua, _debug| {
            if flag.is_cancelled() {
                Err(mlua::Error::runtime("run cancelled"))
            } else {
                Ok(VmState::Continue)
            }
        },
    );

    let globals = lua.globals();
    for name in ["dofile", "loadfile"] {
        globals.set(name, LuaValue::Nil)?;
    }

    let host = lua.create_table()?;
    for &(name, convert) in CASES {
        host.set(name, lua.create_function(move |_, s: String| Ok(convert(&s)))?)?;
    }
    host.set("version", env!("CARGO_PKG_VERSION"))?;
    globals.set(HOST_TABLE, host)?;
    Ok(lua)
}

// ---------------------------------------------------------------------------
// Script-backed callables
// ---------------------------------------------------------------------------

struct ScriptHost {
    lua: Mutex<Lua>,
    /// The table returned by `Init`.
    funcs: RegistryKey,
}

#[derive(Clone)]
struct ScriptFunc {
    host: Arc<ScriptHost>,
    name: String,
}

impl ScriptFunc {
    fn invoke(&self, args: &[&Value]) -> tera::Result<Value> {
        let lua = self
            .host
            .lua
            .lock()
            .map_err(|_| tera::Error::msg("script host lock poisoned"))?;
        let call = || -> mlua::Result<Value> {
            let funcs: Table = lua.registry_value(&self.host.funcs)?;
            let func: Function = funcs.get(self.name.as_str())?;
            let mut lua_args = Vec::with_capacity(args.len());
            for arg in args {
                lua_args.push(lua.to_value(*arg)?);
            }
            let ret = func.call::<LuaValue>(MultiValue::from_vec(lua_args))?;
            lua.from_value(ret)
        };
        call().map_err(|e| tera::Error::msg(format!("script func {} failed: {e}", self.name)))
    }
}

fn args_value(args: &HashMap<String, Value>) -> Value {
    Value::Object(args.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

impl tera::Filter for ScriptFunc {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.invoke(&[value, &args_value(args)])
    }
}

impl tera::Function for ScriptFunc {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.invoke(&[&args_value(args)])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

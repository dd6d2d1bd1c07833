//! Embedded Lua 5.4 runtime.
//!
//! Input is compiled as an expression first (`return <text>`) and falls back to a
//! statement chunk, the way the stock Lua REPL does. Reads of undefined globals raise
//! errors instead of yielding `nil`, so typos surface as evaluation errors.
//!
//! Termination is cooperative: an instruction-count hook checks the session's
//! [`TerminateHandle`] every `hook_instructions` VM instructions and raises
//! [`INTERRUPTED_MESSAGE`] once termination is requested. `pcall`, `xpcall` and
//! `coroutine.resume` are wrapped so a terminated evaluation cannot swallow that
//! error and keep running.

use super::{HostFunction, HostValue, ScriptRuntime, TerminateHandle};
use crate::error::RuntimeError;
use mlua::{Function, HookTriggers, Lua, MultiValue, Value, VmState};

/// Error text raised inside a terminated evaluation.
pub const INTERRUPTED_MESSAGE: &str = "interrupted";

const CHUNK_NAME: &str = "=input";

const STRICT_GLOBALS: &str = r#"
setmetatable(_G, {
    __index = function(_, name)
        error("'" .. tostring(name) .. "' is not defined", 2)
    end,
})
"#;

const PROTECTED_CALL_GUARD: &str = r#"
local terminated, message = ...
local pcall, xpcall, resume = pcall, xpcall, coroutine.resume

local function checked(...)
    if terminated() then
        error(message, 0)
    end
    return ...
end

_G.pcall = function(...)
    return checked(pcall(...))
end
_G.xpcall = function(...)
    return checked(xpcall(...))
end
coroutine.resume = function(...)
    return checked(resume(...))
end
"#;

#[derive(Debug, Clone)]
pub struct LuaOptions {
    /// VM instructions between termination checks.
    pub hook_instructions: u32,
}

impl Default for LuaOptions {
    fn default() -> Self {
        Self {
            hook_instructions: 1000,
        }
    }
}

pub struct LuaRuntime {
    lua: Lua,
}

impl LuaRuntime {
    pub fn new(terminate: TerminateHandle, options: LuaOptions) -> Result<Self, RuntimeError> {
        let lua = Lua::new();
        lua.load(STRICT_GLOBALS)
            .set_name("=strict")
            .exec()
            .map_err(|err| RuntimeError::Init(describe_error(&err)))?;

        let terminated = {
            let terminate = terminate.clone();
            lua.create_function(move |_, ()| Ok(terminate.is_requested()))
                .map_err(|err| RuntimeError::Init(describe_error(&err)))?
        };
        lua.load(PROTECTED_CALL_GUARD)
            .set_name("=guard")
            .call::<()>((terminated, INTERRUPTED_MESSAGE))
            .map_err(|err| RuntimeError::Init(describe_error(&err)))?;

        let every = options.hook_instructions.max(1);
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(every),
            move |_lua, _debug| {
                if terminate.is_requested() {
                    Err(mlua::Error::RuntimeError(INTERRUPTED_MESSAGE.to_string()))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );
        Ok(Self { lua })
    }

    fn compile(&self, source: &str) -> mlua::Result<Function> {
        let expression = format!("return {source}");
        match self
            .lua
            .load(expression.as_str())
            .set_name(CHUNK_NAME)
            .into_function()
        {
            Ok(function) => Ok(function),
            Err(_) => self.lua.load(source).set_name(CHUNK_NAME).into_function(),
        }
    }

    fn render(&self, values: MultiValue) -> mlua::Result<Option<String>> {
        let values: Vec<Value> = values.into_iter().collect();
        if values.is_empty() || (values.len() == 1 && values[0].is_nil()) {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            parts.push(display_value(&self.lua, value)?);
        }
        Ok(Some(parts.join("\t")))
    }
}

impl ScriptRuntime for LuaRuntime {
    fn execute(&mut self, source: &str) -> Result<Option<String>, String> {
        let function = self.compile(source).map_err(|err| describe_error(&err))?;
        let values = function
            .call::<MultiValue>(())
            .map_err(|err| describe_error(&err))?;
        self.render(values).map_err(|err| describe_error(&err))
    }

    fn register_host_function(
        &mut self,
        name: &str,
        function: HostFunction,
    ) -> Result<(), RuntimeError> {
        let install_error = |err: mlua::Error| RuntimeError::HostInstall {
            name: name.to_string(),
            message: describe_error(&err),
        };
        let callback = self
            .lua
            .create_function(move |lua, args: MultiValue| {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(to_host_value(lua, arg)?);
                }
                match function(&values) {
                    Ok(result) => from_host_value(lua, result),
                    Err(message) => Err(mlua::Error::RuntimeError(message)),
                }
            })
            .map_err(install_error)?;
        self.lua
            .globals()
            .set(name, callback)
            .map_err(install_error)
    }
}

fn display_value(lua: &Lua, value: Value) -> mlua::Result<String> {
    if let Value::String(text) = &value {
        return Ok(text.to_string_lossy().to_string());
    }
    let tostring: Function = lua.globals().get("tostring")?;
    tostring.call::<String>(value)
}

fn to_host_value(lua: &Lua, value: Value) -> mlua::Result<HostValue> {
    Ok(match value {
        Value::Nil => HostValue::Nil,
        Value::Boolean(flag) => HostValue::Boolean(flag),
        Value::Integer(number) => HostValue::Integer(number),
        Value::Number(number) => HostValue::Number(number),
        Value::String(text) => HostValue::Text(text.to_string_lossy().to_string()),
        other => HostValue::Opaque(display_value(lua, other)?),
    })
}

fn from_host_value(lua: &Lua, value: HostValue) -> mlua::Result<Value> {
    Ok(match value {
        HostValue::Nil => Value::Nil,
        HostValue::Boolean(flag) => Value::Boolean(flag),
        HostValue::Integer(number) => Value::Integer(number),
        HostValue::Number(number) => Value::Number(number),
        HostValue::Text(text) | HostValue::Opaque(text) => Value::String(lua.create_string(&text)?),
    })
}

/// Strip mlua's wrapping down to the message a script author cares about.
fn describe_error(err: &mlua::Error) -> String {
    match err {
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::CallbackError { cause, .. } => describe_error(cause),
        mlua::Error::WithContext { cause, .. } => describe_error(cause),
        other => other.to_string(),
    }
}

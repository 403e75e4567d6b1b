pub mod class;
pub(crate) mod func;
pub mod module;
pub mod object;
pub mod string;
pub mod table;
pub mod var;
pub mod vector;

use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use mlua::{HookTriggers, VmState, prelude::*};

use crate::shared::{
    PtrMagic,
    config::EngineConfig,
    error::{ObjectError, ScriptError},
};

/// Shared flag that stops running scripts.
///
/// Cloning shares the flag, so a clone can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fail with [`ObjectError::Cancelled`] once the engine's token has been cancelled.
pub(crate) fn check_cancelled(lua: &Lua) -> LuaResult<()> {
    match lua.app_data_ref::<CancelToken>() {
        Some(token) if token.is_cancelled() => Err(ObjectError::Cancelled.into()),
        _ => Ok(()),
    }
}

fn cancel_hook(token: CancelToken) -> impl Fn(&Lua, &mlua::Debug) -> LuaResult<VmState> + 'static {
    move |_lua, _debug| {
        if token.is_cancelled() {
            tracing::warn!("script cancelled");
            return Err(ObjectError::Cancelled.into());
        }
        Ok(VmState::Continue)
    }
}

/// Install the class model and the library extensions into `lua`.
///
/// Call once per engine.
pub fn open_standard_libraries_extensions(lua: &Lua) -> LuaResult<()> {
    class::open_class_library(lua)?;
    string::open_string_library_extensions(lua)?;
    module::extend_library(lua, "table", vec![("copy", table::create_copy_function(lua)?)])?;
    vector::open_vector_library(lua)?;
    Ok(())
}

/// An engine plus the host-side state that goes with it.
pub struct LuaScripting {
    engine: Lua,
    config: EngineConfig,
    cancel: CancelToken,
}

impl LuaScripting {
    pub fn new(config: EngineConfig) -> Result<Self, ScriptError> {
        config.validate()?;

        let engine = Lua::new_with(LuaStdLib::ALL_SAFE, LuaOptions::default())?;
        open_standard_libraries_extensions(&engine)?;

        let cancel = CancelToken::new();
        engine.set_app_data(cancel.clone());

        // The global hook covers threads created later (coroutines, async chunks);
        // the main thread already exists and needs its own.
        let triggers = HookTriggers::new().every_nth_instruction(config.cancel_check_interval);
        engine.set_global_hook(triggers, cancel_hook(cancel.clone()))?;
        engine.set_hook(triggers, cancel_hook(cancel.clone()))?;

        tracing::debug!(
            chunk = %config.chunk_name,
            interval = config.cancel_check_interval,
            "lua engine started"
        );
        Ok(Self {
            engine,
            config,
            cancel,
        })
    }

    pub fn lua(&self) -> &Lua {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn reset_cancellation(&self) {
        self.cancel.reset();
    }

    fn ensure_not_cancelled(&self) -> Result<(), ScriptError> {
        if self.cancel.is_cancelled() {
            return Err(ScriptError::Cancelled);
        }
        Ok(())
    }

    /// Evaluate `code` and render every returned value with `tostring`.
    pub async fn execute_source(&self, code: &str) -> Result<Vec<String>, ScriptError> {
        let name = format!("={}", self.config.chunk_name);
        self.execute_chunk(code, name).await
    }

    /// Blocking twin of [`LuaScripting::execute_source`].
    pub fn run_source(&self, code: &str) -> Result<Vec<String>, ScriptError> {
        let name = format!("={}", self.config.chunk_name);
        self.run_chunk(code, name)
    }

    pub async fn execute_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>, ScriptError> {
        let path = path.as_ref();
        let code = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScriptError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        self.execute_chunk(&code, format!("@{}", path.display()))
            .await
    }

    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>, ScriptError> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.run_chunk(&code, format!("@{}", path.display()))
    }

    /// Run `code` under an explicit chunk name (`=name` or `@path`).
    pub fn run_chunk(&self, code: &str, name: String) -> Result<Vec<String>, ScriptError> {
        self.ensure_not_cancelled()?;
        let values = self
            .engine
            .load(code)
            .set_name(name)
            .eval::<LuaMultiValue>()?;
        Ok(var::display_values(&self.engine, values)?)
    }

    async fn execute_chunk(&self, code: &str, name: String) -> Result<Vec<String>, ScriptError> {
        self.ensure_not_cancelled()?;
        let values = self
            .engine
            .load(code)
            .set_name(name)
            .eval_async::<LuaMultiValue>()
            .await?;
        Ok(var::display_values(&self.engine, values)?)
    }
}

impl PtrMagic for LuaScripting {}

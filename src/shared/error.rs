//! Error types for the class model and the host execution surface.

use std::path::PathBuf;

use mlua::prelude::*;
use thiserror::Error;

/// Errors raised inside the engine by class objects and library callbacks.
///
/// These travel through Lua as external errors, so scripts can `pcall` them and the
/// host can recover the variant with [`ScriptError::object_error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    #[error("bad argument #{index} to '{function}' ({expected} expected, got {actual})")]
    ArgumentType {
        index: usize,
        function: String,
        expected: String,
        actual: String,
    },

    #[error("bad argument #{index} to '{function}' ({reason})")]
    ArgumentRange {
        index: usize,
        function: String,
        reason: String,
    },

    #[error("'{member}' cannot overwrite.")]
    ImmutableMember { member: String },

    #[error("Class<{class}> is locked")]
    LockedClass { class: String },

    #[error("{class}<> is an instance and cannot be constructed")]
    ConstructionOnInstance { class: String },

    #[error("execution cancelled")]
    Cancelled,
}

impl ObjectError {
    /// Wrap into an engine error so it can be raised from a callback.
    pub fn into_lua(self) -> LuaError {
        LuaError::external(self)
    }
}

impl From<ObjectError> for LuaError {
    fn from(err: ObjectError) -> Self {
        err.into_lua()
    }
}

/// Find the [`ObjectError`] behind an engine error, looking through callback layers.
pub fn find_object_error(err: &LuaError) -> Option<&ObjectError> {
    match err {
        LuaError::ExternalError(inner) => inner.downcast_ref::<ObjectError>(),
        LuaError::CallbackError { cause, .. } => find_object_error(cause),
        LuaError::WithContext { cause, .. } => find_object_error(cause),
        _ => None,
    }
}

/// Errors surfaced to the host when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced to the host by script execution.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("{0}")]
    Lua(LuaError),

    #[error("execution cancelled")]
    Cancelled,

    #[error("cannot read script '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScriptError {
    /// The class-model error that caused this failure, if any.
    pub fn object_error(&self) -> Option<&ObjectError> {
        match self {
            ScriptError::Lua(err) => find_object_error(err),
            ScriptError::Cancelled => Some(&ObjectError::Cancelled),
            _ => None,
        }
    }

    /// Traceback captured where a callback failed.
    pub fn traceback(&self) -> Option<&str> {
        fn walk(err: &LuaError) -> Option<&str> {
            match err {
                LuaError::CallbackError { traceback, .. } => Some(traceback.as_str()),
                LuaError::WithContext { cause, .. } => walk(cause),
                _ => None,
            }
        }

        match self {
            ScriptError::Lua(err) => walk(err),
            _ => None,
        }
    }
}

impl From<LuaError> for ScriptError {
    fn from(err: LuaError) -> Self {
        if matches!(find_object_error(&err), Some(ObjectError::Cancelled)) {
            ScriptError::Cancelled
        } else {
            ScriptError::Lua(err)
        }
    }
}

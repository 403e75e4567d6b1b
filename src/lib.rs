//! Class emulation, deep table copies and string-library extensions for embedded Lua.
//!
//! [`LuaScripting`] owns one engine with everything installed. Hosts that build their own
//! `mlua::Lua` can call [`open_standard_libraries_extensions`] instead. The `extern "C"`
//! functions below expose the engine to non-Rust hosts; `build.rs` writes their header.

use std::{
    ffi::{c_char, c_uint},
    ptr,
};

pub mod lua;
pub mod shared;

pub use crate::lua::{
    CancelToken, LuaScripting,
    class::{ClassObject, construct, declare},
    open_standard_libraries_extensions,
    table::{CopyMemo, deep_copy, deep_copy_with},
    vector::Vector3,
};
pub use crate::shared::{
    PtrMagic,
    config::{EngineConfig, LogSettings},
    error::{ConfigError, ObjectError, ScriptError},
};

/// Current luaclass version.
#[unsafe(no_mangle)]
pub extern "C" fn luaclass_version() -> c_uint {
    0x00010000 // 1.0.0
}

/// Create an engine with the default configuration.
///
/// Returns null if the engine could not be built. Free with `luaclass_free_engine`.
#[unsafe(no_mangle)]
pub extern "C" fn luaclass_new_engine() -> *mut LuaScripting {
    match LuaScripting::new(EngineConfig::default()) {
        Ok(engine) => engine.into_raw(),
        Err(err) => {
            tracing::error!("cannot create engine: {}", err);
            ptr::null_mut()
        }
    }
}

/// Free an engine made by `luaclass_new_engine`.
///
/// # Safety
/// `engine` must come from `luaclass_new_engine` and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn luaclass_free_engine(engine: *mut LuaScripting) {
    if engine.is_null() {
        return;
    }
    drop(unsafe { LuaScripting::from_raw(engine) });
}

/// Execute some lua code.
///
/// Returns the results joined by a space, or the error text with `*failed` set to true.
/// An empty `chunk_name` uses the configured one. Free the result with `luaclass_free_str`.
///
/// # Safety
/// `engine` must be null or a live pointer from `luaclass_new_engine`. `code` and
/// `chunk_name` must be null or NUL-terminated strings. `failed` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn luaclass_exec(
    engine: *mut LuaScripting,
    code: *const c_char,
    chunk_name: *const c_char,
    failed: *mut bool,
) -> *mut c_char {
    let set_failed = |value: bool| {
        if !failed.is_null() {
            unsafe { *failed = value };
        }
    };

    if engine.is_null() {
        set_failed(true);
        return create_raw_string!("Engine is null");
    }
    let engine = unsafe { LuaScripting::from_borrow(engine) };
    let code = borrow_string!(code);
    let chunk_name = match borrow_string!(chunk_name) {
        "" => engine.config().chunk_name.clone(),
        name => name.to_string(),
    };

    match engine.run_chunk(code, format!("={}", chunk_name)) {
        Ok(values) => {
            set_failed(false);
            create_raw_string!(values.join(" "))
        }
        Err(err) => {
            set_failed(true);
            create_raw_string!(err.to_string())
        }
    }
}

/// Cancel whatever the engine is running, and everything it runs until reset.
///
/// # Safety
/// `engine` must be null or a live pointer from `luaclass_new_engine`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn luaclass_cancel(engine: *mut LuaScripting) {
    if engine.is_null() {
        return;
    }
    unsafe { LuaScripting::from_borrow(engine) }.cancel_token().cancel();
}

/// Free a string returned by the luaclass library.
///
/// # Safety
/// `string` must be null or come from this library, and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn luaclass_free_str(string: *mut c_char) {
    free_raw_string!(string);
}

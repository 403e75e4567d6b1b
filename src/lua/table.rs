//! Recursive table cloning.
//!
//! Every distinct source table is cloned exactly once per top-level call, so shared
//! sub-tables stay shared in the copy and cycles resolve to the copy already in progress.

use std::collections::HashMap;
use std::ffi::c_void;

use mlua::prelude::*;

use crate::lua::func::Args;

/// Source table identity to the copy made for it.
#[derive(Default)]
pub struct CopyMemo {
    copies: HashMap<*const c_void, LuaTable>,
}

impl CopyMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &LuaTable) -> Option<&LuaTable> {
        self.copies.get(&source.to_pointer())
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    fn insert(&mut self, source: &LuaTable, copy: LuaTable) {
        self.copies.insert(source.to_pointer(), copy);
    }
}

/// Clone `source` and every table reachable from its values.
///
/// Keys and non-table values are copied by reference; metatables are shared, not cloned.
pub fn deep_copy(lua: &Lua, source: &LuaTable) -> LuaResult<LuaTable> {
    let mut memo = CopyMemo::new();
    let copy = deep_copy_with(lua, source, &mut memo)?;
    tracing::trace!(tables = memo.len(), "deep copied table graph");
    Ok(copy)
}

/// Clone `source`, reusing and extending the copies already recorded in `memo`.
///
/// Nesting depth is bounded by heap, not by the native stack.
pub fn deep_copy_with(lua: &Lua, source: &LuaTable, memo: &mut CopyMemo) -> LuaResult<LuaTable> {
    if let Some(copy) = memo.get(source) {
        return Ok(copy.clone());
    }

    let root = discover(lua, source, memo)?;
    let mut pending = vec![(source.clone(), root.clone())];
    while let Some((from, into)) = pending.pop() {
        into.set_metatable(from.metatable())?;
        for pair in from.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let value = match value {
                LuaValue::Table(child) => {
                    let copy = match memo.get(&child) {
                        Some(existing) => existing.clone(),
                        None => {
                            let copy = discover(lua, &child, memo)?;
                            pending.push((child, copy.clone()));
                            copy
                        }
                    };
                    LuaValue::Table(copy)
                }
                other => other,
            };
            into.raw_set(key, value)?;
        }
    }

    Ok(root)
}

/// Create the empty copy for `source` and register it, so later references and cycles
/// back to `source` resolve to it before it is filled.
fn discover(lua: &Lua, source: &LuaTable, memo: &mut CopyMemo) -> LuaResult<LuaTable> {
    let copy = lua.create_table()?;
    memo.insert(source, copy.clone());
    Ok(copy)
}

/// `table.copy(t)` for scripts.
pub(crate) fn create_copy_function(lua: &Lua) -> LuaResult<LuaFunction> {
    lua.create_function(|lua, args: LuaMultiValue| {
        let args = Args::new("copy", args);
        match args.value(0) {
            LuaValue::Table(source) => deep_copy(lua, &source),
            _ => Err(args.mismatch(0, "table")),
        }
    })
}

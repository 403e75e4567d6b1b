use mlua::prelude::*;

/// Merge `functions` into the library table `name`, creating the table when missing.
///
/// The table is published both as a global and in `package.loaded`, so `require(name)`
/// returns the same table scripts see globally.
pub(crate) fn extend_library(
    lua: &Lua,
    name: &str,
    functions: Vec<(&'static str, LuaFunction)>,
) -> LuaResult<LuaTable> {
    let globals = lua.globals();
    let library = match globals.get::<LuaValue>(name)? {
        LuaValue::Table(existing) => existing,
        _ => lua.create_table()?,
    };

    for (function_name, function) in functions {
        library.set(function_name, function)?;
    }

    globals.set(name, library.clone())?;
    let package: LuaTable = globals.get("package")?;
    let loaded: LuaTable = package.get("loaded")?;
    loaded.set(name, library.clone())?;

    tracing::debug!(library = name, "extended library");
    Ok(library)
}

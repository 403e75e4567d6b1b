use mlua::prelude::*;

/// Render values the way the engine's own `tostring` does.
pub fn display_values(lua: &Lua, values: LuaMultiValue) -> LuaResult<Vec<String>> {
    let tostring: LuaFunction = lua.globals().get("tostring")?;
    values
        .into_iter()
        .map(|value| {
            let text: LuaString = tostring.call(value)?;
            Ok(text.to_string_lossy().to_string())
        })
        .collect()
}

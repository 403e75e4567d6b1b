//! Extra `string` library functions and the string-scalar `__index` / `__add` hooks.
//!
//! Character offsets taken by these functions are 0-based.

use mlua::prelude::*;

use crate::lua::{func::Args, module};

pub(crate) fn open_string_library_extensions(lua: &Lua) -> LuaResult<()> {
    let functions = vec![
        ("split", lua.create_function(split)?),
        ("contains", lua.create_function(contains)?),
        ("startsWith", lua.create_function(starts_with)?),
        ("endsWith", lua.create_function(ends_with)?),
        ("insert", lua.create_function(insert)?),
        ("padLeft", lua.create_function(pad_left)?),
        ("padRight", lua.create_function(pad_right)?),
        ("toTable", lua.create_function(to_table)?),
        ("remove", lua.create_function(remove)?),
        ("trim", lua.create_function(trim)?),
        ("trimStart", lua.create_function(trim_start)?),
        ("trimEnd", lua.create_function(trim_end)?),
    ];
    let string = module::extend_library(lua, "string", functions)?;
    install_scalar_hooks(lua, &string)
}

/// Override the metatable every string shares.
///
/// Indexing with a key that `tonumber` accepts yields the character at that 1-based
/// position; any other key is looked up in the string library. `+` concatenates the
/// `tostring` of the other operand.
fn install_scalar_hooks(lua: &Lua, string: &LuaTable) -> LuaResult<()> {
    let globals = lua.globals();
    let getmetatable: LuaFunction = globals.get("getmetatable")?;
    let metatable: LuaTable = getmetatable.call("")?;
    let tonumber: LuaFunction = globals.get("tonumber")?;
    let tostring: LuaFunction = globals.get("tostring")?;
    let sub: LuaFunction = string.get("sub")?;
    let library = string.clone();

    let index = lua.create_function(move |_, (this, key): (LuaString, LuaValue)| {
        match tonumber.call::<LuaValue>(key.clone())? {
            position @ (LuaValue::Integer(_) | LuaValue::Number(_)) => {
                sub.call::<LuaValue>((this, position.clone(), position))
            }
            _ => library.raw_get::<LuaValue>(key),
        }
    })?;

    let add = lua.create_function(move |lua, (lhs, rhs): (LuaValue, LuaValue)| {
        let (left, right) = match (&lhs, &rhs) {
            (LuaValue::String(left), _) => (left.clone(), tostring.call::<LuaString>(rhs.clone())?),
            (_, LuaValue::String(right)) => (tostring.call::<LuaString>(lhs.clone())?, right.clone()),
            _ => {
                return Err(LuaError::runtime(format!(
                    "attempt to perform arithmetic on a {} value",
                    lhs.type_name()
                )));
            }
        };
        let mut bytes = left.as_bytes().to_vec();
        bytes.extend_from_slice(&right.as_bytes());
        lua.create_string(bytes)
    })?;

    metatable.set("__index", index)?;
    metatable.set("__add", add)?;
    tracing::debug!("installed string scalar hooks");
    Ok(())
}

fn split(lua: &Lua, args: LuaMultiValue) -> LuaResult<LuaTable> {
    let args = Args::new("split", args);
    let this = args.string(0)?;
    let separator = args.string(1)?;
    if separator.is_empty() {
        return lua.create_sequence_from([this]);
    }
    lua.create_sequence_from(this.split(separator.as_str()))
}

fn contains(_: &Lua, args: LuaMultiValue) -> LuaResult<bool> {
    let args = Args::new("contains", args);
    Ok(args.string(0)?.contains(args.string(1)?.as_str()))
}

fn starts_with(_: &Lua, args: LuaMultiValue) -> LuaResult<bool> {
    let args = Args::new("startsWith", args);
    Ok(args.string(0)?.starts_with(args.string(1)?.as_str()))
}

fn ends_with(_: &Lua, args: LuaMultiValue) -> LuaResult<bool> {
    let args = Args::new("endsWith", args);
    Ok(args.string(0)?.ends_with(args.string(1)?.as_str()))
}

/// Validate a 0-based character offset against `len`.
fn offset(args: &Args, index: usize, len: usize) -> LuaResult<usize> {
    let value = args.integer(index)?;
    match usize::try_from(value) {
        Ok(offset) if offset <= len => Ok(offset),
        _ => Err(args.out_of_range(index, format!("offset {} outside 0..{}", value, len))),
    }
}

fn insert(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    let args = Args::new("insert", args);
    let chars: Vec<char> = args.string(0)?.chars().collect();
    let at = offset(&args, 1, chars.len())?;
    let value = args.string(2)?;

    let mut result: String = chars[..at].iter().collect();
    result.push_str(&value);
    result.extend(&chars[at..]);
    Ok(result)
}

fn pad(args: &Args, left: bool) -> LuaResult<String> {
    let this = args.string(0)?;
    let width = args.integer(1)?;
    let Ok(width) = usize::try_from(width) else {
        return Err(args.out_of_range(1, "width must not be negative"));
    };
    let fill = args.optional_char(2)?.unwrap_or(' ');

    let missing = width.saturating_sub(this.chars().count());
    let padding: String = std::iter::repeat_n(fill, missing).collect();
    Ok(if left {
        padding + &this
    } else {
        this + &padding
    })
}

fn pad_left(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    pad(&Args::new("padLeft", args), true)
}

fn pad_right(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    pad(&Args::new("padRight", args), false)
}

fn to_table(lua: &Lua, args: LuaMultiValue) -> LuaResult<LuaTable> {
    let args = Args::new("toTable", args);
    lua.create_sequence_from(args.string(0)?.chars().map(String::from))
}

fn remove(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    let args = Args::new("remove", args);
    let chars: Vec<char> = args.string(0)?.chars().collect();
    let start = offset(&args, 1, chars.len())?;
    let end = if args.has(2) {
        start + offset(&args, 2, chars.len() - start)?
    } else {
        chars.len()
    };

    Ok(chars[..start].iter().chain(&chars[end..]).collect())
}

#[derive(Clone, Copy)]
enum TrimSide {
    Both,
    Start,
    End,
}

/// Trim the given characters, or whitespace when none are passed.
fn trim_with(args: &Args, side: TrimSide) -> LuaResult<String> {
    let this = args.string(0)?;
    let chars = args.chars_from(1)?;
    let matches = |c: char| {
        if chars.is_empty() {
            c.is_whitespace()
        } else {
            chars.contains(&c)
        }
    };

    let trimmed = match side {
        TrimSide::Both => this.trim_matches(matches),
        TrimSide::Start => this.trim_start_matches(matches),
        TrimSide::End => this.trim_end_matches(matches),
    };
    Ok(trimmed.to_string())
}

fn trim(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    trim_with(&Args::new("trim", args), TrimSide::Both)
}

fn trim_start(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    trim_with(&Args::new("trimStart", args), TrimSide::Start)
}

fn trim_end(_: &Lua, args: LuaMultiValue) -> LuaResult<String> {
    trim_with(&Args::new("trimEnd", args), TrimSide::End)
}

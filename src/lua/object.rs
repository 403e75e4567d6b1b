//! Instance hooks.
//!
//! Instances resolve members from their own fields first and their class-shape copy
//! second, unless the class body supplies `__index` / `__newindex`, in which case those
//! receive the instance's field table as an extra argument.

use mlua::prelude::*;

use crate::{
    lua::{
        check_cancelled,
        class::{ClassObject, HookSet, key_name, snapshot},
    },
    shared::error::ObjectError,
};

pub(crate) static INSTANCE_HOOKS: HookSet = HookSet {
    index: index_instance,
    new_index: new_index_instance,
    call: call_instance,
    to_string: to_string_instance,
};

const BINARY_OPERATORS: [(LuaMetaMethod, &str); 11] = [
    (LuaMetaMethod::Add, "__add"),
    (LuaMetaMethod::Sub, "__sub"),
    (LuaMetaMethod::Mul, "__mul"),
    (LuaMetaMethod::Div, "__div"),
    (LuaMetaMethod::Mod, "__mod"),
    (LuaMetaMethod::Pow, "__pow"),
    (LuaMetaMethod::IDiv, "__idiv"),
    (LuaMetaMethod::Concat, "__concat"),
    (LuaMetaMethod::Eq, "__eq"),
    (LuaMetaMethod::Lt, "__lt"),
    (LuaMetaMethod::Le, "__le"),
];

const UNARY_OPERATORS: [(LuaMetaMethod, &str); 2] =
    [(LuaMetaMethod::Unm, "__unm"), (LuaMetaMethod::Len, "__len")];

fn fields_of(object: &ClassObject) -> LuaResult<LuaTable> {
    object
        .fields()
        .cloned()
        .ok_or_else(|| LuaError::runtime(format!("Class<{}> has no instance fields", object.name())))
}

fn index_instance(lua: &Lua, ud: &LuaAnyUserData, key: LuaValue) -> LuaResult<LuaValue> {
    check_cancelled(lua)?;
    let object = snapshot(ud)?;
    if key_name(&key).as_deref() == Some("name") {
        return object.name().into_lua(lua);
    }

    let fields = fields_of(&object)?;
    match object.table().raw_get::<LuaValue>("__index")? {
        LuaValue::Function(hook) => return hook.call::<LuaValue>((ud.clone(), key, fields)),
        LuaValue::Table(proxy) => return proxy.get::<LuaValue>(key),
        _ => {}
    }

    let value = fields.raw_get::<LuaValue>(key.clone())?;
    if !value.is_nil() {
        return Ok(value);
    }
    object.table().raw_get::<LuaValue>(key)
}

fn new_index_instance(
    lua: &Lua,
    ud: &LuaAnyUserData,
    key: LuaValue,
    value: LuaValue,
) -> LuaResult<()> {
    check_cancelled(lua)?;
    let object = snapshot(ud)?;
    if let Some(member @ ("name" | "new")) = key_name(&key).as_deref() {
        return Err(ObjectError::ImmutableMember {
            member: member.to_string(),
        }
        .into());
    }

    let fields = fields_of(&object)?;
    match object.table().raw_get::<LuaValue>("__newindex")? {
        LuaValue::Function(hook) => hook.call::<()>((ud.clone(), key, value, fields)),
        LuaValue::Table(proxy) => proxy.set(key, value),
        _ => fields.raw_set(key, value),
    }
}

fn call_instance(lua: &Lua, ud: &LuaAnyUserData, args: LuaMultiValue) -> LuaResult<LuaMultiValue> {
    check_cancelled(lua)?;
    let object = snapshot(ud)?;
    match object.table().raw_get::<LuaValue>("__call")? {
        LuaValue::Function(hook) => {
            let mut call_args = vec![LuaValue::UserData(ud.clone())];
            call_args.extend(args);
            hook.call::<LuaMultiValue>(call_args.into_iter().collect::<LuaMultiValue>())
        }
        _ => Err(ObjectError::ConstructionOnInstance {
            class: object.name().to_string(),
        }
        .into()),
    }
}

fn to_string_instance(lua: &Lua, ud: &LuaAnyUserData) -> LuaResult<LuaValue> {
    let object = snapshot(ud)?;
    match object.table().raw_get::<LuaValue>("__tostring")? {
        LuaValue::Function(hook) => hook.call::<LuaValue>(ud.clone()),
        _ => format!("{}<>", object.name()).into_lua(lua),
    }
}

/// Forward arithmetic, comparison, concatenation and length to the class body.
pub(crate) fn add_operator_methods<M: LuaUserDataMethods<ClassObject>>(methods: &mut M) {
    for (method, event) in BINARY_OPERATORS {
        methods.add_meta_function(method, move |_, (lhs, rhs): (LuaValue, LuaValue)| {
            forward_binary(event, lhs, rhs)
        });
    }
    for (method, event) in UNARY_OPERATORS {
        methods.add_meta_function(method, move |_, operand: LuaValue| forward_unary(event, operand));
    }
}

/// The class body's handler for `event`, when `value` is an instance that defines one.
fn instance_handler(value: &LuaValue, event: &str) -> LuaResult<Option<LuaFunction>> {
    let LuaValue::UserData(ud) = value else {
        return Ok(None);
    };
    let Ok(object) = ud.borrow::<ClassObject>() else {
        return Ok(None);
    };
    if !object.is_instance() {
        return Ok(None);
    }

    match object.table().raw_get::<LuaValue>(event)? {
        LuaValue::Function(handler) => Ok(Some(handler)),
        _ => Ok(None),
    }
}

fn forward_binary(event: &str, lhs: LuaValue, rhs: LuaValue) -> LuaResult<LuaValue> {
    for operand in [&lhs, &rhs] {
        if let Some(handler) = instance_handler(operand, event)? {
            return handler.call::<LuaValue>((lhs.clone(), rhs.clone()));
        }
    }

    // Reached only for operands that are not raw-equal.
    if event == "__eq" {
        return Ok(LuaValue::Boolean(false));
    }
    Err(LuaError::runtime(format!(
        "attempt to perform '{}' on a {} value and a {} value",
        event,
        lhs.type_name(),
        rhs.type_name()
    )))
}

fn forward_unary(event: &str, operand: LuaValue) -> LuaResult<LuaValue> {
    match instance_handler(&operand, event)? {
        Some(handler) => handler.call::<LuaValue>((operand.clone(), operand)),
        None => Err(LuaError::runtime(format!(
            "attempt to perform '{}' on a {} value",
            event,
            operand.type_name()
        ))),
    }
}

//! Class objects: declaration, construction, and the class-definition hooks.
//!
//! A single `UserData` type backs both class definitions and live instances. Which
//! behaviour a value gets is decided by the [`HookSet`] its kind selects, so the engine
//! only ever sees one metatable per engine for class objects.

use std::cell::Cell;

use mlua::prelude::*;

use crate::{
    lua::{check_cancelled, func::Args, object, table::deep_copy},
    shared::error::ObjectError,
};

type IndexHook = fn(&Lua, &LuaAnyUserData, LuaValue) -> LuaResult<LuaValue>;
type NewIndexHook = fn(&Lua, &LuaAnyUserData, LuaValue, LuaValue) -> LuaResult<()>;
type CallHook = fn(&Lua, &LuaAnyUserData, LuaMultiValue) -> LuaResult<LuaMultiValue>;
type ToStringHook = fn(&Lua, &LuaAnyUserData) -> LuaResult<LuaValue>;

/// Read, write, call and stringify handlers for one kind of class object.
pub(crate) struct HookSet {
    pub index: IndexHook,
    pub new_index: NewIndexHook,
    pub call: CallHook,
    pub to_string: ToStringHook,
}

static DEFINITION_HOOKS: HookSet = HookSet {
    index: index_definition,
    new_index: new_index_definition,
    call: call_definition,
    to_string: to_string_definition,
};

#[derive(Clone)]
enum ClassKind {
    Definition { locked: Cell<bool> },
    /// `fields` holds the instance's own assignments.
    Instance { fields: LuaTable },
}

/// A class definition or an instance of one.
#[derive(Clone)]
pub struct ClassObject {
    name: String,
    base: Option<LuaAnyUserData>,
    /// Shared members for a definition, the private class-shape copy for an instance.
    table: LuaTable,
    kind: ClassKind,
}

impl ClassObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&LuaAnyUserData> {
        self.base.as_ref()
    }

    pub fn is_instance(&self) -> bool {
        matches!(self.kind, ClassKind::Instance { .. })
    }

    /// Always false for instances.
    pub fn is_locked(&self) -> bool {
        match &self.kind {
            ClassKind::Definition { locked } => locked.get(),
            ClassKind::Instance { .. } => false,
        }
    }

    pub(crate) fn table(&self) -> &LuaTable {
        &self.table
    }

    pub(crate) fn fields(&self) -> Option<&LuaTable> {
        match &self.kind {
            ClassKind::Definition { .. } => None,
            ClassKind::Instance { fields } => Some(fields),
        }
    }

    fn lock(&self) {
        if let ClassKind::Definition { locked } = &self.kind {
            locked.set(true);
        }
    }

    fn hooks(&self) -> &'static HookSet {
        match self.kind {
            ClassKind::Definition { .. } => &DEFINITION_HOOKS,
            ClassKind::Instance { .. } => &object::INSTANCE_HOOKS,
        }
    }

    /// Own member, else the nearest base class's.
    pub(crate) fn lookup(&self, key: &LuaValue) -> LuaResult<LuaValue> {
        let mut table = self.table.clone();
        let mut base = self.base.clone();
        loop {
            let value = table.raw_get::<LuaValue>(key.clone())?;
            match (value, base) {
                (LuaValue::Nil, Some(next)) => {
                    let class = snapshot(&next)?;
                    table = class.table;
                    base = class.base;
                }
                (value, _) => return Ok(value),
            }
        }
    }

    /// Every member visible through the chain, derived classes overriding their bases.
    fn resolved_table(&self, lua: &Lua) -> LuaResult<LuaTable> {
        let Some(mut next) = self.base.clone() else {
            return Ok(self.table.clone());
        };

        let mut chain = vec![self.table.clone()];
        loop {
            let class = snapshot(&next)?;
            chain.push(class.table);
            match class.base {
                Some(base) => next = base,
                None => break,
            }
        }

        let merged = lua.create_table()?;
        for source in chain.iter().rev() {
            for pair in source.pairs::<LuaValue, LuaValue>() {
                let (key, value) = pair?;
                merged.raw_set(key, value)?;
            }
        }
        Ok(merged)
    }
}

impl LuaUserData for ClassObject {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_function(
            LuaMetaMethod::Index,
            |lua, (ud, key): (LuaAnyUserData, LuaValue)| (hooks_of(&ud)?.index)(lua, &ud, key),
        );
        methods.add_meta_function(
            LuaMetaMethod::NewIndex,
            |lua, (ud, key, value): (LuaAnyUserData, LuaValue, LuaValue)| {
                (hooks_of(&ud)?.new_index)(lua, &ud, key, value)
            },
        );
        methods.add_meta_function(
            LuaMetaMethod::Call,
            |lua, (ud, args): (LuaAnyUserData, LuaMultiValue)| (hooks_of(&ud)?.call)(lua, &ud, args),
        );
        methods.add_meta_function(LuaMetaMethod::ToString, |lua, ud: LuaAnyUserData| {
            (hooks_of(&ud)?.to_string)(lua, &ud)
        });

        object::add_operator_methods(methods);
    }
}

fn hooks_of(ud: &LuaAnyUserData) -> LuaResult<&'static HookSet> {
    Ok(ud.borrow::<ClassObject>()?.hooks())
}

/// Copy of the class object behind `ud`, so no borrow is held while scripts run.
pub(crate) fn snapshot(ud: &LuaAnyUserData) -> LuaResult<ClassObject> {
    Ok(ud.borrow::<ClassObject>()?.clone())
}

/// The key as text when it is a UTF-8 string.
pub(crate) fn key_name(key: &LuaValue) -> Option<String> {
    match key {
        LuaValue::String(s) => s.to_str().ok().map(|s| s.to_string()),
        _ => None,
    }
}

/// Create a class definition.
pub fn declare(lua: &Lua, name: &str, base: Option<LuaAnyUserData>) -> LuaResult<LuaAnyUserData> {
    let table = lua.create_table()?;
    // Derived classes pick this up through their root.
    if base.is_none() {
        table.raw_set("__tostring", lua.create_function(default_instance_to_string)?)?;
    }

    tracing::debug!(class = name, derived = base.is_some(), "declared class");
    lua.create_userdata(ClassObject {
        name: name.to_string(),
        base,
        table,
        kind: ClassKind::Definition {
            locked: Cell::new(false),
        },
    })
}

fn default_instance_to_string(_: &Lua, ud: LuaAnyUserData) -> LuaResult<String> {
    Ok(format!("{}<>", ud.borrow::<ClassObject>()?.name))
}

/// Build an instance of the class behind `class_ud` and run its initializer.
///
/// The instance is not reachable from anywhere until its class shape has been copied.
pub fn construct(
    lua: &Lua,
    class_ud: &LuaAnyUserData,
    args: LuaMultiValue,
) -> LuaResult<LuaAnyUserData> {
    check_cancelled(lua)?;
    let class = snapshot(class_ud)?;
    if class.is_instance() {
        return Err(ObjectError::ConstructionOnInstance { class: class.name }.into());
    }

    let table = deep_copy(lua, &class.resolved_table(lua)?)?;
    check_cancelled(lua)?;

    let initializer = match table.raw_get::<LuaValue>("initialize")? {
        LuaValue::Nil => table.raw_get::<LuaValue>("init")?,
        found => found,
    };

    let instance = lua.create_userdata(ClassObject {
        name: class.name.clone(),
        base: class.base.clone(),
        table,
        kind: ClassKind::Instance {
            fields: lua.create_table()?,
        },
    })?;
    tracing::debug!(class = %class.name, "constructed instance");

    match initializer {
        LuaValue::Nil => {}
        LuaValue::Function(init) => {
            let mut call_args = vec![LuaValue::UserData(instance.clone())];
            call_args.extend(args);
            init.call::<()>(call_args.into_iter().collect::<LuaMultiValue>())?;
        }
        other => {
            return Err(LuaError::runtime(format!(
                "initializer of '{}' must be a function, got {}",
                class.name,
                other.type_name()
            )));
        }
    }

    Ok(instance)
}

fn lock_function(lua: &Lua, ud: &LuaAnyUserData) -> LuaResult<LuaFunction> {
    let class_ud = ud.clone();
    lua.create_function(move |_, _: LuaMultiValue| {
        let class = class_ud.borrow::<ClassObject>()?;
        class.lock();
        tracing::debug!(class = %class.name, "locked class");
        drop(class);
        Ok(class_ud.clone())
    })
}

fn new_function(lua: &Lua, ud: &LuaAnyUserData) -> LuaResult<LuaFunction> {
    let class_ud = ud.clone();
    lua.create_function(move |lua, args: LuaMultiValue| {
        let mut args: Vec<LuaValue> = args.into_iter().collect();
        // `Class:new(...)` passes the class itself first.
        if args.first() == Some(&LuaValue::UserData(class_ud.clone())) {
            args.remove(0);
        }
        construct(lua, &class_ud, args.into_iter().collect())
    })
}

fn index_definition(lua: &Lua, ud: &LuaAnyUserData, key: LuaValue) -> LuaResult<LuaValue> {
    check_cancelled(lua)?;
    let class = snapshot(ud)?;

    match key_name(&key).as_deref() {
        Some("lock") if class.is_locked() => Ok(LuaValue::Nil),
        Some("lock") => Ok(LuaValue::Function(lock_function(lua, ud)?)),
        Some("name") => class.name.into_lua(lua),
        Some("new") => Ok(LuaValue::Function(new_function(lua, ud)?)),
        _ => class.lookup(&key),
    }
}

fn new_index_definition(
    lua: &Lua,
    ud: &LuaAnyUserData,
    key: LuaValue,
    value: LuaValue,
) -> LuaResult<()> {
    check_cancelled(lua)?;
    let class = snapshot(ud)?;

    if key_name(&key).as_deref() == Some("name") {
        return Err(ObjectError::ImmutableMember {
            member: "name".to_string(),
        }
        .into());
    }
    if class.is_locked() {
        return Err(ObjectError::LockedClass { class: class.name }.into());
    }

    class.table.raw_set(key, value)
}

fn call_definition(lua: &Lua, ud: &LuaAnyUserData, args: LuaMultiValue) -> LuaResult<LuaMultiValue> {
    let instance = construct(lua, ud, args)?;
    Ok(LuaMultiValue::from_iter([LuaValue::UserData(instance)]))
}

fn to_string_definition(lua: &Lua, ud: &LuaAnyUserData) -> LuaResult<LuaValue> {
    format!("Class<{}>", snapshot(ud)?.name).into_lua(lua)
}

/// Install the global `class(name, base?)` function.
pub(crate) fn open_class_library(lua: &Lua) -> LuaResult<()> {
    let class = lua.create_function(|lua, args: LuaMultiValue| {
        let args = Args::new("class", args);
        let name = args.string(0)?;
        let base = args.optional_class(1)?;
        declare(lua, &name, base)
    })?;
    lua.globals().set("class", class)
}

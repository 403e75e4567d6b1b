use mlua::prelude::*;

use crate::lua::{func::Args, module};

/// Below this magnitude `normalized` yields the zero vector.
const NORMALIZE_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let magnitude = self.magnitude();
        if magnitude < NORMALIZE_EPSILON {
            return Self::default();
        }
        Self::new(self.x / magnitude, self.y / magnitude, self.z / magnitude)
    }
}

impl LuaUserData for Vector3 {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.x));
        fields.add_field_method_get("y", |_, this| Ok(this.y));
        fields.add_field_method_get("z", |_, this| Ok(this.z));
        fields.add_field_method_set("x", |_, this, value: f32| {
            this.x = value;
            Ok(())
        });
        fields.add_field_method_set("y", |_, this, value: f32| {
            this.y = value;
            Ok(())
        });
        fields.add_field_method_set("z", |_, this, value: f32| {
            this.z = value;
            Ok(())
        });
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("normalized", |_, this, ()| Ok(this.normalized()));

        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("({}, {}, {})", this.x, this.y, this.z))
        });

        methods.add_meta_method(
            LuaMetaMethod::Eq,
            |_, this, other: LuaUserDataRef<Vector3>| Ok(*this == *other),
        );
    }
}

/// Install the global `Vector3` table with its `create` constructor.
pub(crate) fn open_vector_library(lua: &Lua) -> LuaResult<()> {
    let create = lua.create_function(|_, args: LuaMultiValue| {
        let args = Args::new("create", args);
        Ok(Vector3::new(
            args.number(0)? as f32,
            args.number(1)? as f32,
            args.number(2)? as f32,
        ))
    })?;
    module::extend_library(lua, "Vector3", vec![("create", create)])?;
    Ok(())
}

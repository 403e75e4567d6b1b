use mlua::prelude::*;

use crate::{lua::class::ClassObject, shared::error::ObjectError};

/// Arguments handed to a native callback, tagged with the callback's script-facing name.
///
/// Indexes are 0-based here and reported 1-based in errors.
pub(crate) struct Args {
    function: &'static str,
    values: Vec<LuaValue>,
}

impl Args {
    pub fn new(function: &'static str, values: LuaMultiValue) -> Self {
        Self {
            function,
            values: values.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn has(&self, index: usize) -> bool {
        self.values
            .get(index)
            .is_some_and(|value| !value.is_nil())
    }

    pub fn value(&self, index: usize) -> LuaValue {
        self.values.get(index).cloned().unwrap_or(LuaValue::Nil)
    }

    pub fn mismatch(&self, index: usize, expected: &str) -> LuaError {
        ObjectError::ArgumentType {
            index: index + 1,
            function: self.function.to_string(),
            expected: expected.to_string(),
            actual: self.value(index).type_name().to_string(),
        }
        .into_lua()
    }

    pub fn out_of_range(&self, index: usize, reason: impl Into<String>) -> LuaError {
        ObjectError::ArgumentRange {
            index: index + 1,
            function: self.function.to_string(),
            reason: reason.into(),
        }
        .into_lua()
    }

    pub fn string(&self, index: usize) -> LuaResult<String> {
        match self.values.get(index) {
            Some(LuaValue::String(s)) => Ok(s.to_string_lossy().to_string()),
            _ => Err(self.mismatch(index, "string")),
        }
    }

    pub fn integer(&self, index: usize) -> LuaResult<i64> {
        match self.values.get(index) {
            Some(LuaValue::Integer(i)) => Ok(*i),
            Some(LuaValue::Number(n)) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
            _ => Err(self.mismatch(index, "number")),
        }
    }

    pub fn number(&self, index: usize) -> LuaResult<f64> {
        match self.values.get(index) {
            Some(LuaValue::Integer(i)) => Ok(*i as f64),
            Some(LuaValue::Number(n)) => Ok(*n),
            _ => Err(self.mismatch(index, "number")),
        }
    }

    /// A single-character string, if the argument is present.
    pub fn optional_char(&self, index: usize) -> LuaResult<Option<char>> {
        if !self.has(index) {
            return Ok(None);
        }
        let value = self.string(index)?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Some(c)),
            _ => Err(ObjectError::ArgumentType {
                index: index + 1,
                function: self.function.to_string(),
                expected: "char".to_string(),
                actual: "string".to_string(),
            }
            .into_lua()),
        }
    }

    /// Every argument from `start` on as single characters.
    pub fn chars_from(&self, start: usize) -> LuaResult<Vec<char>> {
        (start..self.len())
            .map(|index| {
                self.optional_char(index)?
                    .ok_or_else(|| self.mismatch(index, "string"))
            })
            .collect()
    }

    /// A class definition, if the argument is present.
    pub fn optional_class(&self, index: usize) -> LuaResult<Option<LuaAnyUserData>> {
        match self.values.get(index) {
            None | Some(LuaValue::Nil) => Ok(None),
            Some(LuaValue::UserData(ud)) => match ud.borrow::<ClassObject>() {
                Ok(class) if !class.is_instance() => Ok(Some(ud.clone())),
                Ok(_) => Err(ObjectError::ArgumentType {
                    index: index + 1,
                    function: self.function.to_string(),
                    expected: "class".to_string(),
                    actual: "instance".to_string(),
                }
                .into_lua()),
                Err(_) => Err(self.mismatch(index, "class")),
            },
            Some(_) => Err(self.mismatch(index, "class")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(lua: &Lua, code: &str) -> Args {
        let values: LuaMultiValue = lua.load(code).eval().unwrap();
        Args::new("probe", values)
    }

    #[test]
    fn reports_one_based_index_and_types() {
        let lua = Lua::new();
        let args = args(&lua, "return 'a', 2");
        let err = args.string(1).unwrap_err();
        let object = crate::shared::error::find_object_error(&err).cloned();
        assert_eq!(
            object,
            Some(ObjectError::ArgumentType {
                index: 2,
                function: "probe".to_string(),
                expected: "string".to_string(),
                actual: "integer".to_string(),
            })
        );
    }

    #[test]
    fn integral_floats_count_as_integers() {
        let lua = Lua::new();
        let args = args(&lua, "return 3.0, 3.5");
        assert_eq!(args.integer(0).unwrap(), 3);
        assert!(args.integer(1).is_err());
    }

    #[test]
    fn char_arguments_must_be_one_character() {
        let lua = Lua::new();
        let args = args(&lua, "return 'x', 'xy'");
        assert_eq!(args.optional_char(0).unwrap(), Some('x'));
        assert_eq!(args.optional_char(2).unwrap(), None);
        assert!(args.optional_char(1).is_err());
        assert!(args.chars_from(0).is_err());
    }
}

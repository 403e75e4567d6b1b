#[cfg(test)]
mod tests {
    use std::{
        ffi::{CStr, CString},
        io::Write,
        ptr, thread,
        time::Duration,
    };

    use luaclass::*;
    use mlua::prelude::*;

    fn engine() -> LuaScripting {
        LuaScripting::new(EngineConfig::default()).unwrap()
    }

    fn eval(code: &str) -> Vec<String> {
        engine().run_source(code).unwrap()
    }

    #[test]
    fn test_construct_three_ways() {
        let results = eval(
            r#"
            local Animal = class("Animal")
            function Animal:initialize(sound) self.sound = sound end
            local a = Animal.new("moo")
            local b = Animal:new("woof")
            local c = Animal("baa")
            return a.sound, b.sound, c.sound
            "#,
        );
        assert_eq!(results, vec!["moo", "woof", "baa"]);
    }

    #[test]
    fn test_init_is_fallback_initializer() {
        let results = eval(
            r#"
            local Counter = class("Counter")
            function Counter:init(start) self.value = start end
            return Counter.new(41).value + 1
            "#,
        );
        assert_eq!(results, vec!["42"]);
    }

    #[test]
    fn test_tostring() {
        let results = eval(
            r#"
            local Animal = class("Animal")
            local Cat = class("Cat")
            function Cat:__tostring() return "Cat(" .. self.petName .. ")" end
            local cat = Cat.new()
            cat.petName = "Tom"
            return Animal, Animal.new(), tostring(cat), Animal.name
            "#,
        );
        assert_eq!(results, vec!["Class<Animal>", "Animal<>", "Cat(Tom)", "Animal"]);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let results = eval(
            r#"
            local Bag = class("Bag")
            Bag.items = {}
            local a, b = Bag.new(), Bag.new()
            table.insert(a.items, "apple")
            return #a.items, #b.items, #Bag.items
            "#,
        );
        assert_eq!(results, vec!["1", "0", "0"]);
    }

    #[test]
    fn test_lock() {
        let results = eval(
            r#"
            local A = class("A")
            local before = A.new()
            A.lock()
            before.x = 1
            local ok, err = pcall(function() A.y = 2 end)
            return tostring(A.lock), ok, string.find(tostring(err), "Class<A> is locked", 1, true) ~= nil, before.x
            "#,
        );
        assert_eq!(results, vec!["nil", "false", "true", "1"]);

        let err = engine()
            .run_source("local A = class('A') A:lock() A.x = 1")
            .unwrap_err();
        assert_eq!(
            err.object_error(),
            Some(&ObjectError::LockedClass {
                class: "A".to_string()
            })
        );
    }

    #[test]
    fn test_immutable_members() {
        let engine = engine();
        let err = engine
            .run_source("local A = class('A') A.name = 'B'")
            .unwrap_err();
        assert_eq!(
            err.object_error(),
            Some(&ObjectError::ImmutableMember {
                member: "name".to_string()
            })
        );

        let err = engine
            .run_source("local A = class('A') local a = A.new() a.new = 1")
            .unwrap_err();
        assert_eq!(
            err.object_error(),
            Some(&ObjectError::ImmutableMember {
                member: "new".to_string()
            })
        );

        let results = engine
            .run_source(
                r#"
                local A = class("A")
                local ok, err = pcall(function() A.new().name = "x" end)
                return ok, string.find(tostring(err), "'name' cannot overwrite.", 1, true) ~= nil
                "#,
            )
            .unwrap();
        assert_eq!(results, vec!["false", "true"]);
    }

    #[test]
    fn test_calling_instance_without_call_member() {
        let err = engine()
            .run_source("local A = class('A') local a = A.new() a()")
            .unwrap_err();
        assert_eq!(
            err.object_error(),
            Some(&ObjectError::ConstructionOnInstance {
                class: "A".to_string()
            })
        );
    }

    #[test]
    fn test_instance_call_member() {
        let results = eval(
            r#"
            local Adder = class("Adder")
            function Adder:initialize(n) self.n = n end
            function Adder:__call(x) return self.n + x end
            return Adder.new(10)(5)
            "#,
        );
        assert_eq!(results, vec!["15"]);
    }

    #[test]
    fn test_class_argument_checks() {
        let engine = engine();
        let err = engine.run_source("class()").unwrap_err();
        assert_eq!(
            err.object_error(),
            Some(&ObjectError::ArgumentType {
                index: 1,
                function: "class".to_string(),
                expected: "string".to_string(),
                actual: "nil".to_string(),
            })
        );

        let err = engine
            .run_source("local A = class('A') class('B', A.new())")
            .unwrap_err();
        assert_eq!(
            err.object_error(),
            Some(&ObjectError::ArgumentType {
                index: 2,
                function: "class".to_string(),
                expected: "class".to_string(),
                actual: "instance".to_string(),
            })
        );

        let err = engine.run_source("class('B', 5)").unwrap_err();
        assert!(matches!(
            err.object_error(),
            Some(ObjectError::ArgumentType { expected, .. }) if expected == "class"
        ));
    }

    #[test]
    fn test_non_function_initializer() {
        let err = engine()
            .run_source("local A = class('A') A.initialize = 5 A.new()")
            .unwrap_err();
        assert!(err.to_string().contains("must be a function"));
    }

    #[test]
    fn test_initializer_error_propagates() {
        let results = eval(
            r#"
            local A = class("A")
            function A:initialize() error("boom") end
            local outcome = table.pack(pcall(function() return A.new() end))
            return outcome.n, outcome[1], string.find(tostring(outcome[2]), "boom", 1, true) ~= nil
            "#,
        );
        assert_eq!(results, vec!["2", "false", "true"]);

        let err = engine()
            .run_source("local A = class('A') function A:initialize() error('boom') end A.new()")
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_inheritance() {
        let results = eval(
            r#"
            local Animal = class("Animal")
            function Animal:initialize(petName) self.petName = petName end
            function Animal:speak() return "..." end
            function Animal:describe() return "animal " .. self.petName end

            local Dog = class("Dog", Animal)
            function Dog:speak() return self.petName .. " says woof" end

            local d = Dog.new("Rex")
            return d:speak(), d:describe(), tostring(d), d.name, Dog.initialize == Animal.initialize, Animal.new("Tom"):speak()
            "#,
        );
        assert_eq!(
            results,
            vec!["Rex says woof", "animal Rex", "Dog<>", "Dog", "true", "..."]
        );
    }

    #[test]
    fn test_base_changes_after_derive_are_visible_on_definition() {
        let results = eval(
            r#"
            local Base = class("Base")
            local Derived = class("Derived", Base)
            function Base:greet() return "hi" end
            return Derived.greet ~= nil, Derived.new():greet()
            "#,
        );
        assert_eq!(results, vec!["true", "hi"]);
    }

    #[test]
    fn test_long_inheritance_chain() {
        let results = eval(
            r#"
            local Root = class("Root")
            function Root:greet() return "hi " .. self.name end
            local C = Root
            for i = 1, 20000 do C = class("C" .. i, C) end
            local ok, missing = pcall(function() return C.missing end)
            return ok, missing == nil, C.greet == Root.greet, C.new():greet()
            "#,
        );
        assert_eq!(results, vec!["true", "true", "true", "hi C20000"]);
    }

    #[test]
    fn test_host_inspects_class_objects() {
        let engine = engine();
        engine.lua().globals().set("greeting", "hello").unwrap();
        engine
            .run_source("Animal = class('Animal') Dog = class('Dog', Animal) pet = Dog.new()")
            .unwrap();

        let dog: LuaAnyUserData = engine.lua().globals().get("Dog").unwrap();
        let dog = dog.borrow::<ClassObject>().unwrap();
        assert_eq!(dog.name(), "Dog");
        assert!(!dog.is_instance());
        assert!(!dog.is_locked());

        let animal = dog.base().unwrap().borrow::<ClassObject>().unwrap();
        assert_eq!(animal.name(), "Animal");
        assert!(animal.base().is_none());

        let pet: LuaAnyUserData = engine.lua().globals().get("pet").unwrap();
        assert!(pet.borrow::<ClassObject>().unwrap().is_instance());

        assert_eq!(
            engine.run_source("return greeting:upper()").unwrap(),
            vec!["HELLO"]
        );
    }

    #[test]
    fn test_user_index_hooks() {
        let results = eval(
            r#"
            local Point = class("Point")
            function Point.__index(self, key, fields)
                if key == "double" then return fields.x * 2 end
                return fields[key]
            end
            function Point.__newindex(self, key, value, fields)
                rawset(fields, key, value * 2)
            end
            local p = Point.new()
            p.x = 1
            local first = p.x
            local doubled = p.double
            p.x = 3
            return first, doubled, p.x
            "#,
        );
        assert_eq!(results, vec!["2", "4", "6"]);
    }

    #[test]
    fn test_operator_forwarding() {
        let results = eval(
            r#"
            local V = class("V")
            function V:initialize(n) self.n = n end
            function V.__add(a, b) return a.n + b.n end
            function V.__eq(a, b) return a.n == b.n end
            function V.__lt(a, b) return a.n < b.n end
            function V.__len(a) return a.n end
            local a, b, c = V.new(1), V.new(2), V.new(1)
            return a + b, a == c, a == b, a < b, #b
            "#,
        );
        assert_eq!(results, vec!["3", "true", "false", "true", "2"]);
    }

    #[test]
    fn test_string_scalar_hooks() {
        let results = eval(
            r#"
            local s = "hello"
            return s[2], s["1"], ("abc"):upper(), "x" + 5, 5 + "x", s:len()
            "#,
        );
        assert_eq!(results, vec!["e", "h", "ABC", "x5", "5x", "5"]);
    }

    #[test]
    fn test_string_extensions() {
        let results = eval(
            r#"
            local parts = ("a,b,c"):split(",")
            local whole = ("abc"):split("")
            local chars = ("xyz"):toTable()
            return #parts, parts[3], whole[1], chars[2],
                ("hello"):contains("ell"), ("hello"):startsWith("he"), ("hello"):endsWith("x"),
                ("hello"):insert(0, ">"), ("hello"):insert(5, "!"),
                ("7"):padLeft(3, "0"), ("ab"):padRight(4) .. "|",
                ("hello"):remove(1, 3), ("hello"):remove(2),
                ("  hi  "):trim(), ("xxhixx"):trim("x"), ("xxhixx"):trimStart("x"), ("xxhixx"):trimEnd("x")
            "#,
        );
        assert_eq!(
            results,
            vec![
                "3", "c", "abc", "y", "true", "true", "false", ">hello", "hello!", "007", "ab  |",
                "ho", "he", "hi", "hi", "hixx", "xxhi",
            ]
        );
    }

    #[test]
    fn test_string_extension_errors() {
        let engine = engine();
        let err = engine.run_source("return ('abc'):insert(10, 'x')").unwrap_err();
        assert!(matches!(
            err.object_error(),
            Some(ObjectError::ArgumentRange { index: 2, function, .. }) if function == "insert"
        ));

        let err = engine.run_source("return ('abc'):padLeft(5, 'ab')").unwrap_err();
        assert!(matches!(
            err.object_error(),
            Some(ObjectError::ArgumentType { index: 3, expected, .. }) if expected == "char"
        ));

        let results = engine
            .run_source("return require('string').split ~= nil, package.loaded.string == string")
            .unwrap();
        assert_eq!(results, vec!["true", "true"]);
    }

    #[test]
    fn test_table_copy() {
        let results = eval(
            r#"
            local t = { a = { 1, 2 } }
            t.self = t
            t.b = t.a
            local c = table.copy(t)
            return c ~= t, c.self == c, c.a == c.b, c.a ~= t.a, c.a[2]
            "#,
        );
        assert_eq!(results, vec!["true", "true", "true", "true", "2"]);

        let err = engine().run_source("table.copy(1)").unwrap_err();
        assert!(matches!(
            err.object_error(),
            Some(ObjectError::ArgumentType { expected, .. }) if expected == "table"
        ));
    }

    #[test]
    fn test_table_copy_deep_chain() {
        let results = eval(
            r#"
            local t = {}
            local cur = t
            for i = 1, 20000 do cur.next = {} cur = cur.next end
            local ok, copy = pcall(table.copy, t)
            local depth, node = 0, copy
            while node.next do depth = depth + 1 node = node.next end
            return ok, depth, copy ~= t
            "#,
        );
        assert_eq!(results, vec!["true", "20000", "true"]);
    }

    #[test]
    fn test_vector3() {
        let results = eval(
            r#"
            local v = Vector3.create(3, 0, 4)
            local n = v:normalized()
            local zero = Vector3.create(0, 0, 0)
            v.y = 2
            return tostring(zero), math.abs(n.x - 0.6) < 1e-6, math.abs(n.z - 0.8) < 1e-6,
                zero:normalized() == zero, v == Vector3.create(3, 2, 4), v.y == 2
            "#,
        );
        assert_eq!(results, vec!["(0, 0, 0)", "true", "true", "true", "true", "true"]);

        let err = engine().run_source("Vector3.create('a', 0, 0)").unwrap_err();
        assert!(matches!(
            err.object_error(),
            Some(ObjectError::ArgumentType { index: 1, expected, .. }) if expected == "number"
        ));
    }

    #[tokio::test]
    async fn test_execute_source() {
        let engine = engine();
        let results = engine
            .execute_source("local A = class('A') return 1 + 1, A")
            .await
            .unwrap();
        assert_eq!(results, vec!["2", "Class<A>"]);
    }

    #[tokio::test]
    async fn test_execute_file() {
        let mut file = tempfile::Builder::new().suffix(".lua").tempfile().unwrap();
        writeln!(file, "local Animal = class('Animal')").unwrap();
        writeln!(file, "return tostring(Animal.new())").unwrap();

        let engine = engine();
        let results = engine.execute_file(file.path()).await.unwrap();
        assert_eq!(results, vec!["Animal<>"]);

        let dir = tempfile::tempdir().unwrap();
        let err = engine
            .execute_file(dir.path().join("missing.lua"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }

    #[test]
    fn test_cancelled_engine_fails_fast() {
        let engine = engine();
        engine.cancel_token().cancel();
        assert!(matches!(
            engine.run_source("return 1"),
            Err(ScriptError::Cancelled)
        ));

        engine.reset_cancellation();
        assert_eq!(engine.run_source("return 1").unwrap(), vec!["1"]);
    }

    #[test]
    fn test_cancel_running_script() {
        let engine = engine();
        let token = engine.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let result = engine.run_source("while true do end");
        canceller.join().unwrap();
        assert!(matches!(result, Err(ScriptError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_running_async_script() {
        let engine = engine();
        let token = engine.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let result = engine.execute_source("while true do end").await;
        canceller.join().unwrap();
        assert!(matches!(result, Err(ScriptError::Cancelled)));
    }

    #[test]
    fn test_cancel_running_coroutine() {
        let engine = engine();
        let token = engine.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let result = engine.run_source("coroutine.wrap(function() while true do end end)()");
        canceller.join().unwrap();
        let err = result.unwrap_err();
        assert_eq!(err.object_error(), Some(&ObjectError::Cancelled));
    }

    #[test]
    fn test_ffi_exec() {
        let engine = luaclass_new_engine();
        assert!(!engine.is_null());

        let code = CString::new("return 1 + 2, 'x'").unwrap();
        let mut failed = true;
        let out = unsafe { luaclass_exec(engine, code.as_ptr(), ptr::null(), &mut failed) };
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        unsafe { luaclass_free_str(out) };
        assert!(!failed);
        assert_eq!(text, "3 x");

        let code = CString::new("error('boom')").unwrap();
        let name = CString::new("probe").unwrap();
        let out = unsafe { luaclass_exec(engine, code.as_ptr(), name.as_ptr(), &mut failed) };
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        unsafe { luaclass_free_str(out) };
        assert!(failed);
        assert!(text.contains("probe:1: boom"));

        unsafe { luaclass_free_engine(engine) };
        assert_eq!(luaclass_version(), 0x00010000);
    }
}

/// Convert a borrowed C string (const char *) into a Rust &str.
#[macro_export]
macro_rules! borrow_string {
    ($cstr:expr) => {{
        if $cstr.is_null() {
            ""
        } else {
            unsafe {
                let c_str = std::ffi::CStr::from_ptr($cstr);
                c_str.to_str().unwrap_or("")
            }
        }
    }};
}

/// Create a raw string from &str.
///
/// Interior NULs are dropped. Remember to FREE THIS!
#[macro_export]
macro_rules! create_raw_string {
    ($rstr:expr) => {{
        let bytes: Vec<u8> = AsRef::<str>::as_ref(&$rstr)
            .bytes()
            .filter(|b| *b != 0)
            .collect();
        std::ffi::CString::new(bytes).unwrap_or_default().into_raw()
    }};
}

/// Free a raw string made by `create_raw_string!`.
#[macro_export]
macro_rules! free_raw_string {
    ($rptr:expr) => {{
        if !$rptr.is_null() {
            let _ = unsafe { std::ffi::CString::from_raw($rptr) };
        }
    }};
}

pub mod config;
pub mod error;
pub mod ffi;

/// Move a value across the C boundary as an opaque heap pointer.
///
/// The host owns whatever `into_raw` hands out until it gives it back through `from_raw`.
pub trait PtrMagic: Sized {
    /// Box the value and leak it as a raw pointer.
    fn into_raw(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    /// Take ownership back from a pointer made by `into_raw`.
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` and must not be used afterwards.
    unsafe fn from_raw(ptr: *mut Self) -> Self {
        unsafe { *Box::from_raw(ptr) }
    }

    /// Borrow the value behind a pointer made by `into_raw`.
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` and still be alive.
    unsafe fn from_borrow<'a>(ptr: *mut Self) -> &'a mut Self {
        unsafe { &mut *ptr }
    }
}

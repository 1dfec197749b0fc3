//! Flat C ABI over [`crate::imaging`].
//!
//! Every entry point has a fixed arity, reports failure as `-1` (or a null
//! handle) and appends a message to a thread-local error buffer readable with
//! [`error_buffer`]. Null pointers are failures, never crashes, and panics are
//! caught before they reach the caller.
//!
//! Ownership:
//!
//! | Returned by | Release with |
//! |-------------|--------------|
//! | `image_new_from_buffer`, `resize`, `icc_import`, `icc_export`, `copy`, `autorot` | [`image_unref`] |
//! | `*save_buffer` | [`buffer_free`] (pointer and size) |
//! | `profile_load` | [`blob_unref`] |
//! | `image_get_fields` | [`fields_free`] |

use crate::imaging::{Compression, Depth, Image, Intent, Profile, Quality};
use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

pub const SUCCESS: c_int = 0;
pub const FAILURE: c_int = -1;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
    static ERROR_SNAPSHOT: RefCell<CString> = RefCell::new(CString::default());
}

fn push_error(message: &str) {
    tracing::debug!(message, "ffi call failed");
    LAST_ERROR.with(|buf| {
        let mut buf = buf.borrow_mut();
        buf.push_str(message);
        buf.push('\n');
    });
}

/// Run `f`, turning errors and panics into `fallback` plus an error message.
fn guard<T>(fallback: T, f: impl FnOnce() -> Result<T, String>) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(message)) => {
            push_error(&message);
            fallback
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            push_error(&format!("internal error: {message}"));
            fallback
        }
    }
}

unsafe fn image_ref<'a>(image: *const Image) -> Result<&'a Image, String> {
    unsafe { image.as_ref() }.ok_or_else(|| "image handle is null".to_string())
}

unsafe fn c_str<'a>(s: *const c_char, what: &str) -> Result<&'a str, String> {
    if s.is_null() {
        return Err(format!("{what} is null"));
    }
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|_| format!("{what} is not valid UTF-8"))
}

fn check_out<T>(out: *mut T, what: &str) -> Result<(), String> {
    if out.is_null() {
        Err(format!("{what} output pointer is null"))
    } else {
        Ok(())
    }
}

/// Hand an encoded buffer to the caller.
unsafe fn emit_buffer(data: Vec<u8>, buf: *mut *mut u8, size: *mut usize) -> c_int {
    let boxed = data.into_boxed_slice();
    let len = boxed.len();
    unsafe {
        *size = len;
        *buf = Box::into_raw(boxed).cast::<u8>();
    }
    SUCCESS
}

unsafe fn emit_image(image: Image, out: *mut *mut Image) -> c_int {
    unsafe { *out = Box::into_raw(Box::new(image)) };
    SUCCESS
}

unsafe fn save_buffer(
    image: *const Image,
    buf: *mut *mut u8,
    size: *mut usize,
    encode: impl FnOnce(&Image) -> crate::imaging::Result<Vec<u8>>,
) -> c_int {
    guard(FAILURE, || {
        check_out(buf, "buffer")?;
        check_out(size, "size")?;
        let image = unsafe { image_ref(image) }?;
        let data = encode(image).map_err(|e| e.to_string())?;
        Ok(unsafe { emit_buffer(data, buf, size) })
    })
}

unsafe fn derive_image(
    image: *const Image,
    out: *mut *mut Image,
    op: impl FnOnce(&Image) -> crate::imaging::Result<Image>,
) -> c_int {
    guard(FAILURE, || {
        check_out(out, "image")?;
        let image = unsafe { image_ref(image) }?;
        let derived = op(image).map_err(|e| e.to_string())?;
        Ok(unsafe { emit_image(derived, out) })
    })
}

// =========================================================================
// Decode / encode
// =========================================================================

/// Decode `len` bytes at `buf`. A null `option_string` means no options.
///
/// # Safety
/// `buf` must point to `len` readable bytes; `option_string` must be null or
/// a nul-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_new_from_buffer(
    buf: *const c_void,
    len: usize,
    option_string: *const c_char,
) -> *mut Image {
    guard(ptr::null_mut(), || {
        if buf.is_null() {
            return Err("input buffer is null".into());
        }
        let bytes = unsafe { std::slice::from_raw_parts(buf.cast::<u8>(), len) };
        let options = if option_string.is_null() {
            ""
        } else {
            unsafe { c_str(option_string, "option string") }?
        };
        let image = Image::new_from_buffer(bytes, options).map_err(|e| e.to_string())?;
        Ok(Box::into_raw(Box::new(image)))
    })
}

/// # Safety
/// `image` must be null or a live handle; `buf` and `size` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jpegsave_buffer(
    image: *const Image,
    buf: *mut *mut u8,
    size: *mut usize,
    quality: c_int,
) -> c_int {
    unsafe { save_buffer(image, buf, size, |img| img.jpegsave_buffer(Quality::new(quality.into()))) }
}

/// # Safety
/// See [`jpegsave_buffer`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pngsave_buffer(
    image: *const Image,
    buf: *mut *mut u8,
    size: *mut usize,
    compression: c_int,
) -> c_int {
    unsafe {
        save_buffer(image, buf, size, |img| {
            img.pngsave_buffer(Compression::new(compression.into()))
        })
    }
}

/// # Safety
/// See [`jpegsave_buffer`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webpsave_buffer(
    image: *const Image,
    buf: *mut *mut u8,
    size: *mut usize,
    quality: c_int,
    lossless: bool,
) -> c_int {
    unsafe {
        save_buffer(image, buf, size, |img| {
            img.webpsave_buffer(Quality::new(quality.into()), lossless)
        })
    }
}

/// # Safety
/// See [`jpegsave_buffer`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tiffsave_buffer(
    image: *const Image,
    buf: *mut *mut u8,
    size: *mut usize,
) -> c_int {
    unsafe { save_buffer(image, buf, size, Image::tiffsave_buffer) }
}

/// Release a buffer returned by one of the `*save_buffer` functions.
///
/// # Safety
/// `buf`/`size` must be exactly what an encoder returned, released once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn buffer_free(buf: *mut u8, size: usize) {
    if !buf.is_null() {
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(buf, size)) });
    }
}

// =========================================================================
// Derived images
// =========================================================================

/// # Safety
/// `image` must be null or a live handle; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resize(
    image: *const Image,
    out: *mut *mut Image,
    xscale: f64,
    yscale: f64,
) -> c_int {
    unsafe { derive_image(image, out, |img| img.resize(xscale, yscale)) }
}

/// # Safety
/// See [`resize`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn icc_import(image: *const Image, out: *mut *mut Image, intent: c_int) -> c_int {
    unsafe {
        derive_image(image, out, |img| img.icc_import(Intent::try_from(intent)?))
    }
}

/// # Safety
/// See [`resize`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn icc_export(
    image: *const Image,
    out: *mut *mut Image,
    intent: c_int,
    depth: c_int,
) -> c_int {
    unsafe {
        derive_image(image, out, |img| {
            img.icc_export(Intent::try_from(intent)?, Depth::try_from(depth)?)
        })
    }
}

/// # Safety
/// See [`resize`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn copy(image: *const Image, out: *mut *mut Image) -> c_int {
    unsafe { derive_image(image, out, |img| Ok(img.copy())) }
}

/// # Safety
/// See [`resize`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn autorot(image: *const Image, out: *mut *mut Image) -> c_int {
    unsafe { derive_image(image, out, Image::autorot) }
}

/// # Safety
/// `image` must be null or a handle not used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_unref(image: *mut Image) {
    if !image.is_null() {
        drop(unsafe { Box::from_raw(image) });
    }
}

/// Width in pixels, 0 for a null handle.
///
/// # Safety
/// `image` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_width(image: *const Image) -> c_int {
    unsafe { image.as_ref() }.map_or(0, |img| img.width() as c_int)
}

/// Height in pixels, 0 for a null handle.
///
/// # Safety
/// `image` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_height(image: *const Image) -> c_int {
    unsafe { image.as_ref() }.map_or(0, |img| img.height() as c_int)
}

/// Interpretation code (see [`crate::imaging::Interpretation::code`]), -1 for null.
///
/// # Safety
/// `image` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_interpretation(image: *const Image) -> c_int {
    unsafe { image.as_ref() }.map_or(FAILURE, |img| img.interpretation().code())
}

// =========================================================================
// Profiles
// =========================================================================

/// # Safety
/// `name` must be a nul-terminated string; `blob` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn profile_load(name: *const c_char, blob: *mut *mut Profile) -> c_int {
    guard(FAILURE, || {
        check_out(blob, "blob")?;
        let name = unsafe { c_str(name, "profile name") }?;
        let profile = crate::imaging::profile_load(name).map_err(|e| e.to_string())?;
        unsafe { *blob = Box::into_raw(Box::new(profile)) };
        Ok(SUCCESS)
    })
}

/// Borrow the bytes of a profile blob. Valid until [`blob_unref`].
///
/// # Safety
/// `blob` must be null or a live blob; `len` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn blob_get(blob: *const Profile, len: *mut usize) -> *const u8 {
    let Some(profile) = (unsafe { blob.as_ref() }) else {
        push_error("blob is null");
        return ptr::null();
    };
    if !len.is_null() {
        unsafe { *len = profile.data().len() };
    }
    profile.data().as_ptr()
}

/// # Safety
/// `blob` must be null or a blob not used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn blob_unref(blob: *mut Profile) {
    if !blob.is_null() {
        drop(unsafe { Box::from_raw(blob) });
    }
}

// =========================================================================
// Metadata
// =========================================================================

/// Null-terminated array of field names; release with [`fields_free`].
///
/// # Safety
/// `image` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_get_fields(image: *const Image) -> *mut *mut c_char {
    guard(ptr::null_mut(), || {
        let image = unsafe { image_ref(image) }?;
        let mut names: Vec<*mut c_char> = image
            .get_fields()
            .into_iter()
            .filter_map(|name| CString::new(name).ok())
            .map(CString::into_raw)
            .collect();
        names.push(ptr::null_mut());
        Ok(Box::into_raw(names.into_boxed_slice()).cast::<*mut c_char>())
    })
}

/// # Safety
/// `fields` must be null or an array returned by [`image_get_fields`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fields_free(fields: *mut *mut c_char) {
    if fields.is_null() {
        return;
    }
    let mut n = 0;
    unsafe {
        while !(*fields.add(n)).is_null() {
            drop(CString::from_raw(*fields.add(n)));
            n += 1;
        }
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(fields, n + 1)));
    }
}

/// Remove a field; `true` if it existed and was removed.
///
/// # Safety
/// `image` must be null or a live handle; `name` a nul-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn image_remove(image: *mut Image, name: *const c_char) -> bool {
    guard(false, || {
        let image = unsafe { image.as_mut() }.ok_or("image handle is null")?;
        let name = unsafe { c_str(name, "field name") }?;
        Ok(image.remove(name))
    })
}

// =========================================================================
// Errors
// =========================================================================

/// Accumulated error messages of this thread. Valid until the next call.
#[unsafe(no_mangle)]
pub extern "C" fn error_buffer() -> *const c_char {
    let text = LAST_ERROR.with(|buf| buf.borrow().replace('\0', " "));
    ERROR_SNAPSHOT.with(|snap| {
        let mut snap = snap.borrow_mut();
        *snap = CString::new(text).unwrap_or_default();
        snap.as_ptr()
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn error_clear() {
    LAST_ERROR.with(|buf| buf.borrow_mut().clear());
}

//! wxblend-ffi: C-ABI exports for the reorder buffer.
//!
//! Ingest processes written in C push frames with `wxb_buffer_add` from any
//! number of threads and drain them in key order with `wxb_buffer_next`
//! from a single consumer thread, the same contract as the Rust API.

mod buffer;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use buffer::{
    wxb_buffer_add, wxb_buffer_close, wxb_buffer_free, wxb_buffer_len, wxb_buffer_new,
    wxb_buffer_next, wxb_frame_free,
};
pub use types::{
    WxbBufferHandle, WxbFrame, WxbResult, WXB_DUPLICATE, WXB_ERR_CLOSED,
    WXB_ERR_FRAME_TOO_LARGE, WXB_ERR_INTERNAL, WXB_ERR_INVALID_ARGUMENT, WXB_OK, WXB_TOO_LATE,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn wxb_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_returns_non_null_pointer() {
        let ptr = wxb_last_error();
        assert!(!ptr.is_null());

        // SAFETY: wxb_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }
}

use std::ptr;
use std::sync::Mutex;
use std::time::Duration;

use wxblend_buffer::{AddOutcome, BufferConfig, FrameKey, ReorderBuffer, UplinkMap};

use crate::error;
use crate::types::{BufferHandle, WxbBufferHandle, WxbFrame, WxbResult};

fn with_buffer<T>(
    handle: WxbBufferHandle,
    on_error: T,
    f: impl FnOnce(&BufferHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("buffer handle cannot be null");
        return on_error;
    }

    let buffer_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*(handle as *mut BufferHandle) }
    };

    f(buffer_handle)
}

/// Create a reorder buffer with the given release delay in seconds.
///
/// Returns null on error; `wxb_last_error` describes the failure. The
/// handle must be released with `wxb_buffer_free`.
#[no_mangle]
pub extern "C" fn wxb_buffer_new(delay_seconds: f64) -> WxbBufferHandle {
    crate::ffi_boundary(ptr::null_mut(), || {
        error::clear_error_state();

        if !delay_seconds.is_finite() || delay_seconds < 0.0 {
            let _ = error::set_invalid_argument(format!(
                "release delay must be a non-negative number of seconds, got {delay_seconds}"
            ));
            return ptr::null_mut();
        }

        let handle = BufferHandle {
            buffer: ReorderBuffer::new(BufferConfig {
                delay: Duration::from_secs_f64(delay_seconds),
                ..BufferConfig::default()
            }),
            uplinks: Mutex::new(UplinkMap::new()),
        };
        Box::into_raw(Box::new(handle)) as WxbBufferHandle
    })
}

/// Add a frame.
///
/// Returns `WXB_OK` (added), `WXB_TOO_LATE`, or `WXB_DUPLICATE` as the
/// normal outcomes; negative codes are errors.
///
/// # Safety
/// `buffer` must be a handle from `wxb_buffer_new`. If `len > 0`, `data`
/// must point to `len` readable bytes. Safe to call from multiple threads.
#[no_mangle]
pub unsafe extern "C" fn wxb_buffer_add(
    buffer: WxbBufferHandle,
    source: u32,
    seq: u32,
    block: u16,
    data: *const u8,
    len: usize,
) -> WxbResult {
    crate::ffi_boundary(WxbResult::Internal, || {
        error::clear_error_state();

        if data.is_null() && len > 0 {
            return error::set_invalid_argument("data cannot be null when len > 0");
        }

        let bytes: &[u8] = if len == 0 {
            &[]
        } else {
            // SAFETY: Non-null and readable for `len` bytes per the contract.
            unsafe { std::slice::from_raw_parts(data, len) }
        };

        with_buffer(buffer, WxbResult::InvalidArgument, |handle| {
            let epoch = handle
                .uplinks
                .lock()
                .expect("uplink map mutex poisoned")
                .epoch_for(source);
            let key = FrameKey::new(epoch, seq, block);

            match handle.buffer.add(key, bytes) {
                Ok(AddOutcome::Added) => WxbResult::Ok,
                Ok(AddOutcome::TooLate) => WxbResult::TooLate,
                Ok(AddOutcome::Duplicate) => WxbResult::Duplicate,
                Err(err) => error::map_buffer_error(&err),
            }
        })
    })
}

/// Remove and return the oldest frame, blocking until one is eligible.
///
/// On `WXB_OK`, `out_frame` holds the key fields and a payload allocated by
/// this library — release it with `wxb_frame_free`. Returns
/// `WXB_ERR_CLOSED` once the buffer is closed and drained.
///
/// # Safety
/// `buffer` must be a handle from `wxb_buffer_new`; `out_frame` must point
/// to a writable `WxbFrame`. Call from a single consumer thread.
#[no_mangle]
pub unsafe extern "C" fn wxb_buffer_next(
    buffer: WxbBufferHandle,
    out_frame: *mut WxbFrame,
) -> WxbResult {
    crate::ffi_boundary(WxbResult::Internal, || {
        error::clear_error_state();

        if out_frame.is_null() {
            return error::set_invalid_argument("out_frame cannot be null");
        }

        with_buffer(buffer, WxbResult::InvalidArgument, |handle| {
            match handle.buffer.next_frame() {
                Some(frame) => {
                    // SAFETY: `out_frame` is writable per the contract.
                    unsafe {
                        write_frame_out(out_frame, frame.key.seq(), frame.key.block(), &frame.payload)
                    }
                }
                None => {
                    error::set_error_message("buffer closed and drained");
                    WxbResult::Closed
                }
            }
        })
    })
}

/// # Safety
/// `out_frame` must be valid for writes; any existing payload pointer must
/// have originated from this library.
unsafe fn write_frame_out(out_frame: *mut WxbFrame, seq: u32, block: u16, payload: &[u8]) -> WxbResult {
    let frame_ref = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *out_frame }
    };

    if !frame_ref.data.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(frame_ref.data, frame_ref.len);
        // SAFETY: Existing payload pointers are allocated by this library.
        unsafe {
            drop(Box::from_raw(slice_ptr));
        }
        frame_ref.data = ptr::null_mut();
        frame_ref.len = 0;
    }

    let boxed: Box<[u8]> = payload.to_vec().into_boxed_slice();
    let len = boxed.len();
    let data = if len == 0 {
        ptr::null_mut()
    } else {
        Box::into_raw(boxed) as *mut u8
    };

    frame_ref.seq = seq;
    frame_ref.block = block;
    frame_ref.data = data;
    frame_ref.len = len;

    WxbResult::Ok
}

/// Free payload memory held by a [`WxbFrame`] populated by `wxb_buffer_next`.
///
/// # Safety
/// `frame` must be either null or a valid pointer to a `WxbFrame` created by
/// caller code. If `frame->data` is non-null, it must have originated from
/// this library.
#[no_mangle]
pub unsafe extern "C" fn wxb_frame_free(frame: *mut WxbFrame) {
    crate::ffi_boundary((), || {
        if frame.is_null() {
            return;
        }

        let frame_ref = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &mut *frame }
        };

        if !frame_ref.data.is_null() {
            let slice_ptr = ptr::slice_from_raw_parts_mut(frame_ref.data, frame_ref.len);
            // SAFETY: `data` was allocated by `Box<[u8]>` in `wxb_buffer_next`.
            unsafe {
                drop(Box::from_raw(slice_ptr));
            }
        }

        *frame_ref = WxbFrame::default();
    });
}

/// Number of buffered, undelivered frames. Returns 0 for a null handle.
///
/// # Safety
/// `buffer` must be null or a handle from `wxb_buffer_new`.
#[no_mangle]
pub unsafe extern "C" fn wxb_buffer_len(buffer: WxbBufferHandle) -> usize {
    crate::ffi_boundary(0, || with_buffer(buffer, 0, |handle| handle.buffer.len()))
}

/// Close the buffer: producers start failing with `WXB_ERR_CLOSED` and the
/// consumer drains the remaining frames, then gets `WXB_ERR_CLOSED`.
///
/// # Safety
/// `buffer` must be null or a handle from `wxb_buffer_new`.
#[no_mangle]
pub unsafe extern "C" fn wxb_buffer_close(buffer: WxbBufferHandle) {
    crate::ffi_boundary((), || {
        with_buffer(buffer, (), |handle| handle.buffer.close());
    });
}

/// Free a buffer handle.
///
/// # Safety
/// `buffer` must be null or a handle previously returned by
/// `wxb_buffer_new`, and no other thread may still be using it.
#[no_mangle]
pub unsafe extern "C" fn wxb_buffer_free(buffer: WxbBufferHandle) {
    crate::ffi_boundary((), || {
        if buffer.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by wxb_buffer_new.
        unsafe {
            drop(Box::from_raw(buffer as *mut BufferHandle));
        }
    });
}

//! ### English
//! C ABI bindings for stream handle wrappers.
//!
//! ### 中文
//! 流句柄包装器的 C ABI 绑定。

use crate::engine::handle::{HandleMode, StreamHandle};

use super::{XianImageStreamHandle, XianImageStreamView, lookup, write_out};

#[unsafe(no_mangle)]
/// ### English
/// Wraps `stream`. `mode` is `0` (read) or `1` (write). Returns NULL for an invalid stream id
/// or an unknown mode.
///
/// ### 中文
/// 包装 `stream`。`mode` 为 `0`（读）或 `1`（写）。对无效流 id 或未知模式返回 NULL。
pub extern "C" fn xian_image_stream_handle_create(stream: u32, mode: u32) -> *mut XianImageStreamHandle {
    let mode = match mode {
        0 => HandleMode::Read,
        1 => HandleMode::Write,
        _ => return std::ptr::null_mut(),
    };
    let Ok(stream) = lookup(stream) else {
        return std::ptr::null_mut();
    };
    Box::into_raw(Box::new(XianImageStreamHandle {
        handle: StreamHandle::new(&stream, mode),
    }))
}

#[unsafe(no_mangle)]
/// ### English
/// Adds an owner; returns the new use count (0 for NULL).
///
/// # Safety
/// `handle` must be NULL or a live wrapper.
///
/// ### 中文
/// 增加一个持有者；返回新的使用计数（NULL 时为 0）。
///
/// # Safety
/// `handle` 必须为 NULL 或存活的包装器。
pub unsafe extern "C" fn xian_image_stream_handle_add_reference(
    handle: *const XianImageStreamHandle,
) -> u32 {
    if handle.is_null() {
        return 0;
    }
    unsafe { &(*handle).handle }.add_reference()
}

#[unsafe(no_mangle)]
/// ### English
/// Removes an owner without destroying the wrapper; returns the new use count.
///
/// # Safety
/// `handle` must be NULL or a live wrapper.
///
/// ### 中文
/// 移除一个持有者但不销毁包装器；返回新的使用计数。
///
/// # Safety
/// `handle` 必须为 NULL 或存活的包装器。
pub unsafe extern "C" fn xian_image_stream_handle_remove_reference(
    handle: *const XianImageStreamHandle,
) -> u32 {
    if handle.is_null() {
        return 0;
    }
    unsafe { &(*handle).handle }.remove_reference()
}

#[unsafe(no_mangle)]
/// ### English
/// Drops one owner. Returns `true` when this call destroyed the wrapper; the pointer is freed
/// and must not be used again.
///
/// # Safety
/// `handle` must be NULL or a live wrapper.
///
/// ### 中文
/// 减少一个持有者。当本次调用销毁了包装器时返回 `true`；此时指针已被释放，不得再使用。
///
/// # Safety
/// `handle` 必须为 NULL 或存活的包装器。
pub unsafe extern "C" fn xian_image_stream_handle_destroy(handle: *mut XianImageStreamHandle) -> bool {
    if handle.is_null() {
        return false;
    }
    if !unsafe { &(*handle).handle }.destroy() {
        return false;
    }
    unsafe {
        drop(Box::from_raw(handle));
    }
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Locks the newest frame for reading and fills `out_view`. Re-entrant; each successful call
/// needs one `xian_image_stream_handle_unlock`.
///
/// # Safety
/// `handle` must be NULL or a live wrapper; `out_view` must be NULL or valid for writes.
///
/// ### 中文
/// 以读方式锁定最新帧并填充 `out_view`。可重入；每次成功调用都需要一次
/// `xian_image_stream_handle_unlock`。
///
/// # Safety
/// `handle` 必须为 NULL 或存活的包装器；`out_view` 必须为 NULL 或可写。
pub unsafe extern "C" fn xian_image_stream_handle_lock_for_reading(
    handle: *const XianImageStreamHandle,
    out_view: *mut XianImageStreamView,
) -> bool {
    if handle.is_null() {
        return false;
    }
    let Some(view) = unsafe { &(*handle).handle }.lock_for_reading() else {
        return false;
    };
    unsafe { write_out(out_view, XianImageStreamView::from(&*view)) };
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Locks a free slot for writing (write-mode wrappers only); the last unlock commits it.
///
/// # Safety
/// Same as `xian_image_stream_handle_lock_for_reading`.
///
/// ### 中文
/// 以写方式锁定空闲槽位（仅限写模式包装器）；最后一次解锁会提交该帧。
///
/// # Safety
/// 同 `xian_image_stream_handle_lock_for_reading`。
pub unsafe extern "C" fn xian_image_stream_handle_lock_for_writing(
    handle: *const XianImageStreamHandle,
    out_view: *mut XianImageStreamView,
) -> bool {
    if handle.is_null() {
        return false;
    }
    let Some(view) = unsafe { &(*handle).handle }.lock_for_writing() else {
        return false;
    };
    unsafe { write_out(out_view, XianImageStreamView::from(&*view)) };
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Undoes one lock.
///
/// # Safety
/// `handle` must be NULL or a live wrapper.
///
/// ### 中文
/// 撤销一次加锁。
///
/// # Safety
/// `handle` 必须为 NULL 或存活的包装器。
pub unsafe extern "C" fn xian_image_stream_handle_unlock(handle: *const XianImageStreamHandle) {
    if handle.is_null() {
        return;
    }
    unsafe { &(*handle).handle }.unlock();
}

#[unsafe(no_mangle)]
/// ### English
/// Writes the wrapped stream's width and height. Returns `false` after destruction.
///
/// # Safety
/// `handle` must be NULL or a live wrapper; out-pointers must be NULL or valid for writes.
///
/// ### 中文
/// 写出被包装流的宽高。销毁后返回 `false`。
///
/// # Safety
/// `handle` 必须为 NULL 或存活的包装器；输出指针必须为 NULL 或可写。
pub unsafe extern "C" fn xian_image_stream_handle_get_size(
    handle: *const XianImageStreamHandle,
    out_width: *mut u32,
    out_height: *mut u32,
) -> bool {
    if handle.is_null() {
        return false;
    }
    let Some(size) = unsafe { &(*handle).handle }.size() else {
        return false;
    };
    unsafe {
        write_out(out_width, size.width);
        write_out(out_height, size.height);
    }
    true
}

//! ### English
//! C ABI bindings for the native stream: lifetime, header, buffer handoff and flags.
//!
//! ### 中文
//! 原生流的 C ABI 绑定：生命周期、头信息、缓冲交接与标记位。

use std::ffi::c_void;
use std::sync::Arc;

use dpi::PhysicalSize;

use crate::engine::config::StreamConfig;
use crate::engine::error::{StreamError, XIAN_IMAGE_STREAM_SUCCESS, status_code};
use crate::engine::format::{FormatDescriptor, PixelFormat};
use crate::engine::registry::StreamRegistry;
use crate::engine::stream::{ReadBuffer, StreamId, WriteBuffer};
use crate::engine::sync::{SharedSyncToken, SyncOutcome};

use super::sync::{CSyncToken, XianImageStreamSyncFn};
use super::{XIAN_IMAGE_STREAM_INVALID_BUFFER, lookup, write_out};

fn registry_id(stream: u32) -> Result<StreamId, StreamError> {
    StreamId::new(stream).ok_or(StreamError::InvalidStream)
}

fn slot_to_buffer(slot: usize) -> u32 {
    u32::try_from(slot).unwrap_or(XIAN_IMAGE_STREAM_INVALID_BUFFER)
}

#[unsafe(no_mangle)]
/// ### English
/// Creates a stream with `buffer_count` slots of `width x height` pixels in `format`
/// (`PixelFormat` code), applying `create_flags` (`XIAN_IMAGE_STREAM_CREATE_FLAG_*`).
///
/// Returns the stream id (one registry reference), or `0` on failure.
///
/// ### 中文
/// 创建一个流：`buffer_count` 个槽位，每个为 `format`（`PixelFormat` 格式码）格式的
/// `width x height` 像素，并应用 `create_flags`（`XIAN_IMAGE_STREAM_CREATE_FLAG_*`）。
///
/// 返回流 id（注册表引用计数为 1），失败时返回 `0`。
pub extern "C" fn xian_image_stream_create(
    width: u32,
    height: u32,
    format: u32,
    buffer_count: u32,
    create_flags: u32,
) -> u32 {
    let Some(pixel_format) = PixelFormat::from_raw(format) else {
        tracing::warn!(format, "unknown pixel format code");
        return 0;
    };
    let config = StreamConfig::new(
        PhysicalSize::new(width, height),
        FormatDescriptor::new(pixel_format),
        buffer_count as usize,
    )
    .apply_flags(create_flags);

    match StreamRegistry::global().create_image_stream(config) {
        Ok(id) => id.get(),
        Err(err) => {
            tracing::warn!(%err, width, height, buffer_count, "image stream creation failed");
            0
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_add_reference(stream: u32) -> i32 {
    status_code(registry_id(stream).and_then(|id| StreamRegistry::global().add_reference(id).map(drop)))
}

#[unsafe(no_mangle)]
/// ### English
/// Drops one registry reference; the stream id becomes invalid once the count reaches zero.
///
/// ### 中文
/// 减少一个注册表引用；计数归零后该流 id 失效。
pub extern "C" fn xian_image_stream_remove_reference(stream: u32) -> i32 {
    status_code(
        registry_id(stream).and_then(|id| StreamRegistry::global().remove_reference(id).map(drop)),
    )
}

#[unsafe(no_mangle)]
/// ### English
/// Invalidates the stream id regardless of its reference count.
///
/// Wrappers and providers created from it keep the pixels alive until they are destroyed.
///
/// ### 中文
/// 无论引用计数为多少都使该流 id 失效。
///
/// 由其创建的包装器与 provider 会让像素存活到它们被销毁为止。
pub extern "C" fn xian_image_stream_destroy(stream: u32) -> i32 {
    status_code(registry_id(stream).and_then(|id| StreamRegistry::global().destroy(id)))
}

#[unsafe(no_mangle)]
/// ### English
/// Reads the stream header. Any out-pointer may be NULL.
///
/// # Safety
/// Non-null out-pointers must be valid for writes.
///
/// ### 中文
/// 读取流头信息。任一输出指针都可以为 NULL。
///
/// # Safety
/// 非空输出指针必须可写。
pub unsafe extern "C" fn xian_image_stream_get_header(
    stream: u32,
    out_width: *mut u32,
    out_height: *mut u32,
    out_stride: *mut u32,
    out_format: *mut u32,
    out_pixel_size: *mut u32,
) -> i32 {
    let stream = match lookup(stream) {
        Ok(stream) => stream,
        Err(err) => return err.code(),
    };
    let header = stream.header();
    unsafe {
        write_out(out_width, header.size.width);
        write_out(out_height, header.size.height);
        write_out(out_stride, header.stride);
        write_out(out_format, header.format.pixel_format as u32);
        write_out(out_pixel_size, header.pixel_size);
    }
    XIAN_IMAGE_STREAM_SUCCESS
}

#[unsafe(no_mangle)]
/// ### English
/// Acquires a free slot for writing. Blocks in blocking mode; otherwise returns
/// `XIAN_IMAGE_STREAM_INVALID_BUFFER` when none is free.
///
/// ### 中文
/// 获取一个空闲槽位用于写入。阻塞模式下会等待；否则无空闲槽位时返回
/// `XIAN_IMAGE_STREAM_INVALID_BUFFER`。
pub extern "C" fn xian_image_stream_acquire_write_buffer(stream: u32) -> u32 {
    let Ok(stream) = lookup(stream) else {
        return XIAN_IMAGE_STREAM_INVALID_BUFFER;
    };
    match stream.acquire_write_buffer() {
        Some(buffer) => slot_to_buffer(buffer.slot()),
        None => XIAN_IMAGE_STREAM_INVALID_BUFFER,
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Commits a written buffer. If `sync` is non-NULL it is called exactly once with `token`:
/// consumed when the reader releases the frame, dropped when it is superseded or discarded.
///
/// `XIAN_IMAGE_STREAM_SUCCESS` only means the stream id was valid. Releasing a buffer index the
/// producer does not hold is ignored with a warning: nothing is committed and `sync` is called
/// with dropped right away.
///
/// ### 中文
/// 提交已写入的缓冲。若 `sync` 非空，则会以 `token` 恰好调用一次：
/// 读者释放该帧时为 consumed，被取代或被丢弃时为 dropped。
///
/// 返回 `XIAN_IMAGE_STREAM_SUCCESS` 仅表示流 id 有效。释放生产者并未持有的缓冲索引会被忽略并记录警告：
/// 不会提交任何内容，`sync` 会立即以 dropped 调用。
pub extern "C" fn xian_image_stream_release_write_buffer(
    stream: u32,
    buffer: u32,
    sync: Option<XianImageStreamSyncFn>,
    token: u64,
) -> i32 {
    let sync: Option<SharedSyncToken> =
        sync.map(|signal| Arc::new(CSyncToken::new(signal, token)) as SharedSyncToken);
    let stream = match lookup(stream) {
        Ok(stream) => stream,
        Err(err) => {
            if let Some(sync) = sync {
                sync.signal(SyncOutcome::Dropped);
            }
            return err.code();
        }
    };
    stream.release_write_buffer(WriteBuffer::from_raw(stream.id(), buffer as usize), sync);
    XIAN_IMAGE_STREAM_SUCCESS
}

#[unsafe(no_mangle)]
/// ### English
/// Acquires the newest committed frame. Blocks in blocking mode; otherwise returns
/// `XIAN_IMAGE_STREAM_INVALID_BUFFER` when nothing is ready.
///
/// ### 中文
/// 获取最新提交的帧。阻塞模式下会等待；否则没有就绪帧时返回 `XIAN_IMAGE_STREAM_INVALID_BUFFER`。
pub extern "C" fn xian_image_stream_acquire_read_buffer(stream: u32) -> u32 {
    let Ok(stream) = lookup(stream) else {
        return XIAN_IMAGE_STREAM_INVALID_BUFFER;
    };
    match stream.acquire_read_buffer() {
        Some(buffer) => slot_to_buffer(buffer.slot()),
        None => XIAN_IMAGE_STREAM_INVALID_BUFFER,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_release_read_buffer(stream: u32, buffer: u32) -> i32 {
    status_code(lookup(stream).map(|stream| {
        stream.release_read_buffer(ReadBuffer::from_raw(stream.id(), buffer as usize));
    }))
}

#[unsafe(no_mangle)]
/// ### English
/// Pixel pointer of a held buffer, NULL if the buffer is not currently held.
///
/// ### 中文
/// 已持有缓冲的像素指针；若该缓冲当前未被持有则返回 NULL。
pub extern "C" fn xian_image_stream_get_buffer_ptr(stream: u32, buffer: u32) -> *mut c_void {
    lookup(stream)
        .ok()
        .and_then(|stream| stream.buffer_ptr(buffer as usize))
        .map_or(std::ptr::null_mut(), |pixels| pixels.as_ptr().cast())
}

#[unsafe(no_mangle)]
/// ### English
/// Switches blocking mode; waiters are woken.
///
/// ### 中文
/// 切换阻塞模式，并唤醒等待者。
pub extern "C" fn xian_image_stream_set_blocking(stream: u32, blocking: bool) -> i32 {
    status_code(lookup(stream).map(|stream| stream.set_blocking(blocking)))
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_enable_update_notifications(stream: u32, enabled: bool) -> i32 {
    status_code(lookup(stream).map(|stream| stream.enable_update_notifications(enabled)))
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_set_protection_flag(stream: u32, protected: bool) -> i32 {
    status_code(lookup(stream).map(|stream| stream.set_protection_flag(protected)))
}

#[unsafe(no_mangle)]
/// ### English
/// Returns the protection flag (`false` for an invalid id).
///
/// ### 中文
/// 返回保护标记（id 无效时为 `false`）。
pub extern "C" fn xian_image_stream_get_protection_flag(stream: u32) -> bool {
    lookup(stream).is_ok_and(|stream| stream.protection_flag())
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_set_flip_state(stream: u32, flip: bool) -> i32 {
    status_code(lookup(stream).map(|stream| stream.set_flip_state(flip)))
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_get_flip_state(stream: u32) -> bool {
    lookup(stream).is_ok_and(|stream| stream.flip_state())
}

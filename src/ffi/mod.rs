//! ### English
//! C ABI surface for `xian_image_stream`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! Streams are addressed by registry ids (`u32`, `0` is never a valid id). Buffers are slot
//! indices, with `XIAN_IMAGE_STREAM_INVALID_BUFFER` meaning "nothing acquired". Fallible calls
//! return `i32` status codes (`XIAN_IMAGE_STREAM_SUCCESS` or a negative error).
//! Stream handle wrappers and image providers are opaque heap objects owned by the embedder.
//!
//! ### 中文
//! `xian_image_stream` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! 流通过注册表 id（`u32`，`0` 永远不是合法 id）寻址；缓冲为槽位索引，
//! `XIAN_IMAGE_STREAM_INVALID_BUFFER` 表示“未获取到缓冲”。可能失败的调用返回 `i32` 状态码
//! （`XIAN_IMAGE_STREAM_SUCCESS` 或负的错误码）。
//! 流句柄包装器与图像 provider 是由宿主持有的不透明堆对象。
mod abi;
mod handle;
mod observer;
mod provider;
mod stream;
mod sync;

pub use abi::*;
pub use handle::*;
pub use observer::*;
pub use provider::*;
pub use stream::*;
pub use sync::*;

use std::ffi::c_void;

use crate::engine::error::StreamError;
use crate::engine::handle::StreamHandle;
use crate::engine::image::ImageView;
use crate::engine::provider::ImageProvider;
use crate::engine::registry::StreamRegistry;
use crate::engine::stream::{ImageStream, StreamId};

/// ### English
/// Buffer value returned when no slot could be acquired.
///
/// ### 中文
/// 未能获取槽位时返回的缓冲值。
pub const XIAN_IMAGE_STREAM_INVALID_BUFFER: u32 = u32::MAX;

/// ### English
/// C ABI version for `xian_image_stream`.
///
/// ### 中文
/// `xian_image_stream` 的 C ABI 版本号。
const XIAN_IMAGE_STREAM_ABI_VERSION: u32 = 1;

#[repr(C)]
/// ### English
/// Opaque stream handle wrapper (see `xian_image_stream_handle_create`).
///
/// ### 中文
/// 不透明的流句柄包装器（见 `xian_image_stream_handle_create`）。
pub struct XianImageStreamHandle {
    handle: StreamHandle,
}

#[repr(C)]
/// ### English
/// Opaque image provider (see `xian_image_provider_create`).
///
/// ### 中文
/// 不透明的图像 provider（见 `xian_image_provider_create`）。
pub struct XianImageProvider {
    provider: ImageProvider,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
/// ### English
/// Image view handed out by handle/provider locks.
///
/// `pixels` stays valid until the matching unlock.
///
/// ### 中文
/// 由 handle/provider 加锁返回的图像视图。
///
/// `pixels` 在对应的解锁之前保持有效。
pub struct XianImageStreamView {
    pub pixels: *mut c_void,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    /// ### English
    /// `PixelFormat` code.
    ///
    /// ### 中文
    /// `PixelFormat` 格式码。
    pub format: u32,
}

impl From<&ImageView> for XianImageStreamView {
    fn from(view: &ImageView) -> Self {
        let header = view.header();
        Self {
            pixels: view.as_ptr() as *mut c_void,
            width: header.size.width,
            height: header.size.height,
            stride: header.stride,
            format: header.format.pixel_format as u32,
        }
    }
}

/// ### English
/// Resolves a raw id against the global registry.
///
/// ### 中文
/// 在全局注册表中解析原始 id。
fn lookup(stream: u32) -> Result<ImageStream, StreamError> {
    let id = StreamId::new(stream).ok_or(StreamError::InvalidStream)?;
    StreamRegistry::global().get(id)
}

/// ### English
/// Writes `value` through `out` when it is non-null.
///
/// # Safety
/// `out` must be NULL or valid for writes.
///
/// ### 中文
/// 当 `out` 非空时写入 `value`。
///
/// # Safety
/// `out` 必须为 NULL 或可写的有效指针。
unsafe fn write_out<T>(out: *mut T, value: T) {
    if !out.is_null() {
        unsafe { out.write(value) };
    }
}

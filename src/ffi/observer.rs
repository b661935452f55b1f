//! ### English
//! C ABI bindings for commit observers.
//!
//! ### 中文
//! 提交观察者的 C ABI 绑定。

use std::ffi::c_void;
use std::sync::Arc;

use crate::engine::error::{StreamError, status_code};
use crate::engine::observer::StreamObserver;
use crate::engine::stream::StreamId;

use super::lookup;

/// ### English
/// Observer callback, invoked on the producer thread after each commit while notifications are
/// enabled.
///
/// ### 中文
/// 观察者回调；在通知开启期间，每次提交后于生产者线程上调用。
pub type XianImageStreamObserverFn = extern "C" fn(stream: u32, user_data: *mut c_void);

struct CObserver {
    callback: XianImageStreamObserverFn,
}

impl StreamObserver for CObserver {
    fn on_buffer_committed(&self, stream: StreamId, user_data: usize) {
        (self.callback)(stream.get(), user_data as *mut c_void)
    }

    fn observer_key(&self) -> usize {
        self.callback as usize
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Registers `(callback, user_data)`. Registering the same pair twice yields two notifications.
///
/// ### 中文
/// 注册 `(callback, user_data)`。同一二元组注册两次会收到两次通知。
pub extern "C" fn xian_image_stream_add_observer(
    stream: u32,
    callback: Option<XianImageStreamObserverFn>,
    user_data: *mut c_void,
) -> i32 {
    let Some(callback) = callback else {
        return StreamError::InvalidArgument("observer callback is NULL").code();
    };
    status_code(lookup(stream).map(|stream| {
        stream.add_observer(Arc::new(CObserver { callback }), user_data as usize);
    }))
}

#[unsafe(no_mangle)]
/// ### English
/// Removes the earliest registration matching `(callback, user_data)`.
///
/// Returns `XIAN_IMAGE_STREAM_ERROR_INVALID_OBSERVER` if nothing matches.
///
/// ### 中文
/// 移除与 `(callback, user_data)` 匹配的最早一条注册。
///
/// 若无匹配项则返回 `XIAN_IMAGE_STREAM_ERROR_INVALID_OBSERVER`。
pub extern "C" fn xian_image_stream_remove_observer(
    stream: u32,
    callback: Option<XianImageStreamObserverFn>,
    user_data: *mut c_void,
) -> i32 {
    let Some(callback) = callback else {
        return StreamError::InvalidObserver.code();
    };
    status_code(
        lookup(stream)
            .and_then(|stream| stream.remove_observer_key(callback as usize, user_data as usize)),
    )
}

//! ### English
//! C ABI bindings for image providers.
//!
//! ### 中文
//! 图像 provider 的 C ABI 绑定。

use crate::engine::provider::ImageProvider;

use super::{XianImageProvider, XianImageStreamView, lookup, write_out};

#[unsafe(no_mangle)]
/// ### English
/// Creates a provider over `stream`. Creation consumes one committed frame to validate the
/// stream; returns NULL if the id is invalid or no image could be obtained.
///
/// ### 中文
/// 在 `stream` 上创建 provider。创建时会消费一帧已提交图像以验证该流；
/// 若 id 无效或无法获得图像则返回 NULL。
pub extern "C" fn xian_image_provider_create(stream: u32) -> *mut XianImageProvider {
    let provider = lookup(stream).and_then(|stream| ImageProvider::new(&stream));
    match provider {
        Ok(provider) => Box::into_raw(Box::new(XianImageProvider { provider })),
        Err(err) => {
            tracing::debug!(stream, %err, "image provider creation failed");
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a provider. Destroying it while locked is reported and the buffer is released.
///
/// # Safety
/// `provider` must be NULL or a pointer returned by `xian_image_provider_create` that has not
/// been destroyed yet.
///
/// ### 中文
/// 销毁 provider。若在加锁状态下销毁，会记录日志并释放缓冲。
///
/// # Safety
/// `provider` 必须为 NULL，或是由 `xian_image_provider_create` 返回且尚未销毁的指针。
pub unsafe extern "C" fn xian_image_provider_destroy(provider: *mut XianImageProvider) {
    if provider.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(provider));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Provider id (0 for NULL).
///
/// # Safety
/// `provider` must be NULL or a live provider.
///
/// ### 中文
/// provider id（NULL 时为 0）。
///
/// # Safety
/// `provider` 必须为 NULL 或存活的 provider。
pub unsafe extern "C" fn xian_image_provider_id(provider: *const XianImageProvider) -> u32 {
    if provider.is_null() {
        return 0;
    }
    unsafe { &(*provider).provider }.id().get()
}

#[unsafe(no_mangle)]
/// ### English
/// Locks the newest frame and fills `out_view`. The pixel pointer changes between lock cycles.
///
/// # Safety
/// `provider` must be NULL or a live provider; `out_view` must be NULL or valid for writes.
///
/// ### 中文
/// 锁定最新帧并填充 `out_view`。像素指针在不同加锁周期之间会变化。
///
/// # Safety
/// `provider` 必须为 NULL 或存活的 provider；`out_view` 必须为 NULL 或可写。
pub unsafe extern "C" fn xian_image_provider_lock_for_reading(
    provider: *const XianImageProvider,
    out_view: *mut XianImageStreamView,
) -> bool {
    if provider.is_null() {
        return false;
    }
    let Some(view) = unsafe { &(*provider).provider }.lock_for_reading() else {
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
/// `provider` must be NULL or a live provider.
///
/// ### 中文
/// 撤销一次加锁。
///
/// # Safety
/// `provider` 必须为 NULL 或存活的 provider。
pub unsafe extern "C" fn xian_image_provider_unlock(provider: *const XianImageProvider) {
    if provider.is_null() {
        return;
    }
    unsafe { &(*provider).provider }.unlock();
}

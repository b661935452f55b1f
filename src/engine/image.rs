//! ### English
//! Image view bound over a held slot's pixels, as handed out by `StreamHandle` and
//! `ImageProvider`.
//!
//! The view does not own pixels. Its pointer is rebindable so the provider cache can reuse one
//! view across lock cycles; `is_bound` turns false when the owning lock is released.
//!
//! ### 中文
//! 绑定在已持有槽位像素之上的图像视图，由 `StreamHandle` 与 `ImageProvider` 提供。
//!
//! 视图不拥有像素。其指针可重新绑定，从而 provider 缓存能在多次加锁周期间复用同一个视图；
//! 对应的锁释放后 `is_bound` 变为 false。

use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use dpi::PhysicalSize;

use super::format::StreamHeader;

pub struct ImageView {
    header: StreamHeader,
    pixels: AtomicPtr<u8>,
}

impl std::fmt::Debug for ImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageView")
            .field("header", &self.header)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl ImageView {
    pub(crate) fn bind(header: StreamHeader, pixels: NonNull<u8>) -> Self {
        Self {
            header,
            pixels: AtomicPtr::new(pixels.as_ptr()),
        }
    }

    pub(crate) fn rebind(&self, pixels: NonNull<u8>) {
        self.pixels.store(pixels.as_ptr(), Ordering::Release);
    }

    pub(crate) fn unbind(&self) {
        self.pixels.store(ptr::null_mut(), Ordering::Release);
    }

    pub fn header(&self) -> StreamHeader {
        self.header
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.header.size
    }

    pub fn stride(&self) -> u32 {
        self.header.stride
    }

    pub fn is_bound(&self) -> bool {
        !self.pixels.load(Ordering::Acquire).is_null()
    }

    /// ### English
    /// Raw pixel pointer (null once unbound).
    ///
    /// ### 中文
    /// 原始像素指针（解绑后为 null）。
    pub fn as_ptr(&self) -> *const u8 {
        self.pixels.load(Ordering::Acquire)
    }

    /// ### English
    /// Pixel bytes of the bound buffer, `None` once unbound.
    ///
    /// # Safety
    /// The caller must keep the lock that produced this view (`lock_for_reading` /
    /// `lock_for_writing`) for as long as the returned slice is used.
    ///
    /// ### 中文
    /// 已绑定缓冲的像素字节；解绑后返回 `None`。
    ///
    /// # Safety
    /// 调用方在使用返回切片期间，必须一直持有产生该视图的锁（`lock_for_reading` / `lock_for_writing`）。
    pub unsafe fn pixels(&self) -> Option<&[u8]> {
        let data = self.pixels.load(Ordering::Acquire);
        if data.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(data, self.header.byte_len()) })
    }

    /// ### English
    /// Mutable pixel bytes of a view bound for writing.
    ///
    /// # Safety
    /// Same as [`ImageView::pixels`], and the view must come from `lock_for_writing` with no other
    /// slice of it alive.
    ///
    /// ### 中文
    /// 以写方式绑定的视图的可变像素字节。
    ///
    /// # Safety
    /// 要求同 [`ImageView::pixels`]；此外视图必须来自 `lock_for_writing`，且不存在其它存活的切片。
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn pixels_mut(&self) -> Option<&mut [u8]> {
        let data = self.pixels.load(Ordering::Acquire);
        if data.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts_mut(data, self.header.byte_len()) })
    }
}

//! ### English
//! Bitflags controlling optional stream behaviors at creation time.
//!
//! These are passed through the C ABI as a `u32` bitmask.
//!
//! ### 中文
//! 控制流创建时可选行为的位标志（bitflags）。
//!
//! 通过 C ABI 以 `u32` 位掩码传入。

/// ### English
/// Non-blocking mode: acquire calls return an invalid buffer instead of waiting.
///
/// Callers that need bounded waits poll in this mode.
///
/// ### 中文
/// 非阻塞模式：acquire 在无可用槽位时直接返回无效缓冲，而不是等待。
///
/// 需要有界等待的调用方应在该模式下轮询。
pub const XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING: u32 = 1 << 0;

/// ### English
/// Enable observer notifications on commit from the start
/// (equivalent to calling `xian_image_stream_enable_update_notifications(id, 1)` right after creation).
///
/// ### 中文
/// 创建后立即启用提交时的观察者通知
/// （等价于创建后立刻调用 `xian_image_stream_enable_update_notifications(id, 1)`）。
pub const XIAN_IMAGE_STREAM_CREATE_FLAG_NOTIFY: u32 = 1 << 1;

/// ### English
/// Initial flip state hint for the compositor (vertical flip).
///
/// ### 中文
/// 提供给合成器的初始翻转提示（垂直翻转）。
pub const XIAN_IMAGE_STREAM_CREATE_FLAG_FLIP: u32 = 1 << 2;

/// ### English
/// Stream is created with the protection flag set.
///
/// ### 中文
/// 创建时即设置保护标记。
pub const XIAN_IMAGE_STREAM_CREATE_FLAG_PROTECTED: u32 = 1 << 3;

pub(crate) const KNOWN_CREATE_FLAGS: u32 = XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING
    | XIAN_IMAGE_STREAM_CREATE_FLAG_NOTIFY
    | XIAN_IMAGE_STREAM_CREATE_FLAG_FLIP
    | XIAN_IMAGE_STREAM_CREATE_FLAG_PROTECTED;

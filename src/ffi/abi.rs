//! ### English
//! Process-level C ABI entry points: version, constants and logging.
//!
//! ### 中文
//! 进程级 C ABI 入口：版本号、常量与日志。

use tracing_subscriber::EnvFilter;

use crate::engine::flags;

/// ### English
/// Environment variable read by `xian_image_stream_init_logging`.
///
/// ### 中文
/// `xian_image_stream_init_logging` 读取的环境变量。
const LOG_ENV: &str = "XIAN_IMAGE_STREAM_LOG";

#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn xian_image_stream_abi_version() -> u32 {
    super::XIAN_IMAGE_STREAM_ABI_VERSION
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `XIAN_IMAGE_STREAM_INVALID_BUFFER`.
///
/// ### 中文
/// 返回 `XIAN_IMAGE_STREAM_INVALID_BUFFER`。
pub extern "C" fn xian_image_stream_invalid_buffer() -> u32 {
    super::XIAN_IMAGE_STREAM_INVALID_BUFFER
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING`.
///
/// ### 中文
/// 返回 `XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING`。
pub extern "C" fn xian_image_stream_create_flag_non_blocking() -> u32 {
    flags::XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_create_flag_notify() -> u32 {
    flags::XIAN_IMAGE_STREAM_CREATE_FLAG_NOTIFY
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_create_flag_flip() -> u32 {
    flags::XIAN_IMAGE_STREAM_CREATE_FLAG_FLIP
}

#[unsafe(no_mangle)]
pub extern "C" fn xian_image_stream_create_flag_protected() -> u32 {
    flags::XIAN_IMAGE_STREAM_CREATE_FLAG_PROTECTED
}

#[unsafe(no_mangle)]
/// ### English
/// Installs a global `tracing` fmt subscriber filtered by `XIAN_IMAGE_STREAM_LOG`
/// (default `warn`).
///
/// The library never installs a subscriber on its own. Returns `false` if a global subscriber
/// was already set (by this call or by the embedder).
///
/// ### 中文
/// 安装全局 `tracing` fmt subscriber，过滤规则来自 `XIAN_IMAGE_STREAM_LOG`（默认 `warn`）。
///
/// 库本身从不主动安装 subscriber。若全局 subscriber 已被设置（由本函数或宿主），返回 `false`。
pub extern "C" fn xian_image_stream_init_logging() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

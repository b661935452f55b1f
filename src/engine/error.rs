//! ### English
//! Error taxonomy shared by the stream engine, the registry and the C ABI.
//!
//! Acquire operations never use these: they signal unavailability with `None`.
//!
//! ### 中文
//! 流引擎、注册表与 C ABI 共用的错误分类。
//!
//! acquire 类操作不使用这些错误：不可用时返回 `None`。

/// ### English
/// Status code for success (C ABI).
///
/// ### 中文
/// 成功状态码（C ABI）。
pub const XIAN_IMAGE_STREAM_SUCCESS: i32 = 0;
/// ### English
/// The handle does not refer to a live stream.
///
/// ### 中文
/// 句柄不指向存活的流。
pub const XIAN_IMAGE_STREAM_ERROR_INVALID_STREAM: i32 = -1;
/// ### English
/// No observer registration matched the `(callback, user_data)` pair.
///
/// ### 中文
/// 没有与 `(callback, user_data)` 匹配的观察者注册。
pub const XIAN_IMAGE_STREAM_ERROR_INVALID_OBSERVER: i32 = -2;
/// ### English
/// Buffer allocation failed.
///
/// ### 中文
/// 缓冲区分配失败。
pub const XIAN_IMAGE_STREAM_ERROR_OUT_OF_MEMORY: i32 = -3;
/// ### English
/// An argument was out of range (zero buffers, zero size, null callback).
///
/// ### 中文
/// 参数越界（缓冲数为 0、尺寸为 0、回调为空等）。
pub const XIAN_IMAGE_STREAM_ERROR_INVALID_ARGUMENT: i32 = -4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("handle does not refer to a live image stream")]
    InvalidStream,
    #[error("no observer registered for this callback and user data")]
    InvalidObserver,
    #[error("out of memory while allocating stream buffers")]
    OutOfMemory,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl StreamError {
    /// ### English
    /// Stable C ABI status code for this error.
    ///
    /// ### 中文
    /// 该错误对应的稳定 C ABI 状态码。
    pub fn code(self) -> i32 {
        match self {
            StreamError::InvalidStream => XIAN_IMAGE_STREAM_ERROR_INVALID_STREAM,
            StreamError::InvalidObserver => XIAN_IMAGE_STREAM_ERROR_INVALID_OBSERVER,
            StreamError::OutOfMemory => XIAN_IMAGE_STREAM_ERROR_OUT_OF_MEMORY,
            StreamError::InvalidArgument(_) => XIAN_IMAGE_STREAM_ERROR_INVALID_ARGUMENT,
        }
    }
}

/// ### English
/// Collapses a unit result into a C ABI status code.
///
/// ### 中文
/// 将无返回值的结果折叠为 C ABI 状态码。
pub fn status_code(result: Result<(), StreamError>) -> i32 {
    match result {
        Ok(()) => XIAN_IMAGE_STREAM_SUCCESS,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_and_negative() {
        let codes = [
            StreamError::InvalidStream.code(),
            StreamError::InvalidObserver.code(),
            StreamError::OutOfMemory.code(),
            StreamError::InvalidArgument("x").code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a < 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(status_code(Ok(())), XIAN_IMAGE_STREAM_SUCCESS);
        assert_eq!(
            status_code(Err(StreamError::InvalidObserver)),
            XIAN_IMAGE_STREAM_ERROR_INVALID_OBSERVER
        );
    }

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            StreamError::InvalidArgument("buffer_count must be at least 1").to_string(),
            "invalid argument: buffer_count must be at least 1"
        );
    }
}

//! ### English
//! Creation-time configuration for an image stream.
//!
//! ### 中文
//! 图像流的创建期配置。

use dpi::PhysicalSize;

use super::flags;
use super::format::FormatDescriptor;

/// ### English
/// Everything `ImageStream::with_config` needs. Defaults match `CreateImageStream`:
/// blocking, notifications off, not protected, no flip.
///
/// ### 中文
/// `ImageStream::with_config` 所需的全部参数。默认值与 `CreateImageStream` 一致：
/// 阻塞、关闭通知、未保护、不翻转。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub size: PhysicalSize<u32>,
    pub format: FormatDescriptor,
    pub buffer_count: usize,
    pub blocking: bool,
    pub notifications: bool,
    pub protected: bool,
    pub flip: bool,
}

impl StreamConfig {
    pub fn new(size: PhysicalSize<u32>, format: impl Into<FormatDescriptor>, buffer_count: usize) -> Self {
        Self {
            size,
            format: format.into(),
            buffer_count,
            blocking: true,
            notifications: false,
            protected: false,
            flip: false,
        }
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    /// ### English
    /// Applies a C ABI `XIAN_IMAGE_STREAM_CREATE_FLAG_*` bitmask. Unknown bits are ignored.
    ///
    /// ### 中文
    /// 应用 C ABI 的 `XIAN_IMAGE_STREAM_CREATE_FLAG_*` 位掩码；未知位会被忽略。
    pub fn apply_flags(self, create_flags: u32) -> Self {
        let create_flags = create_flags & flags::KNOWN_CREATE_FLAGS;
        self.blocking(create_flags & flags::XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING == 0)
            .notifications(create_flags & flags::XIAN_IMAGE_STREAM_CREATE_FLAG_NOTIFY != 0)
            .flip(create_flags & flags::XIAN_IMAGE_STREAM_CREATE_FLAG_FLIP != 0)
            .protected(create_flags & flags::XIAN_IMAGE_STREAM_CREATE_FLAG_PROTECTED != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::format::PixelFormat;

    #[test]
    fn defaults_match_create_image_stream() {
        let config = StreamConfig::new(PhysicalSize::new(2, 2), PixelFormat::Argb8888, 2);
        assert!(config.blocking);
        assert!(!config.notifications);
        assert!(!config.protected);
        assert!(!config.flip);
    }

    #[test]
    fn flags_map_onto_options() {
        let config = StreamConfig::new(PhysicalSize::new(2, 2), PixelFormat::Argb8888, 2)
            .apply_flags(
                flags::XIAN_IMAGE_STREAM_CREATE_FLAG_NON_BLOCKING
                    | flags::XIAN_IMAGE_STREAM_CREATE_FLAG_NOTIFY
                    | (1 << 31),
            );
        assert!(!config.blocking);
        assert!(config.notifications);
        assert!(!config.flip);
        assert!(!config.protected);
    }
}

//! ### English
//! Pixel format descriptor and the derived per-stream header.
//!
//! The stream only needs byte geometry (pixel size, stride); it never converts pixels.
//!
//! ### 中文
//! 像素格式描述符以及由此推导出的流头信息。
//!
//! 流只关心字节几何（像素大小、行跨度），从不做像素转换。

use dpi::PhysicalSize;

use super::error::StreamError;

/// ### English
/// Pixel formats understood by the stream (codes are stable for the C ABI).
///
/// ### 中文
/// 流支持的像素格式（数值在 C ABI 中保持稳定）。
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Argb8888 = 1,
    Xrgb8888 = 2,
    Rgb888 = 3,
    Rgb565 = 4,
    L8 = 5,
    A8 = 6,
}

impl PixelFormat {
    /// ### English
    /// Bytes per pixel.
    ///
    /// ### 中文
    /// 每像素字节数。
    pub const fn pixel_size(self) -> u32 {
        match self {
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb888 => 3,
            PixelFormat::Rgb565 => 2,
            PixelFormat::L8 | PixelFormat::A8 => 1,
        }
    }

    /// ### English
    /// Parses a C ABI format code.
    ///
    /// ### 中文
    /// 解析 C ABI 格式码。
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(PixelFormat::Argb8888),
            2 => Some(PixelFormat::Xrgb8888),
            3 => Some(PixelFormat::Rgb888),
            4 => Some(PixelFormat::Rgb565),
            5 => Some(PixelFormat::L8),
            6 => Some(PixelFormat::A8),
            _ => None,
        }
    }
}

/// ### English
/// Format shared by every slot of a stream.
///
/// ### 中文
/// 流内所有槽位共享的格式描述。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescriptor {
    /// ### English
    /// Pixel layout.
    ///
    /// ### 中文
    /// 像素布局。
    pub pixel_format: PixelFormat,
    /// ### English
    /// Linear (non-sRGB) color space hint for the compositor.
    ///
    /// ### 中文
    /// 线性（非 sRGB）色彩空间提示，供合成器使用。
    pub linear: bool,
    /// ### English
    /// Alpha is premultiplied (hint only).
    ///
    /// ### 中文
    /// alpha 已预乘（仅为提示）。
    pub premultiplied: bool,
    /// ### English
    /// Row alignment in bytes; each row is padded up to a multiple of this (values below 1 act as 1).
    ///
    /// ### 中文
    /// 行对齐字节数；每行会补齐到其整数倍（小于 1 视为 1）。
    pub row_padding: u32,
}

impl FormatDescriptor {
    pub const fn new(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            linear: false,
            premultiplied: false,
            row_padding: 1,
        }
    }

    pub const fn with_row_padding(mut self, row_padding: u32) -> Self {
        self.row_padding = row_padding;
        self
    }

    pub const fn with_premultiplied(mut self, premultiplied: bool) -> Self {
        self.premultiplied = premultiplied;
        self
    }

    pub const fn with_linear(mut self, linear: bool) -> Self {
        self.linear = linear;
        self
    }
}

impl From<PixelFormat> for FormatDescriptor {
    fn from(value: PixelFormat) -> Self {
        Self::new(value)
    }
}

/// ### English
/// Immutable geometry of a stream: what `GetHeader` reports.
///
/// ### 中文
/// 流的不可变几何信息：即 `GetHeader` 返回的内容。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub size: PhysicalSize<u32>,
    pub stride: u32,
    pub format: FormatDescriptor,
    pub pixel_size: u32,
}

impl StreamHeader {
    /// ### English
    /// Derives stride and pixel size; rejects empty images and sizes that overflow.
    ///
    /// ### 中文
    /// 推导行跨度与像素大小；拒绝空图像以及会溢出的尺寸。
    pub fn compute(size: PhysicalSize<u32>, format: FormatDescriptor) -> Result<Self, StreamError> {
        if size.width == 0 || size.height == 0 {
            return Err(StreamError::InvalidArgument("width and height must be non-zero"));
        }

        let pixel_size = format.pixel_format.pixel_size();
        let padding = format.row_padding.max(1);
        let row = size
            .width
            .checked_mul(pixel_size)
            .ok_or(StreamError::OutOfMemory)?;
        let stride = row
            .div_ceil(padding)
            .checked_mul(padding)
            .ok_or(StreamError::OutOfMemory)?;

        let header = Self {
            size,
            stride,
            format,
            pixel_size,
        };
        header.checked_byte_len().ok_or(StreamError::OutOfMemory)?;
        Ok(header)
    }

    fn checked_byte_len(&self) -> Option<usize> {
        (self.stride as usize).checked_mul(self.size.height as usize)
    }

    /// ### English
    /// Bytes per slot (`stride * height`).
    ///
    /// ### 中文
    /// 每个槽位的字节数（`stride * height`）。
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.size.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_stride_for_default_padding() {
        let header =
            StreamHeader::compute(PhysicalSize::new(4, 4), PixelFormat::Argb8888.into()).unwrap();
        assert_eq!(header.stride, 16);
        assert_eq!(header.pixel_size, 4);
        assert_eq!(header.byte_len(), 64);
    }

    #[test]
    fn rows_are_padded_to_alignment() {
        let format = FormatDescriptor::new(PixelFormat::Rgb888).with_row_padding(8);
        let header = StreamHeader::compute(PhysicalSize::new(3, 2), format).unwrap();
        assert_eq!(header.stride, 16);
        assert_eq!(header.byte_len(), 32);
    }

    #[test]
    fn zero_padding_behaves_like_one() {
        let format = FormatDescriptor::new(PixelFormat::L8).with_row_padding(0);
        let header = StreamHeader::compute(PhysicalSize::new(7, 1), format).unwrap();
        assert_eq!(header.stride, 7);
    }

    #[test]
    fn empty_and_overflowing_sizes_are_rejected() {
        assert!(matches!(
            StreamHeader::compute(PhysicalSize::new(0, 4), PixelFormat::A8.into()),
            Err(StreamError::InvalidArgument(_))
        ));
        assert_eq!(
            StreamHeader::compute(PhysicalSize::new(u32::MAX, 2), PixelFormat::Argb8888.into()),
            Err(StreamError::OutOfMemory)
        );
    }

    #[test]
    fn raw_codes_round_trip() {
        for format in [
            PixelFormat::Argb8888,
            PixelFormat::Xrgb8888,
            PixelFormat::Rgb888,
            PixelFormat::Rgb565,
            PixelFormat::L8,
            PixelFormat::A8,
        ] {
            assert_eq!(PixelFormat::from_raw(format as u32), Some(format));
        }
        assert_eq!(PixelFormat::from_raw(0), None);
    }
}

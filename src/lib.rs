/// ### English
/// `xian_image_stream` crate root.
/// The Rust API lives under `engine` and is re-exported here; `ffi` exports the same
/// functionality as a C ABI for the cdylib.
///
/// ### 中文
/// `xian_image_stream` 的 crate 根。
/// Rust API 位于 `engine` 模块并在此重新导出；`ffi` 以 C ABI 形式为 cdylib 导出同样的功能。
pub mod engine;
pub mod ffi;

pub use dpi::PhysicalSize;
pub use engine::{
    ChannelSyncToken, FormatDescriptor, HandleMode, ImageProvider, ImageStream, ImageView,
    PixelFormat, ProviderId, ReadBuffer, SharedObserver, SharedSyncToken, SlotState, StreamConfig,
    StreamError, StreamHandle, StreamHeader, StreamId, StreamObserver, StreamRegistry, SyncOutcome,
    SyncToken, WriteBuffer,
};

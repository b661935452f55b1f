/// ### English
/// Stream engine internals (buffer pool state machine, wrappers, registry).
///
/// ### 中文
/// 流引擎内部模块（缓冲池状态机、包装器、注册表等）。
pub mod config;
pub mod error;
pub mod flags;
pub mod format;
pub mod handle;
pub mod image;
pub mod observer;
pub mod provider;
pub mod registry;
pub mod stream;
pub mod sync;
pub(crate) mod u32_hash;

pub use config::StreamConfig;
pub use error::StreamError;
pub use format::{FormatDescriptor, PixelFormat, StreamHeader};
pub use handle::{HandleMode, StreamHandle};
pub use image::ImageView;
pub use observer::{SharedObserver, StreamObserver};
pub use provider::{ImageProvider, ProviderId};
pub use registry::StreamRegistry;
pub use stream::{ImageStream, ReadBuffer, SlotState, StreamId, WriteBuffer};
pub use sync::{ChannelSyncToken, SharedSyncToken, SyncOutcome, SyncToken};

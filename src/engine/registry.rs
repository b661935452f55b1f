//! ### English
//! Arena of live streams addressed by opaque `StreamId`s.
//!
//! The registry owns one `ImageStream` per entry plus an explicit reference count, giving
//! callers that cannot hold Rust values (the C ABI) a handle-based contract: every operation on
//! an id whose entry is gone fails with `InvalidStream`. Ids are never reused while the process
//! lives, so a stale id can never alias a newer stream.
//!
//! ### 中文
//! 以不透明 `StreamId` 寻址的存活流 arena。
//!
//! 注册表为每个条目持有一个 `ImageStream` 以及显式引用计数，
//! 为无法持有 Rust 值的调用方（C ABI）提供基于句柄的契约：对已不存在条目的 id 执行任何操作
//! 都返回 `InvalidStream`。进程存活期间 id 不会复用，因此过期 id 不会指向更新的流。

use std::sync::OnceLock;

use parking_lot::Mutex;

use super::config::StreamConfig;
use super::error::StreamError;
use super::stream::{ImageStream, StreamId};
use super::u32_hash::U32HashMap;

struct RegistryEntry {
    stream: ImageStream,
    refs: u32,
}

#[derive(Default)]
pub struct StreamRegistry {
    entries: Mutex<U32HashMap<RegistryEntry>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Process-wide registry backing the C ABI.
    ///
    /// ### 中文
    /// 支撑 C ABI 的进程级注册表。
    pub fn global() -> &'static StreamRegistry {
        static GLOBAL_REGISTRY: OnceLock<StreamRegistry> = OnceLock::new();
        GLOBAL_REGISTRY.get_or_init(StreamRegistry::new)
    }

    /// ### English
    /// `CreateImageStream` with registry ownership: the new entry starts with one reference.
    ///
    /// ### 中文
    /// 由注册表持有的 `CreateImageStream`：新条目的引用计数为 1。
    pub fn create_image_stream(&self, config: StreamConfig) -> Result<StreamId, StreamError> {
        let stream = ImageStream::with_config(config)?;
        Ok(self.insert(stream))
    }

    /// ### English
    /// Adopts an existing stream (one registry reference) and returns its id.
    ///
    /// ### 中文
    /// 接管一个已有的流（注册表引用计数为 1）并返回其 id。
    pub fn insert(&self, stream: ImageStream) -> StreamId {
        let id = stream.id();
        let previous = self
            .entries
            .lock()
            .insert(id.get(), RegistryEntry { stream, refs: 1 });
        if let Some(previous) = previous {
            tracing::warn!(stream = id.get(), "stream registered twice; keeping the newer entry");
            drop(previous);
        }
        id
    }

    /// ### English
    /// Clones the stream behind `id`. The clone keeps the stream alive even if the entry is
    /// destroyed meanwhile.
    ///
    /// ### 中文
    /// 克隆 `id` 对应的流。即使条目随后被销毁，该克隆也会保持流存活。
    pub fn get(&self, id: StreamId) -> Result<ImageStream, StreamError> {
        self.entries
            .lock()
            .get(&id.get())
            .map(|entry| entry.stream.clone())
            .ok_or(StreamError::InvalidStream)
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.entries.lock().contains_key(&id.get())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ### English
    /// Returns the new registry reference count.
    ///
    /// ### 中文
    /// 返回新的注册表引用计数。
    pub fn add_reference(&self, id: StreamId) -> Result<u32, StreamError> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&id.get()).ok_or(StreamError::InvalidStream)?;
        entry.refs = entry.refs.checked_add(1).ok_or(StreamError::OutOfMemory)?;
        Ok(entry.refs)
    }

    /// ### English
    /// Drops one registry reference; the entry is destroyed when the count reaches zero.
    /// Returns the remaining count.
    ///
    /// ### 中文
    /// 减少一个注册表引用；计数归零时销毁条目。返回剩余计数。
    pub fn remove_reference(&self, id: StreamId) -> Result<u32, StreamError> {
        let removed = {
            let mut entries = self.entries.lock();
            let entry = entries.get_mut(&id.get()).ok_or(StreamError::InvalidStream)?;
            entry.refs -= 1;
            if entry.refs > 0 {
                return Ok(entry.refs);
            }
            entries.remove(&id.get())
        };
        // Teardown may signal tokens and run user code; never under the registry lock.
        drop(removed);
        Ok(0)
    }

    /// ### English
    /// `Destroy`: removes the entry regardless of its reference count. Wrappers that still hold
    /// the stream keep it alive until they let go.
    ///
    /// ### 中文
    /// `Destroy`：无论引用计数为多少都移除条目。仍持有该流的包装器会让流存活到它们释放为止。
    pub fn destroy(&self, id: StreamId) -> Result<(), StreamError> {
        let removed = self
            .entries
            .lock()
            .remove(&id.get())
            .ok_or(StreamError::InvalidStream)?;
        if removed.refs > 1 {
            tracing::warn!(
                stream = id.get(),
                refs = removed.refs,
                "stream destroyed with outstanding references"
            );
        }
        drop(removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dpi::PhysicalSize;

    use super::*;
    use crate::engine::format::PixelFormat;
    use crate::engine::sync::{ChannelSyncToken, SyncOutcome};

    fn config() -> StreamConfig {
        StreamConfig::new(PhysicalSize::new(4, 4), PixelFormat::Argb8888, 2)
    }

    #[test]
    fn created_stream_is_reachable_by_id() {
        let registry = StreamRegistry::new();
        let id = registry.create_image_stream(config()).unwrap();
        let stream = registry.get(id).unwrap();
        assert_eq!(stream.id(), id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_config_creates_nothing() {
        let registry = StreamRegistry::new();
        let err = registry
            .create_image_stream(StreamConfig::new(PhysicalSize::new(4, 4), PixelFormat::A8, 0))
            .unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn last_reference_removes_the_entry() {
        let registry = StreamRegistry::new();
        let id = registry.create_image_stream(config()).unwrap();
        assert_eq!(registry.add_reference(id), Ok(2));
        assert_eq!(registry.remove_reference(id), Ok(1));
        assert!(registry.contains(id));
        assert_eq!(registry.remove_reference(id), Ok(0));
        assert!(!registry.contains(id));
        assert_eq!(registry.remove_reference(id), Err(StreamError::InvalidStream));
        assert_eq!(registry.add_reference(id), Err(StreamError::InvalidStream));
    }

    #[test]
    fn destroy_is_unconditional() {
        let registry = StreamRegistry::new();
        let id = registry.create_image_stream(config()).unwrap();
        registry.add_reference(id).unwrap();
        assert_eq!(registry.destroy(id), Ok(()));
        assert_eq!(registry.get(id).unwrap_err(), StreamError::InvalidStream);
        assert_eq!(registry.destroy(id), Err(StreamError::InvalidStream));
    }

    #[test]
    fn outstanding_clone_outlives_the_entry() {
        let registry = StreamRegistry::new();
        let id = registry.create_image_stream(config()).unwrap();
        let stream = registry.get(id).unwrap();
        let (token, rx) = ChannelSyncToken::pair();
        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, Some(token));

        registry.destroy(id).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(stream.ref_count(), 1);
        drop(stream);
        assert_eq!(rx.try_recv(), Ok(SyncOutcome::Dropped));
    }

    #[test]
    fn ids_are_not_reused() {
        let registry = StreamRegistry::new();
        let first = registry.create_image_stream(config()).unwrap();
        registry.destroy(first).unwrap();
        let second = registry.create_image_stream(config()).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.get(first).unwrap_err(), StreamError::InvalidStream);
    }
}

//! ### English
//! Image provider: a consumer-side cache that keeps one `ImageView` alive across lock cycles.
//!
//! Unlike `StreamHandle`, the cached view is allocated once and rebound to each newly acquired
//! buffer. Creation performs one lock/unlock round to prove the stream yields an image.
//!
//! ### 中文
//! 图像 provider：消费端缓存，在多次加锁周期间复用同一个 `ImageView`。
//!
//! 与 `StreamHandle` 不同，缓存的视图只分配一次，之后每次重新绑定到新 acquire 的缓冲上。
//! 创建时会进行一次加锁/解锁，以确认该流能够产出图像。

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dpi::PhysicalSize;
use parking_lot::{Condvar, Mutex};

use super::error::StreamError;
use super::image::ImageView;
use super::stream::{ImageStream, ReadBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u32);

impl ProviderId {
    pub fn get(self) -> u32 {
        self.0
    }

    fn allocate() -> Result<Self, StreamError> {
        static NEXT_PROVIDER_ID: AtomicU32 = AtomicU32::new(1);
        NEXT_PROVIDER_ID
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .map(Self)
            .map_err(|_| StreamError::OutOfMemory)
    }
}

#[derive(Default)]
struct ProviderState {
    lock_count: u32,
    locking: bool,
    held: Option<ReadBuffer>,
    cached: Option<Arc<ImageView>>,
}

pub struct ImageProvider {
    id: ProviderId,
    stream: ImageStream,
    state: Mutex<ProviderState>,
    settled: Condvar,
}

impl std::fmt::Debug for ImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProvider")
            .field("id", &self.id)
            .field("stream", &self.stream.id())
            .field("lock_count", &self.state.lock().lock_count)
            .finish()
    }
}

impl ImageProvider {
    /// ### English
    /// Creates a provider over `stream`, holding one stream reference.
    ///
    /// Consumes one committed frame to validate the stream. The validation never waits, even on
    /// a blocking stream.
    ///
    /// #### Errors
    /// `InvalidStream` if no frame is ready at that point.
    ///
    /// ### 中文
    /// 在 `stream` 上创建 provider，并持有一个流引用。
    ///
    /// 为验证该流会消费一帧已提交的图像。即使流处于阻塞模式，验证也不会等待。
    ///
    /// #### 错误
    /// 若此时没有就绪帧，返回 `InvalidStream`。
    pub fn new(stream: &ImageStream) -> Result<Self, StreamError> {
        let provider = Self {
            id: ProviderId::allocate()?,
            stream: stream.clone(),
            state: Mutex::new(ProviderState::default()),
            settled: Condvar::new(),
        };

        let has_image = provider.lock(false).is_some();
        provider.unlock();
        if !has_image {
            tracing::debug!(
                stream = stream.id().get(),
                "image provider rejected: stream produced no image"
            );
            return Err(StreamError::InvalidStream);
        }

        tracing::debug!(
            provider = provider.id.get(),
            stream = stream.id().get(),
            "image provider created"
        );
        Ok(provider)
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn stream(&self) -> &ImageStream {
        &self.stream
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.stream.header().size
    }

    pub fn lock_count(&self) -> u32 {
        self.state.lock().lock_count
    }

    /// ### English
    /// Locks the newest frame. The first lock of a cycle acquires a buffer and rebinds the cached
    /// view to it; nested locks return the cached view as is.
    ///
    /// ### 中文
    /// 锁定最新帧。每个周期的首次加锁会 acquire 缓冲并把缓存视图重新绑定到该缓冲；
    /// 嵌套加锁直接返回缓存视图。
    pub fn lock_for_reading(&self) -> Option<Arc<ImageView>> {
        self.lock(true)
    }

    /// ### English
    /// The stream acquire runs with the provider mutex released; concurrent first locks queue
    /// behind a pending one.
    ///
    /// ### 中文
    /// 从流 acquire 时会释放 provider 互斥锁；并发的首次加锁会排在挂起的那次之后。
    fn lock(&self, may_wait: bool) -> Option<Arc<ImageView>> {
        let mut state = self.state.lock();
        while state.locking {
            self.settled.wait(&mut state);
        }
        if state.lock_count > 0 {
            state.lock_count += 1;
            return state.cached.clone();
        }
        state.locking = true;
        drop(state);

        let acquired = if may_wait {
            self.stream.acquire_read_buffer()
        } else {
            self.stream.try_acquire_read_buffer()
        };
        let acquired = acquired.and_then(|buffer| match self.stream.buffer_ptr(buffer.slot()) {
            Some(pixels) => Some((buffer, pixels)),
            None => {
                self.stream.release_read_buffer(buffer);
                None
            }
        });

        let mut state = self.state.lock();
        state.locking = false;
        self.settled.notify_all();
        let (buffer, pixels) = acquired?;

        let view = if let Some(view) = state.cached.clone() {
            view.rebind(pixels);
            view
        } else {
            let view = Arc::new(ImageView::bind(self.stream.header(), pixels));
            state.cached = Some(view.clone());
            view
        };
        tracing::trace!(provider = self.id.get(), slot = buffer.slot(), "provider locked");
        state.held = Some(buffer);
        state.lock_count = 1;
        Some(view)
    }

    /// ### English
    /// Undoes one lock; the last unlock unbinds the cached view and releases the buffer.
    ///
    /// ### 中文
    /// 撤销一次加锁；最后一次解锁会解绑缓存视图并释放缓冲。
    pub fn unlock(&self) {
        let mut state = self.state.lock();
        if state.lock_count == 0 {
            return;
        }
        state.lock_count -= 1;
        if state.lock_count == 0 {
            Self::release(&self.stream, &mut state);
        }
    }

    fn release(stream: &ImageStream, state: &mut ProviderState) {
        if let Some(view) = &state.cached {
            view.unbind();
        }
        if let Some(buffer) = state.held.take() {
            stream.release_read_buffer(buffer);
        }
    }
}

impl Drop for ImageProvider {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.lock_count != 0 {
            tracing::warn!(
                provider = self.id.get(),
                lock_count = state.lock_count,
                "image provider destroyed with unbalanced locks; releasing its buffer"
            );
            state.lock_count = 0;
            Self::release(&self.stream, state);
        }
        state.cached = None;
        tracing::debug!(provider = self.id.get(), "image provider destroyed");
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::engine::format::PixelFormat;
    use crate::engine::stream::SlotState;

    fn stream_with_frames(frames: usize) -> ImageStream {
        let stream =
            ImageStream::create(PhysicalSize::new(3, 2), PixelFormat::Rgb888, 2).unwrap();
        stream.set_blocking(false);
        for _ in 0..frames {
            let buffer = stream.acquire_write_buffer().unwrap();
            stream.release_write_buffer(buffer, None);
        }
        stream
    }

    #[test]
    fn creation_requires_an_image() {
        let stream = stream_with_frames(0);
        assert_eq!(ImageProvider::new(&stream).unwrap_err(), StreamError::InvalidStream);
        assert_eq!(stream.ref_count(), 1);
    }

    #[test]
    fn creation_on_an_empty_blocking_stream_fails_without_waiting() {
        let stream =
            ImageStream::create(PhysicalSize::new(3, 2), PixelFormat::Rgb888, 2).unwrap();
        assert!(stream.is_blocking());
        assert_eq!(ImageProvider::new(&stream).unwrap_err(), StreamError::InvalidStream);
        assert_eq!(stream.ref_count(), 1);
    }

    #[test]
    fn waiting_lock_leaves_the_provider_usable() {
        let stream = stream_with_frames(1);
        let provider = Arc::new(ImageProvider::new(&stream).unwrap());
        stream.set_blocking(true);

        let waiter = provider.clone();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let blocked = std::thread::spawn(move || {
            tx.send(waiter.lock_for_reading().is_some()).unwrap();
        });
        std::thread::sleep(std::time::Duration::from_millis(20));

        let owner = provider.clone();
        let (size_tx, size_rx) = crossbeam_channel::bounded(1);
        let sizer = std::thread::spawn(move || {
            size_tx.send((owner.lock_count(), owner.size())).unwrap();
        });
        assert_eq!(
            size_rx.recv_timeout(std::time::Duration::from_secs(5)),
            Ok((0, PhysicalSize::new(3, 2)))
        );
        sizer.join().unwrap();

        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(5)), Ok(true));
        blocked.join().unwrap();
        assert_eq!(provider.lock_count(), 1);
        provider.unlock();
    }

    #[test]
    fn creation_consumes_the_validation_frame() {
        let stream = stream_with_frames(1);
        let provider = ImageProvider::new(&stream).unwrap();
        assert_eq!(stream.ref_count(), 2);
        assert_eq!(provider.lock_count(), 0);
        assert_eq!(provider.size(), PhysicalSize::new(3, 2));
        assert_eq!(stream.slot_states(), vec![SlotState::Free; 2]);
        assert!(provider.lock_for_reading().is_none());
    }

    #[test]
    fn provider_ids_are_distinct() {
        let stream = stream_with_frames(2);
        let a = ImageProvider::new(&stream).unwrap();
        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        let b = ImageProvider::new(&stream).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn cached_view_is_rebound_not_reallocated() {
        let stream = stream_with_frames(1);
        let provider = ImageProvider::new(&stream).unwrap();

        let mut views = Vec::new();
        for _ in 0..3 {
            let buffer = stream.acquire_write_buffer().unwrap();
            stream.release_write_buffer(buffer, None);
            let view = provider.lock_for_reading().unwrap();
            assert!(view.is_bound());
            assert_eq!(view.size(), PhysicalSize::new(3, 2));
            provider.unlock();
            assert!(!view.is_bound());
            views.push(view);
        }
        assert!(views.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn nested_locks_return_the_cached_view() {
        let stream = stream_with_frames(2);
        let provider = ImageProvider::new(&stream).unwrap();
        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);

        let outer = provider.lock_for_reading().unwrap();
        let inner = provider.lock_for_reading().unwrap();
        assert!(Arc::ptr_eq(&outer, &inner));
        provider.unlock();
        assert!(outer.is_bound());
        provider.unlock();
        assert!(!outer.is_bound());
        provider.unlock();
        assert_eq!(provider.lock_count(), 0);
    }

    #[traced_test]
    #[test]
    fn dropping_a_locked_provider_is_reported_and_cleaned_up() {
        let stream = stream_with_frames(1);
        let provider = ImageProvider::new(&stream).unwrap();
        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);

        let view = provider.lock_for_reading().unwrap();
        drop(provider);

        assert!(logs_contain("unbalanced locks"));
        assert!(!view.is_bound());
        assert_eq!(stream.slot_states(), vec![SlotState::Free; 2]);
        assert_eq!(stream.ref_count(), 1);
    }
}

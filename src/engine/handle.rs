//! ### English
//! Use-counted, lock-counted wrapper over an `ImageStream`.
//!
//! Several logical owners (e.g. composition elements sharing one source) share a single
//! `StreamHandle` instead of driving acquire/release themselves. Two counters are involved and
//! they are never conflated:
//! - `use_count` counts owners of this wrapper;
//! - the wrapper itself holds exactly one stream reference, released only when `use_count`
//!   reaches zero through `destroy` (or when the wrapper is dropped).
//!
//! `lock_count` is re-entrant: the first lock acquires a buffer and binds a fresh view, nested
//! locks return that same view, and the matching last unlock releases the buffer.
//!
//! ### 中文
//! 基于 `ImageStream` 的使用计数 + 加锁计数包装器。
//!
//! 多个逻辑持有者（例如共享同一来源的多个合成元素）共享一个 `StreamHandle`，而不必各自调用
//! acquire/release。这里涉及两个互不混淆的计数：
//! - `use_count` 统计该包装器的持有者；
//! - 包装器本身只持有一个流引用，仅当 `use_count` 经由 `destroy` 归零（或包装器被 drop）时释放。
//!
//! `lock_count` 可重入：首次加锁 acquire 缓冲并绑定新的视图，嵌套加锁返回同一视图，
//! 与之匹配的最后一次解锁释放缓冲。

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dpi::PhysicalSize;
use parking_lot::{Condvar, Mutex};

use super::image::ImageView;
use super::stream::{ImageStream, ReadBuffer, WriteBuffer};

/// ### English
/// Which end of the stream a handle drives.
///
/// ### 中文
/// 句柄驱动流的哪一端。
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleMode {
    Read = 0,
    Write = 1,
}

enum Held {
    Nothing,
    Read(ReadBuffer),
    Write(WriteBuffer),
}

impl Held {
    fn give_back(self, stream: &ImageStream) {
        match self {
            Held::Nothing => {}
            Held::Read(buffer) => stream.release_read_buffer(buffer),
            Held::Write(buffer) => stream.release_write_buffer(buffer, None),
        }
    }
}

struct HandleState {
    stream: Option<ImageStream>,
    lock_count: u32,
    /// ### English
    /// A first lock is acquiring from the stream with the handle mutex released.
    ///
    /// ### 中文
    /// 首次加锁正在释放句柄互斥锁的情况下从流中 acquire。
    locking: bool,
    held: Held,
    view: Option<Arc<ImageView>>,
}

impl HandleState {
    /// ### English
    /// Unbinds the view and gives the held buffer back. Write buffers are committed without a
    /// token since the state machine has no abort transition.
    ///
    /// ### 中文
    /// 解绑视图并归还持有的缓冲。由于状态机没有“放弃写入”的转换，写缓冲会以无令牌方式提交。
    fn release_held(&mut self) {
        if let Some(view) = self.view.take() {
            view.unbind();
        }
        let held = std::mem::replace(&mut self.held, Held::Nothing);
        if let Some(stream) = self.stream.as_ref() {
            held.give_back(stream);
        }
    }
}

pub struct StreamHandle {
    mode: HandleMode,
    use_count: AtomicU32,
    state: Mutex<HandleState>,
    /// ### English
    /// Signaled when a pending first lock settles.
    ///
    /// ### 中文
    /// 挂起中的首次加锁完成时通知。
    settled: Condvar,
}

impl StreamHandle {
    /// ### English
    /// Wraps `stream`, taking one stream reference. `use_count = 1`, `lock_count = 0`.
    ///
    /// ### 中文
    /// 包装 `stream` 并持有一个流引用。`use_count = 1`，`lock_count = 0`。
    pub fn new(stream: &ImageStream, mode: HandleMode) -> Self {
        tracing::debug!(stream = stream.id().get(), ?mode, "stream handle created");
        Self {
            mode,
            use_count: AtomicU32::new(1),
            state: Mutex::new(HandleState {
                stream: Some(stream.clone()),
                lock_count: 0,
                locking: false,
                held: Held::Nothing,
                view: None,
            }),
            settled: Condvar::new(),
        }
    }

    pub fn mode(&self) -> HandleMode {
        self.mode
    }

    /// ### English
    /// Adds an owner. Returns the new use count.
    ///
    /// ### 中文
    /// 增加一个持有者，返回新的使用计数。
    pub fn add_reference(&self) -> u32 {
        self.use_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// ### English
    /// Removes an owner without destroying anything (saturates at zero). Returns the new use count.
    ///
    /// ### 中文
    /// 移除一个持有者但不触发销毁（到 0 为止）。返回新的使用计数。
    pub fn remove_reference(&self) -> u32 {
        match self
            .use_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => 0,
        }
    }

    pub fn use_count(&self) -> u32 {
        self.use_count.load(Ordering::Acquire)
    }

    /// ### English
    /// Two-stage destroy: drops one owner, and once no owner is left releases the stream reference.
    ///
    /// Returns `true` only for the call that actually tore the wrapper down. A buffer still held
    /// at that point is released defensively and logged.
    ///
    /// ### 中文
    /// 两阶段销毁：先减少一个持有者，当不再有持有者时释放流引用。
    ///
    /// 只有真正完成销毁的那次调用返回 `true`。若此时仍持有缓冲，会防御性地释放并记录日志。
    pub fn destroy(&self) -> bool {
        if self.remove_reference() > 0 {
            return false;
        }
        self.teardown()
    }

    fn teardown(&self) -> bool {
        let mut state = self.state.lock();
        if state.stream.is_none() {
            return false;
        }
        if state.lock_count > 0 {
            tracing::warn!(
                lock_count = state.lock_count,
                "stream handle destroyed while locked; releasing its buffer"
            );
            state.lock_count = 0;
            state.release_held();
        }
        if let Some(stream) = state.stream.take() {
            tracing::debug!(stream = stream.id().get(), "stream handle destroyed");
        }
        true
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().stream.is_none()
    }

    /// ### English
    /// The wrapped stream, `None` after destruction.
    ///
    /// ### 中文
    /// 被包装的流；销毁后为 `None`。
    pub fn stream(&self) -> Option<ImageStream> {
        self.state.lock().stream.clone()
    }

    pub fn lock_count(&self) -> u32 {
        self.state.lock().lock_count
    }

    /// ### English
    /// Locks the newest frame for reading and returns its view.
    ///
    /// Re-entrant: while already locked, returns the same view without acquiring again. Returns
    /// `None` for write-mode handles, after destruction, or when no frame can be acquired
    /// (non-blocking stream with nothing committed).
    ///
    /// ### 中文
    /// 以读方式锁定最新帧并返回其视图。
    ///
    /// 可重入：已加锁时返回同一视图且不会再次 acquire。对写模式句柄、销毁之后，
    /// 或无法获取帧（非阻塞流且尚无提交）时返回 `None`。
    pub fn lock_for_reading(&self) -> Option<Arc<ImageView>> {
        if self.mode != HandleMode::Read {
            tracing::warn!("lock_for_reading called on a write-mode stream handle");
            return None;
        }
        self.lock_with(|stream| {
            let buffer = stream.acquire_read_buffer()?;
            match stream.buffer_ptr(buffer.slot()) {
                Some(pixels) => Some((Held::Read(buffer), pixels)),
                None => {
                    stream.release_read_buffer(buffer);
                    None
                }
            }
        })
    }

    /// ### English
    /// Locks a free slot for writing; the matching last `unlock` commits it.
    ///
    /// ### 中文
    /// 以写方式锁定一个空闲槽位；与之匹配的最后一次 `unlock` 会提交该帧。
    pub fn lock_for_writing(&self) -> Option<Arc<ImageView>> {
        if self.mode != HandleMode::Write {
            tracing::warn!("lock_for_writing called on a read-mode stream handle");
            return None;
        }
        self.lock_with(|stream| {
            let buffer = stream.acquire_write_buffer()?;
            match stream.buffer_ptr(buffer.slot()) {
                Some(pixels) => Some((Held::Write(buffer), pixels)),
                None => {
                    stream.release_write_buffer(buffer, None);
                    None
                }
            }
        })
    }

    /// ### English
    /// Shared first-lock path. The stream acquire runs with the handle mutex released so other
    /// owners can keep using the handle while it waits; concurrent first locks queue behind it.
    ///
    /// ### 中文
    /// 共用的首次加锁流程。从流 acquire 时会释放句柄互斥锁，使其它持有者在等待期间仍可使用句柄；
    /// 并发的首次加锁会排在其后。
    fn lock_with(
        &self,
        acquire: impl FnOnce(&ImageStream) -> Option<(Held, std::ptr::NonNull<u8>)>,
    ) -> Option<Arc<ImageView>> {
        let mut state = self.state.lock();
        while state.locking {
            self.settled.wait(&mut state);
        }
        if state.lock_count > 0 {
            state.lock_count += 1;
            return state.view.clone();
        }

        let stream = state.stream.clone()?;
        state.locking = true;
        drop(state);

        let acquired = acquire(&stream);

        let mut state = self.state.lock();
        state.locking = false;
        self.settled.notify_all();
        let (held, pixels) = acquired?;
        if state.stream.is_none() {
            drop(state);
            tracing::debug!("stream handle destroyed while locking; returning the buffer");
            held.give_back(&stream);
            return None;
        }

        let view = Arc::new(ImageView::bind(stream.header(), pixels));
        state.held = held;
        state.view = Some(view.clone());
        state.lock_count = 1;
        Some(view)
    }

    /// ### English
    /// Undoes one lock. The last unlock unbinds the view and releases the buffer; unlocking an
    /// unlocked handle does nothing.
    ///
    /// ### 中文
    /// 撤销一次加锁。最后一次解锁会解绑视图并释放缓冲；对未加锁的句柄解锁不做任何事。
    pub fn unlock(&self) {
        let mut state = self.state.lock();
        if state.lock_count == 0 {
            return;
        }
        state.lock_count -= 1;
        if state.lock_count == 0 {
            state.release_held();
        }
    }

    /// ### English
    /// `GetSize`: width and height of the wrapped stream, `None` after destruction.
    ///
    /// ### 中文
    /// `GetSize`：被包装流的宽高；销毁后为 `None`。
    pub fn size(&self) -> Option<PhysicalSize<u32>> {
        self.state
            .lock()
            .stream
            .as_ref()
            .map(|stream| stream.header().size)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use crossbeam_channel as channel;

    use super::*;
    use crate::engine::format::PixelFormat;
    use crate::engine::stream::SlotState;

    fn committed_stream(buffers: usize) -> ImageStream {
        let stream =
            ImageStream::create(PhysicalSize::new(2, 2), PixelFormat::Argb8888, buffers).unwrap();
        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        stream
    }

    #[test]
    fn creation_takes_one_stream_reference() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        assert_eq!(stream.ref_count(), 2);
        assert_eq!(handle.use_count(), 1);
        assert_eq!(handle.lock_count(), 0);
        assert_eq!(handle.size(), Some(PhysicalSize::new(2, 2)));
    }

    #[test]
    fn destroy_is_two_stage() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        assert_eq!(handle.add_reference(), 2);

        assert!(!handle.destroy());
        assert_eq!(stream.ref_count(), 2);
        assert!(handle.destroy());
        assert_eq!(stream.ref_count(), 1);
        assert!(!handle.destroy());
        assert!(handle.is_destroyed());
        assert!(handle.lock_for_reading().is_none());
        assert_eq!(handle.size(), None);
    }

    #[test]
    fn remove_reference_never_destroys() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        assert_eq!(handle.remove_reference(), 0);
        assert_eq!(handle.remove_reference(), 0);
        assert!(!handle.is_destroyed());
        assert_eq!(stream.ref_count(), 2);
        assert!(handle.destroy());
    }

    #[test]
    fn nested_locks_share_one_view_and_one_buffer() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);

        let first = handle.lock_for_reading().unwrap();
        let second = handle.lock_for_reading().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(handle.lock_count(), 2);

        handle.unlock();
        assert!(first.is_bound());
        assert!(stream.slot_states().contains(&SlotState::Reading));

        handle.unlock();
        assert!(!first.is_bound());
        assert!(!stream.slot_states().contains(&SlotState::Reading));

        handle.unlock();
        assert_eq!(handle.lock_count(), 0);
    }

    #[test]
    fn each_lock_cycle_binds_a_fresh_view() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        let first = handle.lock_for_reading().unwrap();
        handle.unlock();

        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        let second = handle.lock_for_reading().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        handle.unlock();
    }

    #[test]
    fn lock_fails_without_a_frame_in_non_blocking_mode() {
        let stream =
            ImageStream::create(PhysicalSize::new(2, 2), PixelFormat::Argb8888, 2).unwrap();
        stream.set_blocking(false);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        assert!(handle.lock_for_reading().is_none());
        assert_eq!(handle.lock_count(), 0);
    }

    #[test]
    fn write_handle_commits_on_last_unlock() {
        let stream =
            ImageStream::create(PhysicalSize::new(2, 2), PixelFormat::L8, 2).unwrap();
        let writer = StreamHandle::new(&stream, HandleMode::Write);
        assert!(writer.lock_for_reading().is_none());

        let view = writer.lock_for_writing().unwrap();
        unsafe { view.pixels_mut().unwrap() }.fill(0xAB);
        writer.unlock();

        let read = stream.acquire_read_buffer().unwrap();
        assert!(stream.read_pixels(&read).unwrap().iter().all(|b| *b == 0xAB));
        stream.release_read_buffer(read);
    }

    #[test]
    fn destroying_a_locked_handle_releases_the_buffer() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        let view = handle.lock_for_reading().unwrap();
        assert!(handle.destroy());
        assert!(!view.is_bound());
        assert_eq!(stream.slot_states(), vec![SlotState::Free; 2]);
    }

    #[test]
    fn dropping_the_wrapper_releases_its_reference() {
        let stream = committed_stream(2);
        let handle = StreamHandle::new(&stream, HandleMode::Read);
        let _view = handle.lock_for_reading().unwrap();
        drop(handle);
        assert_eq!(stream.ref_count(), 1);
        assert_eq!(stream.slot_states(), vec![SlotState::Free; 2]);
    }

    fn empty_blocking_stream() -> ImageStream {
        ImageStream::create(PhysicalSize::new(2, 2), PixelFormat::Argb8888, 2).unwrap()
    }

    /// Waits until a first lock holds its temporary stream clone, i.e. is inside the acquire.
    fn wait_until_acquiring(stream: &ImageStream) {
        for _ in 0..5000 {
            if stream.ref_count() == 3 {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("first lock never reached the stream");
    }

    fn spawn_lock(handle: &Arc<StreamHandle>) -> (thread::JoinHandle<()>, channel::Receiver<bool>) {
        let waiter = handle.clone();
        let (tx, rx) = channel::bounded(1);
        let join = thread::spawn(move || {
            tx.send(waiter.lock_for_reading().is_some()).unwrap();
        });
        (join, rx)
    }

    #[test]
    fn other_owners_are_not_stalled_by_a_waiting_lock() {
        let stream = empty_blocking_stream();
        let handle = Arc::new(StreamHandle::new(&stream, HandleMode::Read));
        handle.add_reference();
        let (blocked, locked) = spawn_lock(&handle);
        wait_until_acquiring(&stream);

        let owner = handle.clone();
        let (tx, rx) = channel::bounded(1);
        let sizer = thread::spawn(move || {
            tx.send((owner.size(), owner.lock_count(), owner.stream().is_some())).unwrap();
        });
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok((Some(PhysicalSize::new(2, 2)), 0, true))
        );
        sizer.join().unwrap();
        assert!(locked.try_recv().is_err());

        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        assert_eq!(locked.recv_timeout(Duration::from_secs(5)), Ok(true));
        blocked.join().unwrap();
        assert_eq!(handle.lock_count(), 1);
        handle.unlock();
        assert!(!handle.destroy());
        assert!(handle.destroy());
    }

    #[test]
    fn concurrent_first_locks_share_one_buffer() {
        let stream = empty_blocking_stream();
        let handle = Arc::new(StreamHandle::new(&stream, HandleMode::Read));
        let (first, first_rx) = spawn_lock(&handle);
        let (second, second_rx) = spawn_lock(&handle);
        wait_until_acquiring(&stream);

        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        assert_eq!(first_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        assert_eq!(second_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        first.join().unwrap();
        second.join().unwrap();

        assert_eq!(handle.lock_count(), 2);
        assert_eq!(
            stream.slot_states().iter().filter(|s| **s == SlotState::Reading).count(),
            1
        );
        handle.unlock();
        handle.unlock();
        assert!(!stream.slot_states().contains(&SlotState::Reading));
    }

    #[test]
    fn destroy_during_a_waiting_lock_returns_the_buffer() {
        let stream = empty_blocking_stream();
        let handle = Arc::new(StreamHandle::new(&stream, HandleMode::Read));
        let (blocked, locked) = spawn_lock(&handle);
        wait_until_acquiring(&stream);

        assert!(handle.destroy());
        let buffer = stream.acquire_write_buffer().unwrap();
        stream.release_write_buffer(buffer, None);
        assert_eq!(locked.recv_timeout(Duration::from_secs(5)), Ok(false));
        blocked.join().unwrap();

        assert_eq!(stream.slot_states(), vec![SlotState::Free; 2]);
        assert_eq!(stream.ref_count(), 1);
    }
}

//! ### English
//! Native image stream: a fixed pool of pixel buffers handed from one producer to one consumer.
//!
//! All slot transitions, pending sync tokens, flags and the observer list live behind a single
//! per-stream mutex; one condition variable wakes blocked acquirers. Observer dispatch and token
//! signaling always run after the lock is released.
//!
//! Lifetime is shared ownership: cloning an `ImageStream` adds a reference, dropping one removes
//! it, and the pool is torn down when the last reference goes away.
//!
//! ### 中文
//! 原生图像流：固定数量的像素缓冲池，在单一生产者与单一消费者之间交接。
//!
//! 所有槽位转换、挂起的同步令牌、标记位与观察者列表都由每个流唯一的互斥锁保护；
//! 一个条件变量用于唤醒阻塞中的 acquire。观察者分发与令牌 signal 始终在释放锁之后执行。
//!
//! 生命周期采用共享所有权：clone `ImageStream` 即增加引用，drop 即减少引用，
//! 最后一个引用消失时销毁缓冲池。

mod acquire;
mod flags;
mod notify;
mod publish;
mod release;
mod slot;

use std::num::NonZeroU32;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dpi::PhysicalSize;
use parking_lot::{Condvar, Mutex};

use super::config::StreamConfig;
use super::error::StreamError;
use super::format::{FormatDescriptor, StreamHeader};
use super::observer::ObserverList;
use super::sync::SyncOutcome;

pub use slot::{ReadBuffer, SlotState, WriteBuffer};
use slot::{SlotMeta, SlotStorage};

/// ### English
/// Process-unique stream identity (never 0, never reused while the process lives).
///
/// ### 中文
/// 进程内唯一的流标识（不为 0，进程存活期间不复用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(NonZeroU32);

impl StreamId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    fn allocate() -> Result<Self, StreamError> {
        static NEXT_STREAM_ID: AtomicU32 = AtomicU32::new(1);
        NEXT_STREAM_ID
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .ok()
            .and_then(Self::new)
            .ok_or(StreamError::OutOfMemory)
    }
}

pub(super) struct StreamState {
    slots: Box<[SlotMeta]>,
    writing: Option<usize>,
    reading: Option<usize>,
    ready: Option<usize>,
    last_frame_seq: u64,
    blocking: bool,
    notifications: bool,
    protected: bool,
    flip: bool,
    observers: ObserverList,
}

impl StreamState {
    fn first_free(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.state == SlotState::Free)
    }
}

struct StreamShared {
    id: StreamId,
    header: StreamHeader,
    storage: Box<[SlotStorage]>,
    state: Mutex<StreamState>,
    /// ### English
    /// Signaled on every commit, read release and blocking-mode change.
    ///
    /// ### 中文
    /// 每次提交、读释放以及阻塞模式变化时都会通知。
    changed: Condvar,
}

impl Drop for StreamShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let pending: Vec<_> = state
            .slots
            .iter_mut()
            .filter_map(|slot| slot.pending_sync.take())
            .collect();
        let observers = state.observers.len();
        state.observers.clear();

        tracing::debug!(
            stream = self.id.get(),
            buffers = self.storage.len(),
            observers,
            pending_tokens = pending.len(),
            "image stream destroyed"
        );

        for token in pending {
            token.signal(SyncOutcome::Dropped);
        }
    }
}

/// ### English
/// Shared handle to a native image stream.
///
/// ### 中文
/// 原生图像流的共享句柄。
#[derive(Clone)]
pub struct ImageStream {
    shared: Arc<StreamShared>,
}

impl std::fmt::Debug for ImageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStream")
            .field("id", &self.shared.id)
            .field("header", &self.shared.header)
            .field("buffers", &self.shared.storage.len())
            .finish()
    }
}

impl ImageStream {
    /// ### English
    /// `CreateImageStream`: blocking, notifications disabled, all slots `Free`, one reference.
    ///
    /// #### Errors
    /// - `InvalidArgument` if `buffer_count < 1` or the size is empty.
    /// - `OutOfMemory` if the pool cannot be allocated.
    ///
    /// ### 中文
    /// `CreateImageStream`：阻塞模式、关闭通知、所有槽位为 `Free`、引用计数为 1。
    ///
    /// #### 错误
    /// - `buffer_count < 1` 或尺寸为空时返回 `InvalidArgument`。
    /// - 无法分配缓冲池时返回 `OutOfMemory`。
    pub fn create(
        size: PhysicalSize<u32>,
        format: impl Into<FormatDescriptor>,
        buffer_count: usize,
    ) -> Result<Self, StreamError> {
        Self::with_config(StreamConfig::new(size, format, buffer_count))
    }

    pub fn with_config(config: StreamConfig) -> Result<Self, StreamError> {
        if config.buffer_count < 1 {
            return Err(StreamError::InvalidArgument("buffer_count must be at least 1"));
        }

        let header = StreamHeader::compute(config.size, config.format)?;
        let byte_len = header.byte_len();

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(config.buffer_count)
            .map_err(|_| StreamError::OutOfMemory)?;
        for _ in 0..config.buffer_count {
            storage.push(SlotStorage::allocate(byte_len)?);
        }

        let id = StreamId::allocate()?;
        let state = StreamState {
            slots: (0..config.buffer_count).map(|_| SlotMeta::new()).collect(),
            writing: None,
            reading: None,
            ready: None,
            last_frame_seq: 0,
            blocking: config.blocking,
            notifications: config.notifications,
            protected: config.protected,
            flip: config.flip,
            observers: ObserverList::default(),
        };

        tracing::debug!(
            stream = id.get(),
            width = header.size.width,
            height = header.size.height,
            stride = header.stride,
            buffers = config.buffer_count,
            "image stream created"
        );

        Ok(Self {
            shared: Arc::new(StreamShared {
                id,
                header,
                storage: storage.into_boxed_slice(),
                state: Mutex::new(state),
                changed: Condvar::new(),
            }),
        })
    }

    pub fn id(&self) -> StreamId {
        self.shared.id
    }

    /// ### English
    /// `GetHeader`: size, stride, format and pixel size.
    ///
    /// ### 中文
    /// `GetHeader`：尺寸、行跨度、格式与像素大小。
    pub fn header(&self) -> StreamHeader {
        self.shared.header
    }

    pub fn buffer_count(&self) -> usize {
        self.shared.storage.len()
    }

    /// ### English
    /// Number of live references to this stream (wrappers included).
    ///
    /// ### 中文
    /// 该流当前的存活引用数（包括各类包装器持有的引用）。
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// ### English
    /// Whether two handles refer to the same stream.
    ///
    /// ### 中文
    /// 两个句柄是否指向同一个流。
    pub fn same_stream(&self, other: &ImageStream) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// ### English
    /// `GetBufferPtr`: raw pixel pointer for `slot`, only while the slot is held
    /// (`Writing` or `Reading`). Returns `None` otherwise.
    ///
    /// The pointer stays valid while the slot stays held and the stream is alive.
    ///
    /// ### 中文
    /// `GetBufferPtr`：返回 `slot` 的原始像素指针，仅在槽位被持有（`Writing` 或 `Reading`）时有效，
    /// 否则返回 `None`。
    ///
    /// 只要槽位保持被持有且流存活，该指针就保持有效。
    pub fn buffer_ptr(&self, slot: usize) -> Option<NonNull<u8>> {
        let state = self.shared.state.lock();
        let held = matches!(
            state.slots.get(slot)?.state,
            SlotState::Writing | SlotState::Reading
        );
        if !held {
            return None;
        }
        NonNull::new(self.shared.storage[slot].as_mut_ptr())
    }

    /// ### English
    /// Mutable pixels of a held write buffer. `None` if the buffer belongs to another stream.
    ///
    /// ### 中文
    /// 已持有写缓冲的可变像素；若该缓冲属于其它流则返回 `None`。
    pub fn write_pixels<'a>(&'a self, buffer: &'a mut WriteBuffer) -> Option<&'a mut [u8]> {
        let storage = self.owned_storage(buffer.stream, buffer.slot)?;
        Some(unsafe { std::slice::from_raw_parts_mut(storage.as_mut_ptr(), storage.len()) })
    }

    /// ### English
    /// Pixels of a held read buffer. `None` if the buffer belongs to another stream.
    ///
    /// ### 中文
    /// 已持有读缓冲的像素；若该缓冲属于其它流则返回 `None`。
    pub fn read_pixels<'a>(&'a self, buffer: &'a ReadBuffer) -> Option<&'a [u8]> {
        let storage = self.owned_storage(buffer.stream, buffer.slot)?;
        Some(unsafe { std::slice::from_raw_parts(storage.as_mut_ptr(), storage.len()) })
    }

    fn owned_storage(&self, stream: StreamId, slot: usize) -> Option<&SlotStorage> {
        if stream != self.shared.id {
            return None;
        }
        self.shared.storage.get(slot)
    }

    /// ### English
    /// Snapshot of every slot state (diagnostics and tests).
    ///
    /// ### 中文
    /// 所有槽位状态的快照（用于诊断与测试）。
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.shared
            .state
            .lock()
            .slots
            .iter()
            .map(|slot| slot.state)
            .collect()
    }
}

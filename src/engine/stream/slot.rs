use std::ptr::NonNull;

use super::super::error::StreamError;
use super::super::sync::SharedSyncToken;
use super::StreamId;

/// ### English
/// Buffer slot state machine: `Free -> Writing -> Ready -> Reading -> Free`.
///
/// A `Ready` slot that is superseded by a newer commit before it is read goes back to `Free`.
/// When no slot is `Free`, the producer reclaims the unread `Ready` slot (`Ready -> Writing`).
///
/// ### 中文
/// 缓冲槽位状态机：`Free -> Writing -> Ready -> Reading -> Free`。
///
/// 若 `Ready` 槽位在被读取前被更新的提交取代，则直接回到 `Free`。
/// 没有 `Free` 槽位时，生产者会回收未读的 `Ready` 槽位（`Ready -> Writing`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    Free,
    Writing,
    Ready,
    Reading,
}

/// ### English
/// Per-slot bookkeeping guarded by the stream lock.
///
/// ### 中文
/// 由流锁保护的每槽位簿记信息。
pub(super) struct SlotMeta {
    pub(super) state: SlotState,
    /// ### English
    /// Token of the commit currently parked in this slot; taken (never cloned) before signaling.
    ///
    /// ### 中文
    /// 当前停留在该槽位的提交所附带的令牌；signal 前会被取走（不会被复制）。
    pub(super) pending_sync: Option<SharedSyncToken>,
    pub(super) frame_seq: u64,
}

impl SlotMeta {
    pub(super) fn new() -> Self {
        Self {
            state: SlotState::Free,
            pending_sync: None,
            frame_seq: 0,
        }
    }
}

/// ### English
/// Pixel storage for one slot. Only the context holding the slot (`Writing` or `Reading`)
/// touches the bytes; the state machine under the stream lock decides who that is.
///
/// ### 中文
/// 单个槽位的像素存储。只有持有该槽位（`Writing` 或 `Reading`）的一方会访问这些字节；
/// 由流锁下的状态机决定持有者。
pub(super) struct SlotStorage {
    pixels: NonNull<[u8]>,
}

unsafe impl Send for SlotStorage {}
unsafe impl Sync for SlotStorage {}

impl SlotStorage {
    pub(super) fn allocate(byte_len: usize) -> Result<Self, StreamError> {
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(byte_len)
            .map_err(|_| StreamError::OutOfMemory)?;
        pixels.resize(byte_len, 0u8);
        let pixels = Box::into_raw(pixels.into_boxed_slice());
        Ok(Self {
            // Box::into_raw never yields null.
            pixels: unsafe { NonNull::new_unchecked(pixels) },
        })
    }

    #[inline]
    pub(super) fn as_mut_ptr(&self) -> *mut u8 {
        self.pixels.as_ptr().cast()
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.pixels.len()
    }
}

impl Drop for SlotStorage {
    fn drop(&mut self) {
        drop(unsafe { Box::from_raw(self.pixels.as_ptr()) });
    }
}

/// ### English
/// Producer-side claim on a `Writing` slot. Move-only; give it back with
/// `ImageStream::release_write_buffer` to commit.
///
/// ### 中文
/// 生产者对 `Writing` 槽位的占有凭证。仅可移动；通过 `ImageStream::release_write_buffer`
/// 归还即完成提交。
#[must_use = "a write buffer must be released to commit the frame"]
#[derive(Debug, PartialEq, Eq)]
pub struct WriteBuffer {
    pub(super) stream: StreamId,
    pub(super) slot: usize,
}

impl WriteBuffer {
    /// ### English
    /// Slot index inside the pool.
    ///
    /// ### 中文
    /// 池内槽位索引。
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub(crate) fn from_raw(stream: StreamId, slot: usize) -> Self {
        Self { stream, slot }
    }
}

/// ### English
/// Consumer-side claim on a `Reading` slot. Move-only; give it back with
/// `ImageStream::release_read_buffer`.
///
/// ### 中文
/// 消费者对 `Reading` 槽位的占有凭证。仅可移动；通过 `ImageStream::release_read_buffer` 归还。
#[must_use = "a read buffer must be released so the producer can reuse the slot"]
#[derive(Debug, PartialEq, Eq)]
pub struct ReadBuffer {
    pub(super) stream: StreamId,
    pub(super) slot: usize,
    pub(super) frame_seq: u64,
}

impl ReadBuffer {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// ### English
    /// Commit sequence number of the frame held in this slot (starts at 1, monotonic per stream).
    ///
    /// ### 中文
    /// 该槽位中帧的提交序号（从 1 开始，每个流单调递增）。
    pub fn frame_seq(&self) -> u64 {
        self.frame_seq
    }

    pub(crate) fn from_raw(stream: StreamId, slot: usize) -> Self {
        Self {
            stream,
            slot,
            frame_seq: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_is_zeroed_and_sized() {
        let storage = SlotStorage::allocate(12).unwrap();
        assert_eq!(storage.len(), 12);
        let bytes = unsafe { std::slice::from_raw_parts(storage.as_mut_ptr(), storage.len()) };
        assert!(bytes.iter().all(|&byte| byte == 0));
    }

    #[test]
    fn storage_pointer_is_stable_across_writes() {
        let storage = SlotStorage::allocate(4).unwrap();
        let first = storage.as_mut_ptr();
        unsafe { first.add(3).write(0x7f) };
        assert_eq!(storage.as_mut_ptr(), first);
        assert_eq!(unsafe { first.add(3).read() }, 0x7f);
    }
}

//! ### English
//! Acquire side of the slot state machine (`Free -> Writing`, `Ready -> Writing`,
//! `Ready -> Reading`).
//!
//! In blocking mode both calls wait on the stream condition variable until a slot becomes
//! eligible; in non-blocking mode they return `None` immediately. There is no timeout and no
//! cancellation: a caller blocked here keeps its stream reference alive, so the stream cannot be
//! torn down underneath it, but nothing wakes it except an opposing release or switching the
//! stream to non-blocking mode.
//!
//! ### 中文
//! 槽位状态机的 acquire 侧（`Free -> Writing`，`Ready -> Writing`，`Ready -> Reading`）。
//!
//! 阻塞模式下两者都会在流的条件变量上等待，直到有符合条件的槽位；非阻塞模式下立即返回 `None`。
//! 没有超时也没有取消：阻塞在此的调用方持有流引用，因此流不会在其下方被销毁，
//! 但只有对端 release 或把流切换为非阻塞模式才能唤醒它。

use super::super::sync::SyncOutcome;
use super::{ImageStream, ReadBuffer, SlotState, WriteBuffer};

impl ImageStream {
    /// ### English
    /// Claims a slot for the producer, preferring a `Free` one.
    ///
    /// When no slot is free, the unread `Ready` frame is reclaimed (drop-latest-wins) and its
    /// token is signaled `Dropped`. Waits or returns `None` only while every slot is held, or
    /// when the producer already holds a write buffer.
    ///
    /// ### 中文
    /// 为生产者占用一个槽位，优先选择 `Free` 槽位。
    ///
    /// 没有空闲槽位时，会回收尚未读取的 `Ready` 帧（最新者胜出），其令牌以 `Dropped` signal。
    /// 仅当所有槽位都被持有，或生产者已持有写缓冲时，才会等待或返回 `None`。
    pub fn acquire_write_buffer(&self) -> Option<WriteBuffer> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        let (slot, reclaimed) = loop {
            if let Some(held) = state.writing {
                tracing::warn!(
                    stream = shared.id.get(),
                    slot = held,
                    "write buffer requested while the producer still holds one"
                );
                return None;
            }

            if let Some(slot) = state.first_free() {
                tracing::trace!(stream = shared.id.get(), slot, "slot free -> writing");
                break (slot, None);
            }

            if let Some(slot) = state.ready.take() {
                let meta = &mut state.slots[slot];
                tracing::trace!(
                    stream = shared.id.get(),
                    slot,
                    frame_seq = meta.frame_seq,
                    "unread frame reclaimed, slot ready -> writing"
                );
                break (slot, meta.pending_sync.take());
            }

            if !state.blocking {
                return None;
            }
            shared.changed.wait(&mut state);
        };

        state.slots[slot].state = SlotState::Writing;
        state.writing = Some(slot);
        drop(state);

        if let Some(token) = reclaimed {
            token.signal(SyncOutcome::Dropped);
        }
        Some(WriteBuffer {
            stream: shared.id,
            slot,
        })
    }

    /// ### English
    /// Claims the most recently committed `Ready` slot for the consumer.
    ///
    /// Returns `None` when the consumer already holds a read buffer, or when nothing is ready and
    /// the stream is non-blocking.
    ///
    /// ### 中文
    /// 为消费者占用最近一次提交的 `Ready` 槽位。
    ///
    /// 若消费者已持有读缓冲，或没有就绪帧且流为非阻塞模式，则返回 `None`。
    pub fn acquire_read_buffer(&self) -> Option<ReadBuffer> {
        self.acquire_read(true)
    }

    /// ### English
    /// Like `acquire_read_buffer` but never waits, whatever the blocking mode.
    ///
    /// ### 中文
    /// 与 `acquire_read_buffer` 相同，但无论阻塞模式如何都不会等待。
    pub fn try_acquire_read_buffer(&self) -> Option<ReadBuffer> {
        self.acquire_read(false)
    }

    fn acquire_read(&self, may_wait: bool) -> Option<ReadBuffer> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        loop {
            if let Some(held) = state.reading {
                tracing::warn!(
                    stream = shared.id.get(),
                    slot = held,
                    "read buffer requested while the consumer still holds one"
                );
                return None;
            }

            if let Some(slot) = state.ready.take() {
                let meta = &mut state.slots[slot];
                meta.state = SlotState::Reading;
                let frame_seq = meta.frame_seq;
                state.reading = Some(slot);
                tracing::trace!(stream = shared.id.get(), slot, frame_seq, "slot ready -> reading");
                return Some(ReadBuffer {
                    stream: shared.id,
                    slot,
                    frame_seq,
                });
            }

            if !may_wait || !state.blocking {
                return None;
            }
            shared.changed.wait(&mut state);
        }
    }
}

//! ### English
//! Producer commit (`Writing -> Ready`) with drop-latest-wins supersession and observer fan-out.
//!
//! ### 中文
//! 生产者提交（`Writing -> Ready`），包含“最新者胜出”的丢帧替换与观察者通知分发。

use super::super::observer;
use super::super::sync::{SharedSyncToken, SyncOutcome};
use super::{ImageStream, SlotState, WriteBuffer};

impl ImageStream {
    /// ### English
    /// Commits a write buffer as the newest frame.
    ///
    /// An older `Ready` slot that was never read returns to `Free` and its token (if any) is
    /// signaled `Dropped`. `sync` stays pending on the new slot until it is consumed or dropped.
    /// If notifications are enabled, observers run after the lock is released.
    ///
    /// Releasing a buffer the producer does not hold is ignored; its `sync` token is signaled
    /// `Dropped` right away since the frame never entered the stream.
    ///
    /// #### Parameters
    /// - `buffer`: Write buffer returned by `acquire_write_buffer`.
    /// - `sync`: Optional completion token for this commit.
    ///
    /// ### 中文
    /// 将写缓冲提交为最新帧。
    ///
    /// 若存在从未被读取的旧 `Ready` 槽位，它会回到 `Free`，其令牌（若有）以 `Dropped` signal。
    /// `sync` 会挂在新槽位上，直到被消费或被丢弃。若启用了通知，观察者在释放锁之后执行。
    ///
    /// 若释放的缓冲并非生产者当前持有的缓冲，则忽略该调用；由于帧从未进入流，
    /// 其 `sync` 令牌会立即以 `Dropped` signal。
    ///
    /// #### 参数
    /// - `buffer`：`acquire_write_buffer` 返回的写缓冲。
    /// - `sync`：本次提交的可选完成令牌。
    pub fn release_write_buffer(&self, buffer: WriteBuffer, sync: Option<SharedSyncToken>) {
        let shared = &*self.shared;
        let mut superseded = None;

        let observers = {
            let mut state = shared.state.lock();
            if buffer.stream != shared.id || state.writing != Some(buffer.slot) {
                drop(state);
                tracing::warn!(
                    stream = shared.id.get(),
                    slot = buffer.slot,
                    "ignoring release of a write buffer the producer does not hold"
                );
                if let Some(token) = sync {
                    token.signal(SyncOutcome::Dropped);
                }
                return;
            }
            state.writing = None;

            if let Some(previous) = state.ready.take() {
                let meta = &mut state.slots[previous];
                meta.state = SlotState::Free;
                superseded = meta.pending_sync.take();
                tracing::trace!(
                    stream = shared.id.get(),
                    slot = previous,
                    frame_seq = meta.frame_seq,
                    "unread frame superseded, slot ready -> free"
                );
            }

            state.last_frame_seq += 1;
            let frame_seq = state.last_frame_seq;
            let meta = &mut state.slots[buffer.slot];
            meta.state = SlotState::Ready;
            meta.pending_sync = sync;
            meta.frame_seq = frame_seq;
            state.ready = Some(buffer.slot);
            tracing::trace!(
                stream = shared.id.get(),
                slot = buffer.slot,
                frame_seq,
                "slot writing -> ready"
            );

            if state.notifications {
                state.observers.snapshot()
            } else {
                Vec::new()
            }
        };

        shared.changed.notify_all();
        if let Some(token) = superseded {
            token.signal(SyncOutcome::Dropped);
        }
        observer::dispatch(shared.id, &observers);
    }
}

//! ### English
//! Consumer release (`Reading -> Free`).
//!
//! ### 中文
//! 消费者释放（`Reading -> Free`）。

use super::super::sync::SyncOutcome;
use super::{ImageStream, ReadBuffer, SlotState};

impl ImageStream {
    /// ### English
    /// Returns a read buffer to the pool. A pending token is signaled `Consumed` exactly once.
    ///
    /// Releasing a buffer the consumer does not hold is ignored.
    ///
    /// ### 中文
    /// 将读缓冲归还到池中。挂起的令牌会以 `Consumed` 恰好 signal 一次。
    ///
    /// 若释放的缓冲并非消费者当前持有的缓冲，则忽略该调用。
    pub fn release_read_buffer(&self, buffer: ReadBuffer) {
        let shared = &*self.shared;
        let consumed = {
            let mut state = shared.state.lock();
            if buffer.stream != shared.id || state.reading != Some(buffer.slot) {
                tracing::warn!(
                    stream = shared.id.get(),
                    slot = buffer.slot,
                    "ignoring release of a read buffer the consumer does not hold"
                );
                return;
            }
            state.reading = None;

            let meta = &mut state.slots[buffer.slot];
            meta.state = SlotState::Free;
            tracing::trace!(stream = shared.id.get(), slot = buffer.slot, "slot reading -> free");
            meta.pending_sync.take()
        };

        shared.changed.notify_all();
        if let Some(token) = consumed {
            token.signal(SyncOutcome::Consumed);
        }
    }
}

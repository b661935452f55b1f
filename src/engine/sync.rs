//! ### English
//! Completion tokens attached to commits.
//!
//! A token is owned by the caller; the stream only keeps a shared reference while the committed
//! slot is pending and calls `signal` exactly once: `Consumed` when the consumer releases the
//! buffer, `Dropped` when a newer commit supersedes it unread (or the stream is torn down first).
//!
//! ### 中文
//! 附加在提交上的完成令牌。
//!
//! 令牌归调用方所有；流只在已提交槽位挂起期间持有其共享引用，并且恰好调用一次 `signal`：
//! 消费者释放缓冲时为 `Consumed`，在被读取前被更新的提交取代（或流先被销毁）时为 `Dropped`。

use std::sync::Arc;

use crossbeam_channel as channel;

/// ### English
/// How a committed buffer left the stream.
///
/// ### 中文
/// 已提交缓冲离开流的方式。
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    Consumed = 1,
    Dropped = 2,
}

/// ### English
/// External synchronization primitive signaled by the stream.
///
/// ### 中文
/// 由流负责 signal 的外部同步原语。
pub trait SyncToken: Send + Sync {
    fn signal(&self, outcome: SyncOutcome);
}

impl<F> SyncToken for F
where
    F: Fn(SyncOutcome) + Send + Sync,
{
    fn signal(&self, outcome: SyncOutcome) {
        self(outcome)
    }
}

/// ### English
/// Shared token reference stored in a pending slot.
///
/// ### 中文
/// 挂起槽位中保存的令牌共享引用。
pub type SharedSyncToken = Arc<dyn SyncToken>;

/// ### English
/// Token that forwards its outcome into a channel, for callers that prefer to wait on a receiver.
///
/// ### 中文
/// 将结果转发到 channel 的令牌，适合希望在接收端等待的调用方。
pub struct ChannelSyncToken {
    tx: channel::Sender<SyncOutcome>,
}

impl ChannelSyncToken {
    /// ### English
    /// Creates a token plus the receiver its outcome is delivered to.
    ///
    /// ### 中文
    /// 创建令牌以及接收其结果的接收端。
    pub fn pair() -> (Arc<Self>, channel::Receiver<SyncOutcome>) {
        let (tx, rx) = channel::unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl SyncToken for ChannelSyncToken {
    fn signal(&self, outcome: SyncOutcome) {
        if self.tx.send(outcome).is_err() {
            tracing::trace!(?outcome, "sync token receiver already dropped");
        }
    }
}

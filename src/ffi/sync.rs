//! ### English
//! C sync tokens: a `(callback, token)` pair owned by the embedder.
//!
//! ### 中文
//! C 同步令牌：由宿主持有的 `(callback, token)` 二元组。

use crate::engine::sync::{SyncOutcome, SyncToken};

/// ### English
/// Sync callback. `outcome` is `1` (consumed) or `2` (dropped); it is invoked exactly once per
/// commit, possibly from another thread.
///
/// ### 中文
/// 同步回调。`outcome` 为 `1`（已消费）或 `2`（已丢弃）；每次提交恰好调用一次，可能在其它线程上调用。
pub type XianImageStreamSyncFn = extern "C" fn(token: u64, outcome: u32);

pub(super) struct CSyncToken {
    signal: XianImageStreamSyncFn,
    token: u64,
}

impl CSyncToken {
    pub(super) fn new(signal: XianImageStreamSyncFn, token: u64) -> Self {
        Self { signal, token }
    }
}

impl SyncToken for CSyncToken {
    fn signal(&self, outcome: SyncOutcome) {
        (self.signal)(self.token, outcome as u32)
    }
}

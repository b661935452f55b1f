//! ### English
//! Observer registrations and commit fan-out.
//!
//! Registrations are kept in insertion order. Duplicates are allowed; removal matches the
//! strict `(observer key, user_data)` pair and removes the earliest match only.
//!
//! ### 中文
//! 观察者注册与提交通知分发。
//!
//! 注册按插入顺序保存，允许重复；移除时严格按 `(observer key, user_data)` 二元组匹配，
//! 且只移除最早的一条。

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::error::StreamError;
use super::stream::StreamId;

/// ### English
/// Receives commit notifications from a stream.
///
/// ### 中文
/// 接收流的提交通知。
pub trait StreamObserver: Send + Sync {
    /// ### English
    /// Called after a buffer was committed, with the stream identity and the user data given at
    /// registration. Runs on the producer thread with the stream unlocked.
    ///
    /// ### 中文
    /// 缓冲提交后被调用，参数为流标识与注册时提供的 user data。
    /// 在生产者线程上运行，此时流未加锁。
    fn on_buffer_committed(&self, stream: StreamId, user_data: usize);

    /// ### English
    /// Identity used for removal. Defaults to the observer's address.
    ///
    /// ### 中文
    /// 用于移除匹配的身份标识，默认取观察者地址。
    fn observer_key(&self) -> usize {
        self as *const Self as *const () as usize
    }
}

impl<F> StreamObserver for F
where
    F: Fn(StreamId, usize) + Send + Sync,
{
    fn on_buffer_committed(&self, stream: StreamId, user_data: usize) {
        self(stream, user_data)
    }
}

pub type SharedObserver = Arc<dyn StreamObserver>;

#[derive(Clone)]
pub(crate) struct ObserverEntry {
    observer: SharedObserver,
    user_data: usize,
}

#[derive(Default)]
pub(crate) struct ObserverList {
    entries: Vec<ObserverEntry>,
}

impl ObserverList {
    pub(crate) fn push(&mut self, observer: SharedObserver, user_data: usize) {
        self.entries.push(ObserverEntry {
            observer,
            user_data,
        });
    }

    pub(crate) fn remove(&mut self, key: usize, user_data: usize) -> Result<(), StreamError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.observer.observer_key() == key && entry.user_data == user_data)
            .ok_or(StreamError::InvalidObserver)?;
        self.entries.remove(index);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<ObserverEntry> {
        self.entries.clone()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// ### English
/// Delivers one commit to every observer in `snapshot`, in order.
///
/// A panicking observer is logged and skipped; the remaining observers still run.
///
/// ### 中文
/// 按顺序将一次提交通知投递给 `snapshot` 中的每个观察者。
///
/// 若某个观察者 panic，则记录日志并跳过，其余观察者照常执行。
pub(crate) fn dispatch(stream: StreamId, snapshot: &[ObserverEntry]) {
    for (index, entry) in snapshot.iter().enumerate() {
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
            entry
                .observer
                .on_buffer_committed(stream, entry.user_data)
        }));
        if delivered.is_err() {
            tracing::error!(
                stream = stream.get(),
                observer = index,
                user_data = entry.user_data,
                "stream observer panicked; continuing with remaining observers"
            );
        }
    }
}

use super::super::error::StreamError;
use super::super::observer::SharedObserver;
use super::ImageStream;

impl ImageStream {
    /// ### English
    /// Appends an observer registration. The same observer may be registered more than once.
    ///
    /// ### 中文
    /// 追加一条观察者注册；同一观察者可重复注册。
    pub fn add_observer(&self, observer: SharedObserver, user_data: usize) {
        self.shared.state.lock().observers.push(observer, user_data);
    }

    /// ### English
    /// Removes the earliest registration matching `(observer, user_data)`.
    ///
    /// #### Errors
    /// `InvalidObserver` if no registration matches.
    ///
    /// ### 中文
    /// 移除与 `(observer, user_data)` 匹配的最早一条注册。
    ///
    /// #### 错误
    /// 若没有匹配项则返回 `InvalidObserver`。
    pub fn remove_observer(
        &self,
        observer: &SharedObserver,
        user_data: usize,
    ) -> Result<(), StreamError> {
        self.remove_observer_key(observer.observer_key(), user_data)
    }

    pub(crate) fn remove_observer_key(&self, key: usize, user_data: usize) -> Result<(), StreamError> {
        self.shared.state.lock().observers.remove(key, user_data)
    }

    pub fn observer_count(&self) -> usize {
        self.shared.state.lock().observers.len()
    }
}

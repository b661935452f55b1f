use super::ImageStream;

impl ImageStream {
    /// ### English
    /// Switches blocking mode. Waiters are woken so that switching to non-blocking releases them
    /// with `None`.
    ///
    /// ### 中文
    /// 切换阻塞模式。会唤醒等待者，因此切换为非阻塞后它们会以 `None` 返回。
    pub fn set_blocking(&self, blocking: bool) {
        self.shared.state.lock().blocking = blocking;
        self.shared.changed.notify_all();
    }

    pub fn is_blocking(&self) -> bool {
        self.shared.state.lock().blocking
    }

    /// ### English
    /// Advisory flag: non-owning callers should not destroy a protected stream.
    ///
    /// ### 中文
    /// 建议性标记：非持有方不应销毁受保护的流。
    pub fn set_protection_flag(&self, protected: bool) {
        self.shared.state.lock().protected = protected;
    }

    pub fn protection_flag(&self) -> bool {
        self.shared.state.lock().protected
    }

    /// ### English
    /// Orientation hint for the compositor; the stream never interprets it.
    ///
    /// ### 中文
    /// 提供给合成器的方向提示；流本身不解释该值。
    pub fn set_flip_state(&self, flip: bool) {
        self.shared.state.lock().flip = flip;
    }

    pub fn flip_state(&self) -> bool {
        self.shared.state.lock().flip
    }

    /// ### English
    /// Gates observer dispatch on commit.
    ///
    /// ### 中文
    /// 控制提交时是否分发观察者通知。
    pub fn enable_update_notifications(&self, enabled: bool) {
        self.shared.state.lock().notifications = enabled;
    }

    pub fn notifications_enabled(&self) -> bool {
        self.shared.state.lock().notifications
    }
}

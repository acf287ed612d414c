//! Mock 发布客户端
//!
//! 记录所有发布的消息，并可手动触发（重）连接回调。

use crate::error::PublishError;
use crate::publisher::{ConnectCallback, PublishClient};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// 已发布的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

struct ConnectHook(ConnectCallback);

#[derive(Default)]
struct MockInner {
    published: Mutex<Vec<PublishedMessage>>,
    hook: ArcSwapOption<ConnectHook>,
    connects: AtomicUsize,
    fail_publishes: AtomicBool,
}

/// Mock 发布客户端
///
/// `Clone` 共享同一内部状态。
#[derive(Clone, Default)]
pub struct MockPublishClient {
    inner: Arc<MockInner>,
}

impl MockPublishClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟一次连接成功（调用已注册的回调）
    pub fn simulate_connect(&self) {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.inner.hook.load_full() {
            (hook.0)();
        }
    }

    /// 之后的发布全部返回 `QueueFull`
    pub fn fail_publishes(&self, fail: bool) {
        self.inner.fail_publishes.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.published.lock().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.inner.published.lock().len()
    }

    pub fn last_message(&self) -> Option<PublishedMessage> {
        self.inner.published.lock().last().cloned()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }
}

impl PublishClient for MockPublishClient {
    fn on_connect(&self, callback: ConnectCallback) {
        self.inner.hook.store(Some(Arc::new(ConnectHook(callback))));
    }

    fn connect(&self) -> Result<(), PublishError> {
        self.simulate_connect();
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        if self.inner.fail_publishes.load(Ordering::SeqCst) {
            return Err(PublishError::QueueFull);
        }
        self.inner.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }
}

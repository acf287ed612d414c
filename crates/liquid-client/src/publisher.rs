//! 去重发布器
//!
//! # 状态所有权
//!
//! 最后已知状态（`last_status`）由 `StatusPublisher` 独占，放在一把互斥锁后面，
//! 只有两个入口：
//!
//! - [`StatusPublisher::apply_delta`]：测量循环线程，变化时才发布
//! - [`StatusPublisher::republish_unconditionally`]：客户端事件线程（重连回调），无条件重发
//!
//! 发布在持锁期间完成，两条路径的发布顺序与状态替换顺序一致。

use crate::error::PublishError;
use liquid_tools::{PartialStatus, PayloadLayout, StatusSnapshot};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{info, warn};

/// (重)连接回调
///
/// 可能在客户端的后台线程上调用。
pub type ConnectCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// 发布客户端抽象
///
/// 连接失败后的重连与退避由实现自行负责；发布器只响应成功的（重）连接事件。
pub trait PublishClient: Send + Sync {
    /// 注册（重）连接回调，每次连接成功后调用
    fn on_connect(&self, callback: ConnectCallback);

    /// 开始连接（非阻塞，连接在后台建立）
    fn connect(&self) -> Result<(), PublishError>;

    /// 发布一条消息
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError>;
}

impl<T: PublishClient + ?Sized> PublishClient for Arc<T> {
    fn on_connect(&self, callback: ConnectCallback) {
        (**self).on_connect(callback)
    }

    fn connect(&self) -> Result<(), PublishError> {
        (**self).connect()
    }

    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        (**self).publish(topic, payload, retain)
    }
}

/// 一次增量更新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// 状态变化，已发布
    Published,
    /// 渲染结果与上次相同，未发布
    Unchanged,
}

/// 去重发布器
pub struct StatusPublisher<C> {
    client: C,
    topic: String,
    layout: PayloadLayout,
    last_status: Mutex<StatusSnapshot>,
}

impl<C: PublishClient> StatusPublisher<C> {
    pub fn new(
        client: C,
        topic: impl Into<String>,
        initial: StatusSnapshot,
        layout: PayloadLayout,
    ) -> Self {
        Self {
            client,
            topic: topic.into(),
            layout,
            last_status: Mutex::new(initial),
        }
    }

    /// 合并增量；渲染结果变化时替换快照并以 retain 方式发布
    ///
    /// 发布失败时快照仍会被替换，下一次重连会重发该快照。
    pub fn apply_delta(&self, delta: &PartialStatus) -> Result<PublishOutcome, PublishError> {
        let mut last = self.last_status.lock();
        let candidate = last.overlay(delta);

        let candidate_payload = candidate.render(self.layout)?;
        if candidate_payload == last.render(self.layout)? {
            return Ok(PublishOutcome::Unchanged);
        }

        *last = candidate;
        self.client.publish(&self.topic, &candidate_payload, true)?;
        info!("Status updated on {}: {}", self.topic, candidate_payload);
        Ok(PublishOutcome::Published)
    }

    /// `apply_delta` 的按值版本
    pub fn update(&self, delta: PartialStatus) -> Result<PublishOutcome, PublishError> {
        self.apply_delta(&delta)
    }

    /// 跳过差异检查，重发当前快照（刷新 broker 的 retained 消息）
    pub fn republish_unconditionally(&self) -> Result<(), PublishError> {
        let last = self.last_status.lock();
        let payload = last.render(self.layout)?;
        self.client.publish(&self.topic, &payload, true)?;
        info!("Status republished on {}: {}", self.topic, payload);
        Ok(())
    }

    /// 当前快照副本
    pub fn last_status(&self) -> StatusSnapshot {
        *self.last_status.lock()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn layout(&self) -> PayloadLayout {
        self.layout
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: PublishClient + 'static> StatusPublisher<C> {
    /// 创建共享发布器并注册重连回调
    ///
    /// 回调只持有 `Weak` 引用，客户端与发布器之间不形成引用环。
    pub fn shared(
        client: C,
        topic: impl Into<String>,
        initial: StatusSnapshot,
        layout: PayloadLayout,
    ) -> Arc<Self> {
        let publisher = Arc::new(Self::new(client, topic, initial, layout));
        let weak: Weak<Self> = Arc::downgrade(&publisher);

        publisher.client.on_connect(Box::new(move || {
            if let Some(publisher) = weak.upgrade()
                && let Err(e) = publisher.republish_unconditionally()
            {
                warn!("Failed to republish status after connect: {}", e);
            }
        }));

        publisher
    }
}

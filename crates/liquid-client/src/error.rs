//! 发布层错误类型定义

use thiserror::Error;

/// 发布层错误类型
#[derive(Error, Debug)]
pub enum PublishError {
    /// 载荷编码失败
    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// 发送队列已满（客户端未连接或网络阻塞）
    #[error("Publish queue full")]
    QueueFull,

    /// 客户端错误
    #[error("Client error: {0}")]
    Client(String),

    /// 连接建立失败
    #[error("Connection setup failed: {0}")]
    Connection(String),

    /// 传输安全配置错误
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 公共广播出口
///
/// 投递给调用时刻之后、实际分发时刻仍在线的所有会话，不保留历史。
#[async_trait]
pub trait MessageBroadcaster: Send + Sync {
    async fn broadcast(&self, message: String) -> Result<(), BroadcastError>;
}

//! 进程内广播中心
//!
//! 所有公共消息先进入一条无界通道，由唯一的转发任务逐条取出，再按当时的
//! 在线表分发到各会话邮箱。转发任务只会短暂持有注册表读锁，注册表的写方
//! 也从不等待转发任务，两者不会互相等待。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broadcaster::{BroadcastError, MessageBroadcaster};
use crate::presence::PresenceRegistry;

#[derive(Debug, Clone)]
pub struct BroadcastHub {
    sender: mpsc::UnboundedSender<String>,
}

impl BroadcastHub {
    /// 创建广播中心并启动转发任务
    ///
    /// 所有 `BroadcastHub` 克隆都被丢弃后，转发任务处理完剩余消息自行结束。
    pub fn start(registry: Arc<PresenceRegistry>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let relay = tokio::spawn(relay(registry, receiver));
        (Self { sender }, relay)
    }
}

async fn relay(registry: Arc<PresenceRegistry>, mut receiver: mpsc::UnboundedReceiver<String>) {
    while let Some(message) = receiver.recv().await {
        let delivered = registry.deliver_all(&message).await;
        tracing::debug!(delivered, "广播已分发");
    }
    tracing::info!("广播转发任务结束");
}

#[async_trait]
impl MessageBroadcaster for BroadcastHub {
    async fn broadcast(&self, message: String) -> Result<(), BroadcastError> {
        self.sender
            .send(message)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::mailbox;
    use crate::presence::SessionHandle;
    use domain::SessionId;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_broadcast_reaches_every_registered_session() {
        let registry = Arc::new(PresenceRegistry::new());
        let (hub, _relay) = BroadcastHub::start(registry.clone());

        let mut mailboxes = Vec::new();
        for i in 0..3 {
            let (sender, receiver) = mailbox();
            let address = format!("10.0.0.{i}:1");
            let handle = SessionHandle::new(
                SessionId::new(),
                address.clone(),
                sender,
                CancellationToken::new(),
            );
            registry.register(address, Arc::new(handle)).await.unwrap();
            mailboxes.push(receiver);
        }

        hub.broadcast("first".to_string()).await.unwrap();
        hub.broadcast("second".to_string()).await.unwrap();

        for mailbox in mailboxes.iter_mut() {
            assert_eq!(mailbox.recv().await.as_deref(), Some("first"));
            assert_eq!(mailbox.recv().await.as_deref(), Some("second"));
        }
    }

    #[tokio::test]
    async fn test_relay_stops_when_hub_dropped() {
        let registry = Arc::new(PresenceRegistry::new());
        let (hub, relay) = BroadcastHub::start(registry);

        hub.broadcast("nobody listening".to_string()).await.unwrap();
        drop(hub);

        relay.await.expect("relay exits cleanly");
    }
}

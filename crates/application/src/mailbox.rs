//! 会话私有的出站消息队列
//!
//! 任意多个发送端，唯一的接收端由会话自己持有。队列无界，投递方不会因为
//! 某个会话写 socket 慢而被阻塞；同一队列内保持先进先出。

use thiserror::Error;
use tokio::sync::mpsc;

/// 邮箱已关闭，消息未被接收
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mailbox closed")]
pub struct MailboxClosed;

/// 创建一个邮箱，返回发送端和接收端
pub fn mailbox() -> (MailboxSender, Mailbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (MailboxSender { sender }, Mailbox { receiver })
}

/// 邮箱发送端，可以随意克隆给其他组件
#[derive(Debug, Clone)]
pub struct MailboxSender {
    sender: mpsc::UnboundedSender<String>,
}

impl MailboxSender {
    pub fn send(&self, message: impl Into<String>) -> Result<(), MailboxClosed> {
        self.sender.send(message.into()).map_err(|_| MailboxClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// 邮箱接收端，只有所属会话可以读取
#[derive(Debug)]
pub struct Mailbox {
    receiver: mpsc::UnboundedReceiver<String>,
}

impl Mailbox {
    /// 等待下一条消息；关闭且取空后返回 `None`
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// 拒绝后续投递，已入队的消息仍可以取出
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

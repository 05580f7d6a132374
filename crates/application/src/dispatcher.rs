//! 命令分发
//!
//! 把一行入站文本解析成 [`Command`] 并在注册表、广播中心或目标邮箱上执行。
//! 可恢复的错误以一行文本回复给发起方，不会中断会话。

use std::sync::Arc;

use domain::{wire, Command, DomainError, SessionId};

use crate::broadcaster::MessageBroadcaster;
use crate::error::ApplicationError;
use crate::mailbox::MailboxSender;
use crate::presence::PresenceRegistry;

/// 分发时需要的会话状态，由会话监督者独占持有
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: SessionId,
    pub address: String,
    pub name: String,
    pub mailbox: MailboxSender,
}

impl SessionContext {
    /// 初始显示名就是远端地址
    pub fn new(id: SessionId, address: impl Into<String>, mailbox: MailboxSender) -> Self {
        let address = address.into();
        Self {
            id,
            name: address.clone(),
            address,
            mailbox,
        }
    }

    /// 回复给自己
    pub fn reply(&self, message: impl Into<String>) -> Result<(), ApplicationError> {
        self.mailbox.send(message)?;
        Ok(())
    }
}

/// 一次分发的结果，用于日志和测试
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Listed(usize),
    Renamed { from: String, to: String },
    Delivered { target: String },
    Published,
    Rejected(DomainError),
}

pub struct CommandDispatcher {
    registry: Arc<PresenceRegistry>,
    broadcaster: Arc<dyn MessageBroadcaster>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<PresenceRegistry>, broadcaster: Arc<dyn MessageBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// 处理一行已去掉行终止符的入站文本
    pub async fn dispatch(
        &self,
        session: &mut SessionContext,
        line: &str,
    ) -> Result<DispatchOutcome, ApplicationError> {
        let result = match Command::parse(line) {
            Ok(command) => self.execute(session, command).await,
            Err(err) => Err(ApplicationError::Domain(err)),
        };

        match result {
            Err(ApplicationError::Domain(err)) => {
                tracing::debug!(session_id = %session.id, error = %err, "命令被拒绝");
                session.reply(err.to_string())?;
                Ok(DispatchOutcome::Rejected(err))
            }
            other => other,
        }
    }

    async fn execute(
        &self,
        session: &mut SessionContext,
        command: Command,
    ) -> Result<DispatchOutcome, ApplicationError> {
        tracing::debug!(session_id = %session.id, kind = ?command.kind(), "执行命令");
        match command {
            Command::ListOnline => self.list_online(session).await,
            Command::Rename { new_name } => self.rename(session, new_name).await,
            Command::DirectMessage { target, text } => {
                self.direct_message(session, target, text).await
            }
            Command::PublicMessage { text } => {
                let message = wire::announcement(&session.address, &session.name, &text);
                self.broadcaster.broadcast(message).await?;
                Ok(DispatchOutcome::Published)
            }
        }
    }

    async fn list_online(
        &self,
        session: &SessionContext,
    ) -> Result<DispatchOutcome, ApplicationError> {
        let entries = self.registry.snapshot().await;
        for entry in &entries {
            session.reply(wire::presence_line(entry))?;
        }
        Ok(DispatchOutcome::Listed(entries.len()))
    }

    async fn rename(
        &self,
        session: &mut SessionContext,
        new_name: String,
    ) -> Result<DispatchOutcome, ApplicationError> {
        self.registry
            .rename(&session.name, &new_name, session.id)
            .await?;

        let from = std::mem::replace(&mut session.name, new_name.clone());
        session.reply(wire::renamed(&new_name))?;
        Ok(DispatchOutcome::Renamed { from, to: new_name })
    }

    async fn direct_message(
        &self,
        session: &SessionContext,
        target: String,
        text: String,
    ) -> Result<DispatchOutcome, ApplicationError> {
        let recipient = self
            .registry
            .lookup(&target)
            .await
            .ok_or_else(|| DomainError::user_not_found(&target))?;

        if text.is_empty() {
            return Err(DomainError::EmptyMessage.into());
        }

        // 对方正在下线时邮箱已关闭，按不在线处理
        recipient
            .mailbox()
            .send(wire::direct_message(&session.name, &text))
            .map_err(|_| DomainError::user_not_found(&target))?;

        session.reply(wire::SENT)?;
        Ok(DispatchOutcome::Delivered { target })
    }
}

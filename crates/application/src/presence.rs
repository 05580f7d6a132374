use std::collections::HashMap;
use std::sync::Arc;

use domain::{DomainError, PresenceEntry, SessionId};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::mailbox::MailboxSender;

/// 注册表中保存的会话句柄
///
/// 其他组件只能通过它向会话投递消息或请求踢出，不能读取会话的邮箱。
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    address: String,
    mailbox: MailboxSender,
    kick: CancellationToken,
}

impl SessionHandle {
    pub fn new(
        id: SessionId,
        address: impl Into<String>,
        mailbox: MailboxSender,
        kick: CancellationToken,
    ) -> Self {
        Self {
            id,
            address: address.into(),
            mailbox,
            kick,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn mailbox(&self) -> &MailboxSender {
        &self.mailbox
    }

    /// 请求会话强制下线
    pub fn kick(&self) {
        self.kick.cancel();
    }
}

/// 在线用户注册表：显示名 -> 会话
///
/// 所有读写都经过同一把读写锁，改名在一次写锁内完成，`who` 快照和广播分发
/// 看到的总是某个完整时刻的状态。
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 `name` 注册会话，名字已存在时失败
    pub async fn register(
        &self,
        name: impl Into<String>,
        session: Arc<SessionHandle>,
    ) -> Result<(), DomainError> {
        let name = name.into();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&name) {
            return Err(DomainError::name_in_use(name));
        }

        tracing::info!(
            session_id = %session.id(),
            name = %name,
            online = sessions.len() + 1,
            "用户已注册"
        );
        sessions.insert(name, session);
        Ok(())
    }

    /// 移除 `name`，不存在时什么也不做
    pub async fn unregister(&self, name: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.write().await.remove(name)
    }

    /// 仅当 `name` 仍属于 `id` 时移除，返回是否移除
    pub async fn unregister_session(&self, name: &str, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(name) {
            Some(session) if session.id() == id => {
                sessions.remove(name);
                tracing::info!(session_id = %id, name = %name, online = sessions.len(), "用户已注销");
                true
            }
            _ => false,
        }
    }

    /// 原子改名：检查、移除旧名、登记新名在同一次写锁内完成
    pub async fn rename(
        &self,
        old_name: &str,
        new_name: &str,
        id: SessionId,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(new_name) {
            return Err(DomainError::name_in_use(new_name));
        }

        let session = match sessions.get(old_name) {
            Some(session) if session.id() == id => Arc::clone(session),
            _ => return Err(DomainError::user_not_found(old_name)),
        };
        sessions.remove(old_name);
        sessions.insert(new_name.to_string(), session);

        tracing::info!(session_id = %id, from = %old_name, to = %new_name, "用户已改名");
        Ok(())
    }

    pub async fn lookup(&self, name: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(name).cloned()
    }

    /// 当前在线列表，顺序不保证
    pub async fn snapshot(&self) -> Vec<PresenceEntry> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(name, session)| PresenceEntry::new(name.clone(), session.address()))
            .collect()
    }

    /// 把消息放进每个在线会话的邮箱，返回成功投递的数量
    pub async fn deliver_all(&self, message: &str) -> usize {
        let sessions = self.sessions.read().await;
        let mut delivered = 0;
        for (name, session) in sessions.iter() {
            match session.mailbox().send(message) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::debug!(session_id = %session.id(), name = %name, "邮箱已关闭，跳过投递");
                }
            }
        }
        delivered
    }

    /// 踢出指定用户，返回该用户是否在线
    pub async fn kick(&self, name: &str) -> bool {
        match self.lookup(name).await {
            Some(session) => {
                session.kick();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

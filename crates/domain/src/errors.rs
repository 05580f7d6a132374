//! 领域模型错误定义
//!
//! 这里的错误都是会话内可恢复的：`Display` 的内容就是回复给发起方的那一行文本，
//! 连接保持打开。

use thiserror::Error;

use crate::command::CommandKind;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 命令缺少必要字段（ProtocolError）
    #[error("消息格式不正确，请使用\"{}\"格式。", .command.usage())]
    InvalidFormat { command: CommandKind },

    /// 改名目标已被占用（NameConflict）
    #[error("当前用户名被使用")]
    NameInUse { name: String },

    /// 私聊对象不在线（TargetNotFound）
    #[error("当前用户不存在")]
    UserNotFound { name: String },

    /// 私聊内容为空
    #[error("无效消息，请重发")]
    EmptyMessage,

    /// 单行超过长度上限，已被丢弃
    #[error("消息过长，已丢弃（上限 {limit} 字节）")]
    LineTooLong { limit: usize },
}

impl DomainError {
    /// 创建格式错误
    pub fn invalid_format(command: CommandKind) -> Self {
        Self::InvalidFormat { command }
    }

    /// 创建重名错误
    pub fn name_in_use(name: impl Into<String>) -> Self {
        Self::NameInUse { name: name.into() }
    }

    /// 创建用户不存在错误
    pub fn user_not_found(name: impl Into<String>) -> Self {
        Self::UserNotFound { name: name.into() }
    }
}

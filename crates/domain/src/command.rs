//! 行内命令协议
//!
//! 每一行入站文本解析为一条命令：
//!
//! | 文本 | 命令 |
//! |---|---|
//! | `who` | [`Command::ListOnline`] |
//! | `rename\|<name>` | [`Command::Rename`] |
//! | `to\|<name>\|<text>` | [`Command::DirectMessage`] |
//! | 其他任意文本（包括空行） | [`Command::PublicMessage`] |
//!
//! 以保留前缀开头的普通聊天内容会被当作命令处理，这是协议本身的歧义，
//! 这里按原样保留，不做转义。

use crate::errors::DomainError;

pub const WHO: &str = "who";
pub const RENAME_PREFIX: &str = "rename|";
pub const DIRECT_PREFIX: &str = "to|";
pub const SEPARATOR: char = '|';

/// 解析后的客户端请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListOnline,
    Rename { new_name: String },
    /// 文本可能为空，空文本要在确认目标存在之后才报告
    DirectMessage { target: String, text: String },
    PublicMessage { text: String },
}

/// 命令种类，用于日志和格式错误提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    ListOnline,
    Rename,
    DirectMessage,
    PublicMessage,
}

impl CommandKind {
    /// 正确的命令写法
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::ListOnline => "who",
            CommandKind::Rename => "rename|userName",
            CommandKind::DirectMessage => "to|userName|message",
            CommandKind::PublicMessage => "message",
        }
    }
}

impl Command {
    /// 解析一行已去掉行终止符的入站文本
    pub fn parse(line: &str) -> Result<Self, DomainError> {
        if line == WHO {
            return Ok(Command::ListOnline);
        }

        if let Some(rest) = line.strip_prefix(RENAME_PREFIX) {
            let new_name = rest.split(SEPARATOR).next().unwrap_or_default();
            if new_name.is_empty() {
                return Err(DomainError::invalid_format(CommandKind::Rename));
            }
            return Ok(Command::Rename {
                new_name: new_name.to_string(),
            });
        }

        if let Some(rest) = line.strip_prefix(DIRECT_PREFIX) {
            let mut segments = rest.splitn(2, SEPARATOR);
            let target = segments.next().unwrap_or_default();
            if target.is_empty() {
                return Err(DomainError::invalid_format(CommandKind::DirectMessage));
            }
            let text = segments.next().unwrap_or_default();
            return Ok(Command::DirectMessage {
                target: target.to_string(),
                text: text.to_string(),
            });
        }

        Ok(Command::PublicMessage {
            text: line.to_string(),
        })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ListOnline => CommandKind::ListOnline,
            Command::Rename { .. } => CommandKind::Rename,
            Command::DirectMessage { .. } => CommandKind::DirectMessage,
            Command::PublicMessage { .. } => CommandKind::PublicMessage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_who() {
        assert_eq!(Command::parse("who"), Ok(Command::ListOnline));
        // 关键字必须完全匹配
        assert_eq!(
            Command::parse("who "),
            Ok(Command::PublicMessage {
                text: "who ".to_string()
            })
        );
        assert_eq!(
            Command::parse("WHO"),
            Ok(Command::PublicMessage {
                text: "WHO".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            Command::parse("rename|alice"),
            Ok(Command::Rename {
                new_name: "alice".to_string()
            })
        );
        // 只取第一个字段
        assert_eq!(
            Command::parse("rename|alice|extra"),
            Ok(Command::Rename {
                new_name: "alice".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rename_without_name() {
        for line in ["rename|", "rename||bob"] {
            assert_eq!(
                Command::parse(line),
                Err(DomainError::invalid_format(CommandKind::Rename)),
                "line: {line}"
            );
        }
    }

    #[test]
    fn test_parse_direct_message() {
        assert_eq!(
            Command::parse("to|bob|hi"),
            Ok(Command::DirectMessage {
                target: "bob".to_string(),
                text: "hi".to_string()
            })
        );
        // 正文可以包含分隔符
        assert_eq!(
            Command::parse("to|bob|a|b"),
            Ok(Command::DirectMessage {
                target: "bob".to_string(),
                text: "a|b".to_string()
            })
        );
    }

    #[test]
    fn test_parse_direct_message_missing_segments() {
        assert_eq!(
            Command::parse("to||hi"),
            Err(DomainError::invalid_format(CommandKind::DirectMessage))
        );
        assert_eq!(
            Command::parse("to|"),
            Err(DomainError::invalid_format(CommandKind::DirectMessage))
        );
        // 缺少正文时交给调用方按“空消息”处理
        assert_eq!(
            Command::parse("to|bob"),
            Ok(Command::DirectMessage {
                target: "bob".to_string(),
                text: String::new()
            })
        );
    }

    #[test]
    fn test_parse_public_message() {
        assert_eq!(
            Command::parse("hello everyone"),
            Ok(Command::PublicMessage {
                text: "hello everyone".to_string()
            })
        );
        assert_eq!(
            Command::parse(""),
            Ok(Command::PublicMessage {
                text: String::new()
            })
        );
        assert_eq!(Command::parse("to").map(|c| c.kind()), Ok(CommandKind::PublicMessage));
    }
}

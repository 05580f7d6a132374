//! 聊天服务核心引擎。
//!
//! 在线注册表、会话邮箱、进程内广播中心、命令分发，以及负责单个连接生命周期
//! 和空闲超时的会话监督者。

pub mod broadcast_hub;
pub mod broadcaster;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod mailbox;
pub mod presence;
pub mod server;
pub mod session;
pub mod state;

pub use broadcast_hub::BroadcastHub;
pub use broadcaster::{BroadcastError, MessageBroadcaster};
pub use codec::{Inbound, InboundCodec};
pub use dispatcher::{CommandDispatcher, DispatchOutcome, SessionContext};
pub use error::ApplicationError;
pub use mailbox::{mailbox, Mailbox, MailboxClosed, MailboxSender};
pub use presence::{PresenceRegistry, SessionHandle};
pub use server::ChatServer;
pub use session::{SessionSupervisor, Termination};
pub use state::ChatState;

use std::sync::Arc;

use config::SessionConfig;

use crate::broadcast_hub::BroadcastHub;
use crate::broadcaster::MessageBroadcaster;
use crate::dispatcher::CommandDispatcher;
use crate::presence::PresenceRegistry;

/// 所有会话共享的服务，克隆只增加引用计数
#[derive(Clone)]
pub struct ChatState {
    pub registry: Arc<PresenceRegistry>,
    pub broadcaster: Arc<dyn MessageBroadcaster>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub session: SessionConfig,
}

impl ChatState {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        broadcaster: Arc<dyn MessageBroadcaster>,
        session: SessionConfig,
    ) -> Self {
        let dispatcher = Arc::new(CommandDispatcher::new(
            registry.clone(),
            broadcaster.clone(),
        ));
        Self {
            registry,
            broadcaster,
            dispatcher,
            session,
        }
    }

    /// 使用进程内广播中心，必须在 tokio 运行时内调用
    pub fn with_local_hub(session: SessionConfig) -> Self {
        let registry = Arc::new(PresenceRegistry::new());
        let (hub, _relay) = BroadcastHub::start(registry.clone());
        Self::new(registry, Arc::new(hub), session)
    }
}

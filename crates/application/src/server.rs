use std::future::Future;

use config::SessionConfig;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ApplicationError;
use crate::session::SessionSupervisor;
use crate::state::ChatState;

/// 聊天服务：接受连接，为每个连接启动一个会话监督任务
#[derive(Clone)]
pub struct ChatServer {
    state: ChatState,
    shutdown: CancellationToken,
}

impl ChatServer {
    /// 使用进程内广播中心创建服务，必须在 tokio 运行时内调用
    pub fn new(session: SessionConfig) -> Self {
        Self::with_state(ChatState::with_local_hub(session))
    }

    pub fn with_state(state: ChatState) -> Self {
        Self {
            state,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// 强制指定用户下线，返回该用户是否在线
    pub async fn kick(&self, name: &str) -> bool {
        let kicked = self.state.registry.kick(name).await;
        tracing::info!(name = %name, kicked, "管理端踢出用户");
        kicked
    }

    /// 接受连接直到 `shutdown` 完成，然后踢出所有会话并等待它们结束
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ApplicationError>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "聊天服务器开始监听");

        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!(addr = %peer, "接受新连接");
                        // 每个会话的踢出信号都挂在服务关闭信号下面
                        let supervisor =
                            SessionSupervisor::new(stream, peer.to_string(), self.state.clone())
                                .with_kick_token(self.shutdown.child_token());
                        sessions.spawn(supervisor.run());
                    }
                    Err(err) => {
                        // 单次 accept 失败不影响监听
                        tracing::warn!(error = %err, "接受连接失败");
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(err) = finished {
                        tracing::error!(error = %err, "会话任务异常退出");
                    }
                }
            }
        }

        let online = self.state.registry.len().await;
        tracing::info!(online, "服务器关闭，正在断开所有会话");
        self.shutdown.cancel();
        while let Some(finished) = sessions.join_next().await {
            if let Err(err) = finished {
                tracing::error!(error = %err, "会话任务异常退出");
            }
        }

        tracing::info!("聊天服务器已停止");
        Ok(())
    }
}

//! 会话监督者
//!
//! 每个连接两个任务：
//! - 监督任务在同一个 `select!` 里等待下一行入站文本、空闲计时器到期、管理端踢出信号
//!   和写任务失败；
//! - 写任务独占连接的写端，按先进先出排空会话邮箱。对端不读数据时只有写任务被阻塞，
//!   空闲超时和踢出照常生效。
//!
//! 无论因何结束，都只执行一次完整的清理流程：
//!
//! 提示（仅超时/踢出）-> 注销 -> 广播下线 -> 关闭邮箱并写出已入队消息 -> 关闭连接

use std::sync::Arc;
use std::time::Duration;

use domain::{wire, DomainError, SessionId};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;

use crate::codec::{Inbound, InboundCodec};
use crate::dispatcher::SessionContext;
use crate::mailbox::{mailbox, Mailbox};
use crate::presence::SessionHandle;
use crate::state::ChatState;

/// 清理时写出剩余消息的最长等待，超时后放弃未写出的消息
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// 会话结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// 对端关闭连接
    Disconnected,
    /// 读写失败
    TransportError,
    /// 空闲超时被踢出
    IdleTimeout,
    /// 被管理端或服务关闭踢出
    Kicked,
    /// 注册失败，从未上线
    Rejected,
}

type Inbox<S> = FramedRead<ReadHalf<S>, InboundCodec>;

pub struct SessionSupervisor<S> {
    stream: S,
    address: String,
    state: ChatState,
    kick: CancellationToken,
}

impl<S> SessionSupervisor<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S, address: impl Into<String>, state: ChatState) -> Self {
        Self {
            stream,
            address: address.into(),
            state,
            kick: CancellationToken::new(),
        }
    }

    /// 使用外部提供的踢出信号，例如服务关闭信号的子令牌
    pub fn with_kick_token(mut self, kick: CancellationToken) -> Self {
        self.kick = kick;
        self
    }

    /// 运行会话直到结束，返回结束原因
    pub async fn run(self) -> Termination {
        let Self {
            stream,
            address,
            state,
            kick,
        } = self;

        let id = SessionId::new();
        let (reader, writer) = tokio::io::split(stream);
        let mut inbox = FramedRead::new(reader, InboundCodec::new(state.session.max_line_length));
        let mut outbox = FramedWrite::new(writer, LinesCodec::new());
        let (sender, mailbox) = mailbox();
        let mut context = SessionContext::new(id, address.clone(), sender.clone());
        let handle = Arc::new(SessionHandle::new(id, address.clone(), sender, kick.clone()));

        if let Err(err) = state.registry.register(context.name.clone(), handle).await {
            tracing::warn!(session_id = %id, addr = %address, error = %err, "会话注册失败");
            let reject = async {
                if outbox.send(err.to_string()).await.is_ok() {
                    let _ = SinkExt::<String>::close(&mut outbox).await;
                }
            };
            let _ = time::timeout(FLUSH_TIMEOUT, reject).await;
            return Termination::Rejected;
        }

        let writer = SessionWriter::spawn(outbox, mailbox, id);

        let online = wire::announcement(&context.address, &context.name, wire::ONLINE);
        if let Err(err) = state.broadcaster.broadcast(online).await {
            tracing::warn!(session_id = %id, error = %err, "上线广播失败");
        }

        let termination = active_loop(&state, &mut context, &mut inbox, &writer, &kick).await;

        teardown(&state, &context, writer).await;
        tracing::info!(
            session_id = %id,
            addr = %context.address,
            name = %context.name,
            reason = ?termination,
            "会话已结束"
        );
        termination
    }
}

/// 会话写任务的句柄
struct SessionWriter {
    task: JoinHandle<()>,
    /// 通知写任务停止等待新消息
    closing: CancellationToken,
    /// 写任务因写出失败而退出
    failed: CancellationToken,
}

impl SessionWriter {
    fn spawn<W>(outbox: FramedWrite<W, LinesCodec>, mailbox: Mailbox, id: SessionId) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let closing = CancellationToken::new();
        let failed = CancellationToken::new();
        let task = tokio::spawn(write_loop(
            outbox,
            mailbox,
            closing.clone(),
            failed.clone(),
            id,
        ));
        Self {
            task,
            closing,
            failed,
        }
    }

    /// 关闭邮箱，写出已入队的消息后关闭写端；对端迟迟不读时放弃
    async fn shutdown(self, id: SessionId) {
        self.closing.cancel();
        let mut task = self.task;
        match time::timeout(FLUSH_TIMEOUT, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(session_id = %id, error = %err, "写任务异常退出");
            }
            Err(_) => {
                tracing::debug!(session_id = %id, "关闭连接时写出超时，放弃剩余消息");
                task.abort();
            }
        }
    }
}

async fn write_loop<W>(
    mut outbox: FramedWrite<W, LinesCodec>,
    mut mailbox: Mailbox,
    closing: CancellationToken,
    failed: CancellationToken,
    id: SessionId,
) where
    W: AsyncWrite + Unpin,
{
    let result: Result<(), LinesCodecError> = async {
        loop {
            tokio::select! {
                _ = closing.cancelled() => break,
                message = mailbox.recv() => match message {
                    Some(message) => outbox.send(message).await?,
                    None => break,
                },
            }
        }

        mailbox.close();
        while let Some(message) = mailbox.recv().await {
            outbox.send(message).await?;
        }
        SinkExt::<String>::close(&mut outbox).await
    }
    .await;

    if let Err(err) = result {
        tracing::warn!(session_id = %id, error = %err, "写出失败");
        failed.cancel();
    }
}

async fn active_loop<S>(
    state: &ChatState,
    context: &mut SessionContext,
    inbox: &mut Inbox<S>,
    writer: &SessionWriter,
    kick: &CancellationToken,
) -> Termination
where
    S: AsyncRead,
{
    let idle_timeout = state.session.idle_timeout();
    let idle = time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            _ = kick.cancelled() => {
                let _ = context.reply(wire::FORCE_KICKED);
                return Termination::Kicked;
            }
            _ = &mut idle => {
                tracing::info!(session_id = %context.id, name = %context.name, "空闲超时");
                let _ = context.reply(wire::IDLE_KICKED);
                return Termination::IdleTimeout;
            }
            _ = writer.failed.cancelled() => {
                return Termination::TransportError;
            }
            inbound = inbox.next() => {
                match inbound {
                    Some(Ok(inbound)) => {
                        // 任何一行都算活跃，包括格式错误的命令
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        handle_inbound(state, context, inbound).await;
                    }
                    Some(Err(err)) => {
                        tracing::warn!(session_id = %context.id, error = %err, "读取失败");
                        return Termination::TransportError;
                    }
                    None => {
                        tracing::debug!(session_id = %context.id, "对端关闭连接");
                        return Termination::Disconnected;
                    }
                }
            }
        }
    }
}

async fn handle_inbound(state: &ChatState, context: &mut SessionContext, inbound: Inbound) {
    match inbound {
        Inbound::Line(line) => match state.dispatcher.dispatch(context, &line).await {
            Ok(outcome) => {
                tracing::debug!(session_id = %context.id, outcome = ?outcome, "命令已处理");
            }
            Err(err) => {
                tracing::warn!(session_id = %context.id, error = %err, "命令处理失败");
            }
        },
        Inbound::Oversized => {
            let limit = state.session.max_line_length;
            tracing::debug!(session_id = %context.id, limit, "丢弃超长行");
            let _ = context.reply(DomainError::LineTooLong { limit }.to_string());
        }
    }
}

async fn teardown(state: &ChatState, context: &SessionContext, writer: SessionWriter) {
    state
        .registry
        .unregister_session(&context.name, context.id)
        .await;

    let offline = wire::announcement(&context.address, &context.name, wire::OFFLINE);
    if let Err(err) = state.broadcaster.broadcast(offline).await {
        tracing::warn!(session_id = %context.id, error = %err, "下线广播失败");
    }

    writer.shutdown(context.id).await;
}

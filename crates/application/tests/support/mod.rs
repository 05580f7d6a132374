#![allow(dead_code)]

use std::time::Duration;

use application::{ChatState, SessionSupervisor, Termination};
use config::SessionConfig;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines,
    ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// 比空闲超时更长，暂停时钟下也不会先于踢出触发
pub const RECV_TIMEOUT: Duration = Duration::from_secs(120);

pub fn session_config(idle_timeout_secs: u64) -> SessionConfig {
    SessionConfig {
        idle_timeout_secs,
        max_line_length: 64,
    }
}

/// 逐行读写的测试客户端
pub struct TestClient<S> {
    lines: Lines<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
}

impl<S> TestClient<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write line");
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write bytes");
    }

    /// 下一行；连接关闭时返回 `None`
    pub async fn recv(&mut self) -> Option<String> {
        timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read line")
    }

    pub async fn expect_line(&mut self) -> String {
        self.recv().await.expect("connection closed unexpectedly")
    }

    /// 读取 `n` 行并排序，用于顺序不固定的 `who` 结果
    pub async fn expect_sorted(&mut self, n: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(n);
        for _ in 0..n {
            lines.push(self.expect_line().await);
        }
        lines.sort();
        lines
    }

    /// 读到连接关闭为止，返回期间收到的所有行
    pub async fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv().await {
            lines.push(line);
        }
        lines
    }
}

/// 通过内存管道接入一个会话
pub fn connect(state: &ChatState, address: &str) -> (TestClient<DuplexStream>, JoinHandle<Termination>) {
    connect_with_capacity(state, address, 4096)
}

/// 指定管道缓冲大小，客户端不读时服务端写满 `capacity` 字节后被阻塞
pub fn connect_with_capacity(
    state: &ChatState,
    address: &str,
    capacity: usize,
) -> (TestClient<DuplexStream>, JoinHandle<Termination>) {
    let (client, server) = tokio::io::duplex(capacity);
    let supervisor = SessionSupervisor::new(server, address, state.clone());
    (TestClient::new(client), tokio::spawn(supervisor.run()))
}

pub fn online(address: &str) -> String {
    format!("[{address}]{address}: 已上线")
}

pub fn offline(address: &str, name: &str) -> String {
    format!("[{address}]{name}: 已下线")
}

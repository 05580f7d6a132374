//! 主应用程序入口
//!
//! 启动 TCP 聊天服务。

use application::ChatServer;
use config::AppConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 默认值 -> 配置文件 -> 环境变量
    let config = AppConfig::load()?;
    let bind_address = config.bind_address();

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(
        addr = %bind_address,
        idle_timeout_secs = config.session.idle_timeout_secs,
        max_line_length = config.session.max_line_length,
        "聊天室服务器启动"
    );

    let server = ChatServer::new(config.session);
    server.serve(listener, shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "监听退出信号失败");
        // 无法监听信号时保持运行，避免立即退出
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号");
}

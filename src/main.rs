//! Backend Kit 服务主入口
//!
//! 连接外部资源后提供健康检查与认证接口

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use backend_kit::auth::AuthState;
use backend_kit::shared::{init_logging, LogSettings};
use backend_kit::{create_routes, AppResources, AppState, Config, RetryPolicy};

#[derive(Parser, Debug)]
#[command(name = "backend-kit", version, about = "Web 服务后端工具集")]
struct Args {
    /// 环境变量文件，缺省时读取当前目录的 .env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// 监听端口，覆盖 PORT
    #[arg(long)]
    port: Option<u16>,

    /// 数据库连接最大尝试次数
    #[arg(long, default_value_t = 3)]
    connect_retries: u32,

    /// 两次连接尝试之间的等待时间（毫秒）
    #[arg(long, default_value_t = 1000)]
    connect_delay_ms: u64,

    /// 日志文件目录
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 加载配置，日志级别取决于运行环境
    let config = match &args.env_file {
        Some(path) => Config::load_from(path).with_context(|| format!("无法加载环境文件: {}", path.display()))?,
        None => Config::load()?,
    };

    // 初始化日志，guard 需要存活到进程结束
    let _log_guards = init_logging(&LogSettings::console(config.is_dev).with_directory(&args.log_dir))?;

    info!("🚀 启动 Backend Kit 服务");
    info!("✅ 配置加载成功");

    let policy = RetryPolicy::from_millis(args.connect_retries, args.connect_delay_ms);
    let shutdown = CancellationToken::new();

    // 启动阶段收到关闭信号时中止重试
    let startup_signal = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => shutdown.cancel(),
                _ = shutdown.cancelled() => {}
            }
        })
    };

    let resources = match AppResources::start(&config, policy, shutdown.child_token()).await {
        Ok(resources) => resources,
        Err(e) => {
            error!("❌ 资源初始化失败，服务不会启动: {}", e);
            shutdown.cancel();
            return Err(e.into());
        }
    };
    startup_signal.abort();
    info!("✅ 外部资源初始化完成");

    let state = AppState::new(
        resources.probes(),
        AuthState::new(config.tokens.access_token_secret.as_str()),
    );
    let app = create_routes(state);
    info!("✅ 路由创建成功");

    let port = args.port.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("🌐 服务器启动成功，监听端口: {}", port);
    info!("📖 健康检查: http://localhost:{}/health", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("🛑 接收到关闭信号，正在优雅关闭服务器...");
        })
        .await?;

    let errors = resources.shutdown().await;
    if !errors.is_empty() {
        error!("⚠️ {} 个资源未能正常断开", errors.len());
    }

    Ok(())
}

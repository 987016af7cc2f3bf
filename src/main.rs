use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use mydub_backend::{AppState, config::Config, router::create_router};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'mydub_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置应用状态
    let state = AppState::new(config, pool).expect("Failed to initialize application state");

    for (name, key) in [
        ("OPENROUTER_API_KEY", &state.config.openrouter_api_key),
        ("OPENWEATHER_API_KEY", &state.config.openweather_api_key),
        ("EXCHANGE_RATE_API_KEY", &state.config.exchange_rate_api_key),
        ("NEWS_API_KEY", &state.config.news_api_key),
    ] {
        if key.is_none() {
            tracing::warn!("{} is not set, the matching proxy will serve fallback data", name);
        }
    }

    // 定期清理过期的计数记录
    let quota = state.quota.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = quota.sweep(chrono::Utc::now()).await;
            if removed > 0 {
                tracing::debug!("Swept {} expired quota records", removed);
            }
        }
    });

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let app = create_router(state);

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down");
    })
    .await
    .expect("Failed to start server");
}

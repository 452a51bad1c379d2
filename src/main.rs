use anyhow::Result;
use cafewatch::config::Config;
use cafewatch::feed::cafe::CafeFeed;
use cafewatch::notify::TelegramSink;
use cafewatch::run::RunCoordinator;
use cafewatch::watchdog::Watchdog;
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Saved credentials from .env; real env vars take precedence.
    Config::load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cafewatch=info".to_string()),
        )
        .init();

    let config = Config::load_or_default(Path::new("config.toml"))?;

    let sink = TelegramSink::new(
        Config::telegram_token(),
        Config::telegram_chat_id(),
        Duration::from_secs(config.run.send_timeout_s),
    );

    if std::env::args().any(|arg| arg == "--watchdog") {
        let watchdog = Watchdog::new(
            config.data_dir(),
            Duration::from_secs(config.watchdog.threshold_s),
        );
        watchdog.check(&sink).await?;
        return Ok(());
    }

    let coordinator = RunCoordinator::from_config(&config);
    let mut feed = CafeFeed::new(&Config::naver_cookie(), &config.feed);

    let report = coordinator.run(&mut feed, &sink).await;
    println!("{}: {}", report.state.as_str(), report.detail);

    Ok(())
}

use std::env;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use studyhive_server::audio::{self, AudioStore};
use studyhive_server::cli::{self, Command};
use studyhive_server::config::AppConfig;
use studyhive_server::logging::{self, LogConfig, SlowRequestThreshold};
use studyhive_server::providers::{GeminiClient, GoogleTtsClient};
use studyhive_server::rate_limit::{self, SlidingWindowLimiter};
use studyhive_server::server::{create_router, AppState, RouterConfig};
use studyhive_server::services::StudyPipeline;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file if it exists (silently ignore if it doesn't)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match cli::parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            process::exit(2);
        }
    };

    match command {
        Command::Help => {
            cli::print_help();
            Ok(())
        }
        Command::Version => {
            cli::print_version();
            Ok(())
        }
        Command::ValidateEnv => validate_env(),
        Command::Sweep => run_sweep().await,
        Command::Serve { port } => serve(port).await,
    }
}

/// Report configuration problems without starting anything
fn validate_env() -> Result<(), BoxError> {
    match AppConfig::from_env() {
        Ok(config) => {
            println!("Configuration OK");
            println!("  Environment:   {}", config.environment);
            println!("  Port:          {}", config.port);
            println!("  Model:         {}", config.gemini_model);
            println!(
                "  Speech:        {}",
                if config.tts_configured() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!("  Audio dir:     {}", config.audio_dir.display());
            for warning in &config.warnings {
                println!("  warning: {}", warning);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            process::exit(1);
        }
    }
}

/// One retention sweep of the audio directory, then exit
async fn run_sweep() -> Result<(), BoxError> {
    let config = AppConfig::from_env_without_key()?;
    let report = audio::sweep(&config.audio_dir, &config.audio_retention).await?;

    println!("Audio cleanup of {}", config.audio_dir.display());
    println!("  Deleted:   {} files", report.deleted_count);
    println!("  Storage:   {:.2}MB before", report.total_size_mb);
    println!("  Remaining: {:.2}MB", report.remaining_size_mb);
    Ok(())
}

async fn serve(port_override: Option<u16>) -> Result<(), BoxError> {
    let log_config = LogConfig::from_env();
    let _log_guard = logging::init_logging(&log_config)?;
    logging::log_platform_info();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            process::exit(1);
        }
    };
    if let Some(port) = port_override {
        config.port = port;
    }
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    let mut gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .with_timeout(config.provider_timeout);
    if let Some(base_url) = &config.gemini_base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }
    let tts = GoogleTtsClient::new(config.tts_credentials.clone()).with_timeout(config.provider_timeout);

    let audio_store = Arc::new(AudioStore::open(&config.audio_dir).await?);
    let pipeline = StudyPipeline::new(
        Arc::new(gemini),
        Arc::new(tts),
        audio_store,
        config.provider_timeout,
        config.default_voice.clone(),
    );

    let limiter = SlidingWindowLimiter::new(config.rate_limit.clone());
    rate_limit::spawn_idle_pruner(limiter.clone());

    // First sweep runs immediately, then on every interval
    audio::spawn_sweeper(
        config.audio_dir.clone(),
        config.audio_retention.clone(),
        config.cleanup_interval,
    );

    let state = AppState::new(pipeline, limiter, config.environment.clone());
    let mut router_config = RouterConfig::from(&config);
    router_config.slow_request_threshold = SlowRequestThreshold::from(&log_config);
    let app = create_router(state, &router_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        address = %addr,
        environment = %config.environment,
        model = %config.gemini_model,
        tts_configured = config.tts_configured(),
        "StudyHive server listening"
    );
    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        trust_proxy_headers = config.rate_limit.trust_proxy_headers,
        window_secs = config.rate_limit.window.as_secs(),
        "Rate limiting generation endpoints per client"
    );
    tracing::info!(
        audio_dir = ?config.audio_dir,
        retention_hours = config.audio_retention.max_age.as_secs() / 3600,
        max_storage_mb = config.audio_retention.max_total_size_mb,
        "Audio cleanup scheduled every {}h",
        config.cleanup_interval.as_secs() / 3600
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

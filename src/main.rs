//! lingo-cache - UI translation caching layer
//!
//! Command-line front end for translating UI strings through the cache,
//! prewarming a language and running the translation bridge.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lingo_cache::bridge::StartupPoll;
use lingo_cache::cli::{Args, BridgeAction, Commands};
use lingo_cache::config::Config;
use lingo_cache::error::LingoError;
use lingo_cache::locale::{self, COMMON_UI_STRINGS, SUPPORTED_LANGUAGES};
use lingo_cache::service::TranslationService;

const SETTLE_LIMIT: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    Config::load_dotenv();
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("lingo-cache.toml").exists() {
                info!("Found lingo-cache.toml in current directory, loading...");
                Config::from_file("lingo-cache.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env()?;

    // translate() blocks its caller, so commands run on the main thread
    // and the runtime's workers drive the requests
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("lingo-worker")
        .build()?;

    match args.command {
        Commands::Translate { lang, settle, text } => {
            check_language(&lang)?;
            let service = TranslationService::from_config(config, runtime.handle().clone())?;
            run_translate(&runtime, &service, &lang, settle, &text)?;
        }
        Commands::Prewarm { lang } => {
            check_language(&lang)?;
            let service = TranslationService::from_config(config, runtime.handle().clone())?;
            run_prewarm(&runtime, &service, &lang)?;
        }
        Commands::Languages => {
            println!("\nSupported Languages:");
            println!("{:<10} {:<40}", "Code", "Name");
            println!("{}", "-".repeat(50));
            for language in SUPPORTED_LANGUAGES {
                println!("{:<10} {:<40}", language.code, language.name);
            }
        }
        Commands::Bridge { action } => {
            let service = TranslationService::from_config(config, runtime.handle().clone())?;
            match action {
                BridgeAction::Status => {
                    let supervisor = service.supervisor();
                    let ready = runtime.block_on(supervisor.is_ready());
                    let url = service.config().bridge.base_url();
                    if ready {
                        println!("Bridge is ready at {}", url);
                    } else {
                        println!("Bridge is not answering at {}", url);
                    }
                }
                BridgeAction::Run => runtime.block_on(run_bridge(&service))?,
            }
        }
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

fn check_language(code: &str) -> Result<()> {
    if !locale::is_well_formed(code) {
        return Err(LingoError::InvalidLocale(code.to_string()).into());
    }
    if locale::find_language(code).is_none() {
        warn!("'{}' is not in the language menu, trying it anyway", code);
    }
    Ok(())
}

fn run_translate(
    runtime: &Runtime,
    service: &TranslationService,
    lang: &str,
    settle: bool,
    texts: &[String],
) -> Result<()> {
    service.start_backend();
    let orchestrator = service.orchestrator();

    for text in texts {
        println!("{} -> {}", text, orchestrator.translate(text, lang));
    }

    if settle {
        if !runtime.block_on(orchestrator.settle(SETTLE_LIMIT)) {
            warn!("Requests still running after {} s", SETTLE_LIMIT.as_secs());
        }
        println!("\nAfter background requests settled:");
        for text in texts {
            let cached = orchestrator.cache().get(lang, text);
            println!("{} -> {}", text, cached.as_deref().unwrap_or(text));
        }
    }

    let stats = orchestrator.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        timed_out = stats.timed_out,
        healed = stats.healed,
        passthrough = stats.passthrough,
        "Translation finished"
    );

    runtime.block_on(service.shutdown())?;
    Ok(())
}

fn run_prewarm(runtime: &Runtime, service: &TranslationService, lang: &str) -> Result<()> {
    service.start_backend();
    let orchestrator = service.orchestrator();

    let status = orchestrator.switch_language(lang, COMMON_UI_STRINGS);
    println!("{}", status);

    if orchestrator.is_enabled() && !orchestrator.source_locale().eq_ignore_ascii_case(lang) {
        let spinner = spinner(format!("Prewarming {} UI strings", COMMON_UI_STRINGS.len()))?;
        let settled = runtime.block_on(orchestrator.settle(SETTLE_LIMIT));
        spinner.finish_and_clear();

        if !settled {
            warn!("Prewarm still running after {} s", SETTLE_LIMIT.as_secs());
        }
        println!(
            "{} of {} strings cached for {}",
            orchestrator.cache().size(),
            COMMON_UI_STRINGS.len(),
            lang
        );
    }

    runtime.block_on(service.shutdown())?;
    Ok(())
}

async fn run_bridge(service: &TranslationService) -> Result<()> {
    let supervisor = service.supervisor();
    supervisor.start().await?;

    let poll = StartupPoll::from_config(&service.config().bridge);
    let spinner = spinner("Waiting for bridge server".to_string())?;
    let ready = supervisor.wait_until_ready(poll).await;
    spinner.finish_and_clear();

    if let Err(e) = ready {
        supervisor.stop().await?;
        return Err(e.into());
    }

    println!(
        "Bridge ready at {} (Ctrl-C to stop)",
        service.config().bridge.base_url()
    );
    tokio::signal::ctrl_c().await?;

    info!("Interrupt received, stopping bridge");
    supervisor.stop().await?;
    Ok(())
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Setup logging to stderr and a daily rolling file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".lingo").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "lingo-cache.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("lingo-cache.log").display()
    );

    Ok(())
}

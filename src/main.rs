use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webtrust_probe::client::timeout_label;
use webtrust_probe::config::Config;
use webtrust_probe::dashboard::{Dashboard, render};
use webtrust_probe::probe::{LoginScenario, SearchScenario};

#[derive(Parser, Debug)]
#[command(name = "webtrust-probe", version, about = "Probe and monitor the Web Trust Analyzer firewall")]
struct Cli {
    /// Firewall base address (overrides FIREWALL_URL)
    #[arg(long, global = true)]
    firewall_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// POST /api/login with real credentials or the SQL-injection bypass
    Login {
        #[arg(long, default_value = "admin")]
        username: String,
        #[arg(long, default_value = "password")]
        password: String,
        /// Send `admin' OR 1=1--` instead of the given credentials
        #[arg(long)]
        attack: bool,
    },
    /// GET /api/search with a normal, SQL-injection or XSS query
    Search {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, value_enum, default_value = "normal")]
        mode: SearchScenario,
    },
    /// Fire sequential search requests to trip the rate limiter
    Burst {
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(1..=200))]
        count: i64,
    },
    /// Poll stats and the threat log until Ctrl+C or N updates
    Watch {
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "webtrust_probe=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.firewall_url {
        config = config.with_firewall_url(url);
    }

    tracing::info!(
        "Firewall at {} (timeout: {})",
        config.firewall_url,
        timeout_label(config.request_timeout())
    );

    let mut dashboard = Dashboard::new(config)?;

    match cli.command {
        Command::Login {
            username,
            password,
            attack,
        } => {
            let scenario = if attack {
                LoginScenario::Attack
            } else {
                LoginScenario::Normal
            };
            dashboard.login(scenario, &username, &password).await;
            let state = dashboard.login_session().snapshot();
            print!("{}", render::session("Login", &state));
        }
        Command::Search { query, mode } => {
            dashboard.search(mode, &query).await;
            let state = dashboard.search_session().snapshot();
            print!("{}", render::session("Search", &state));
        }
        Command::Burst { count } => run_burst(&dashboard, count).await?,
        Command::Watch { ticks } => watch(&mut dashboard, ticks).await,
    }

    Ok(())
}

async fn run_burst(dashboard: &Dashboard, count: i64) -> Result<()> {
    let mut updates = dashboard.burst().subscribe();
    let run = dashboard.run_burst(count);
    tokio::pin!(run);

    let mut printed = 0;
    let summary = loop {
        tokio::select! {
            result = &mut run => break result?,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut run).await?;
                }
                let records = updates.borrow_and_update().clone();
                if records.len() > printed {
                    print!("{}", render::burst_log(&records[printed..]));
                    printed = records.len();
                }
            }
        }
    };

    let records = dashboard.burst().records();
    if records.len() > printed {
        print!("{}", render::burst_log(&records[printed..]));
    }

    println!(
        "\n{} requests in {:.2}s: {} rejected (403/429), {} failed",
        summary.total,
        summary.elapsed.as_secs_f64(),
        summary.rejected(),
        summary.failed
    );
    Ok(())
}

async fn watch(dashboard: &mut Dashboard, ticks: Option<u64>) {
    dashboard.activate();

    let Some(poller) = dashboard.poller() else {
        return;
    };
    let mut stats = poller.stats_updates();
    let mut logs = poller.log_updates();
    let limit = dashboard.config().log_display_limit;
    let mut seen = 0u64;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = stats.changed() => if changed.is_err() { break },
            changed = logs.changed() => if changed.is_err() { break },
            _ = &mut shutdown => {
                tracing::info!("Received Ctrl+C, stopping poller");
                break;
            }
        }

        let snapshot = stats.borrow_and_update().clone();
        let entries = logs.borrow_and_update().clone().unwrap_or_default();
        println!("{}", render::stats(snapshot.as_ref()));
        print!("{}", render::threat_log(&entries, limit));
        println!();

        seen += 1;
        if ticks.is_some_and(|n| seen >= n) {
            break;
        }
    }

    dashboard.deactivate().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

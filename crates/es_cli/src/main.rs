use clap::Parser;
use es_core::{CatalogStorage, Result};
use es_scanner::cli::{handle_command, ScanArgs, ScannerCommands};
use es_scanner::config::SUGGESTED_KEYWORDS;
use es_scanner::logging::init_logging;
use es_scanner::{RssTransport, ScanManager, ScannerConfig};
use es_storage::{create_storage, seed_keywords, StorageConfig, StorageKind};
use es_web::{AppState, BIND_ENV, DEFAULT_BIND, DEFAULT_ORIGINS};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    'd' => total_seconds += num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number is seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds += num;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be positive".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(name = "episcout", author, version, about = "Disease-outbreak news scanner", long_about = None)]
struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "sqlite")]
    storage: StorageKind,
    /// SQLite database path (defaults to $EPISCOUT_DB, then episcout.db)
    #[arg(long)]
    database: Option<PathBuf>,
    /// JSON scanner config; built-in feeds and heuristics when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scan every configured feed
    Scan {
        #[command(flatten)]
        args: ScanArgs,
        /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Serve the HTTP API
    Serve {
        /// Listen address (defaults to $EPISCOUT_BIND, then 127.0.0.1:8000)
        #[arg(long)]
        bind: Option<String>,
        /// Allowed CORS origin; repeat for several. Local dev origins when omitted
        #[arg(long = "origin")]
        origins: Vec<String>,
    },
    /// List configured feeds
    Feeds,
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    Whitelist {
        #[command(subcommand)]
        command: WhitelistCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum KeywordCommands {
    List,
    Add { text: String },
    Remove { id: i64 },
    /// Add the built-in outbreak keyword list
    Seed,
}

#[derive(clap::Subcommand, Debug)]
enum WhitelistCommands {
    List,
    Add {
        domain: String,
        /// Store the domain without trusting it yet
        #[arg(long)]
        inactive: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ScannerConfig> {
    match path {
        Some(path) => {
            info!("⚙️ Loading scanner config from {}", path.display());
            ScannerConfig::from_file(path)
        }
        None => Ok(ScannerConfig::default()),
    }
}

fn build_scanner(storage: &Arc<dyn CatalogStorage>, config: &ScannerConfig) -> Result<ScanManager> {
    let transport = RssTransport::new(config)?;
    let manager = ScanManager::new(storage.clone().as_article_storage(), Arc::new(transport), config)?;
    info!("📰 Scanner initialized with {} feeds", manager.feeds().len());
    Ok(manager)
}

async fn run_scan(manager: &ScanManager, args: ScanArgs, interval: Option<HumanDuration>) -> Result<()> {
    let command = ScannerCommands::Run(args);
    match interval {
        Some(interval) => {
            info!("Running in periodic mode with {}s interval", interval.0.as_secs());
            loop {
                info!("Starting scan cycle");
                if let Err(e) = handle_command(command.clone(), manager).await {
                    error!("Error during scan: {}", e);
                }
                info!("Waiting {}s before next scan", interval.0.as_secs());
                tokio::time::sleep(interval.0).await;
            }
        }
        None => handle_command(command, manager).await,
    }
}

async fn run_keywords(storage: &dyn CatalogStorage, command: KeywordCommands) -> Result<()> {
    match command {
        KeywordCommands::List => {
            for keyword in storage.keywords(0, usize::MAX).await? {
                println!("{:>4}  {}", keyword.id, keyword.text);
            }
        }
        KeywordCommands::Add { text } => {
            let keyword = storage.create_keyword(&text).await?;
            println!("Added keyword {} ({})", keyword.text, keyword.id);
        }
        KeywordCommands::Remove { id } => {
            storage.delete_keyword(id).await?;
            println!("Removed keyword {}", id);
        }
        KeywordCommands::Seed => {
            let added = seed_keywords(storage, SUGGESTED_KEYWORDS).await?;
            println!("Added {} of {} suggested keywords", added, SUGGESTED_KEYWORDS.len());
        }
    }
    Ok(())
}

async fn run_whitelist(storage: &dyn CatalogStorage, command: WhitelistCommands) -> Result<()> {
    match command {
        WhitelistCommands::List => {
            for entry in storage.whitelist(0, usize::MAX).await? {
                let state = if entry.is_active { "active" } else { "inactive" };
                println!("{:>4}  {} ({})", entry.id, entry.domain, state);
            }
        }
        WhitelistCommands::Add { domain, inactive } => {
            let entry = storage.create_whitelist_domain(&domain, !inactive).await?;
            println!("Whitelisted {} ({})", entry.domain, entry.id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let storage = create_storage(&StorageConfig::new(cli.storage, cli.database.clone())).await?;
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Scan { args, interval } => {
            let manager = build_scanner(&storage, &config)?;
            info!("🔎 Scanning {} feeds (last {} days)", manager.feeds().len(), args.days);
            run_scan(&manager, args, interval).await?;
        }
        Commands::Serve { bind, origins } => {
            let manager = build_scanner(&storage, &config)?;
            let bind = bind
                .or_else(|| std::env::var(BIND_ENV).ok())
                .unwrap_or_else(|| DEFAULT_BIND.to_string());
            let origins = if origins.is_empty() {
                DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect()
            } else {
                origins
            };
            let app = es_web::create_app(AppState::new(storage, manager), &origins);
            es_web::serve(app, &bind).await?;
        }
        Commands::Feeds => {
            let manager = build_scanner(&storage, &config)?;
            handle_command(ScannerCommands::Feeds, &manager).await?;
        }
        Commands::Keywords { command } => run_keywords(storage.as_ref(), command).await?,
        Commands::Whitelist { command } => run_whitelist(storage.as_ref(), command).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_storage::InMemoryStorage;

    #[test]
    fn test_human_duration() {
        assert_eq!("1h".parse::<HumanDuration>().unwrap().0, Duration::from_secs(3600));
        assert_eq!("1h15m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(4530));
        assert_eq!("90".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert!("1w".parse::<HumanDuration>().is_err());
        assert!("".parse::<HumanDuration>().is_err());
        assert!("0m".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::parse_from([
            "episcout", "--storage", "memory", "scan", "--days", "3", "--fetch-unknown", "--interval", "30m",
        ]);
        assert_eq!(cli.storage, StorageKind::Memory);
        match cli.command {
            Commands::Scan { args, interval } => {
                assert_eq!(args.days, 3);
                assert!(args.fetch_unknown);
                assert_eq!(args.max_minutes, 0);
                assert_eq!(interval, Some(HumanDuration(Duration::from_secs(1800))));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keyword_and_whitelist_commands() {
        let storage = InMemoryStorage::new();
        run_keywords(&storage, KeywordCommands::Seed).await.unwrap();
        run_keywords(&storage, KeywordCommands::Add { text: "dịch lạ".to_string() }).await.unwrap();
        let keywords = storage.keywords(0, usize::MAX).await.unwrap();
        assert_eq!(keywords.len(), SUGGESTED_KEYWORDS.len() + 1);

        let first = keywords.last().unwrap().id;
        run_keywords(&storage, KeywordCommands::Remove { id: first }).await.unwrap();
        assert!(run_keywords(&storage, KeywordCommands::Remove { id: first }).await.is_err());

        run_whitelist(&storage, WhitelistCommands::Add { domain: "vov.vn".to_string(), inactive: true })
            .await
            .unwrap();
        let whitelist = storage.whitelist(0, 10).await.unwrap();
        assert!(!whitelist[0].is_active);
    }
}

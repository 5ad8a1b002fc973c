use clap::{Args, Subcommand};
use es_core::{Result, ScanRequest, ScanResult, Tag};
use crate::manager::ScanManager;

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Only keep articles published within this many days
    #[arg(long, default_value_t = 7)]
    pub days: i64,
    /// Stop starting new work after this many minutes (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub max_minutes: i64,
    /// Also report articles from sources outside the whitelist
    #[arg(long)]
    pub fetch_unknown: bool,
}

impl ScanArgs {
    pub fn to_request(&self) -> ScanRequest {
        ScanRequest {
            fetch_unknown: self.fetch_unknown,
            days_limit: self.days,
            max_execution_time: self.max_minutes,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScannerCommands {
    /// Run one scan over every configured feed
    Run(ScanArgs),
    /// List configured feeds
    Feeds,
}

pub async fn handle_command(command: ScannerCommands, manager: &ScanManager) -> Result<()> {
    match command {
        ScannerCommands::Run(args) => {
            let result = manager.scan(&args.to_request()).await?;
            print_result(&result);
        }
        ScannerCommands::Feeds => {
            println!("Configured feeds:");
            for feed in manager.feeds() {
                println!("  {}", feed);
            }
        }
    }
    Ok(())
}

fn print_result(result: &ScanResult) {
    println!("💾 Trusted articles saved: {}", result.saved_trusted_count);
    println!("❓ Articles from unknown sources: {}", result.unknown_articles.len());
    for article in &result.unknown_articles {
        let marker = if article.has_tag(Tag::Alert) { "⚠️" } else { "-" };
        println!("{} [{}] {} - {}", marker, article.source_domain, article.title, article.link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_args_to_request() {
        let args = ScanArgs {
            days: 30,
            max_minutes: 2,
            fetch_unknown: true,
        };
        let request = args.to_request();
        assert_eq!(request.days_limit, 30);
        assert_eq!(request.max_execution_time, 2);
        assert!(request.fetch_unknown);
    }
}

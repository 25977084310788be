use crate::config::toml_config::AppConfig;
use crate::domain::model::ContractSource;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "contract-invoicer")]
#[command(about = "Manage rental contracts, invoices and billing calendars")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the backend API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Contract operations
    #[command(subcommand)]
    Contracts(ContractsCommand),
    /// Invoice operations
    #[command(subcommand)]
    Invoices(InvoicesCommand),
    /// Expand billing schedules into calendar events
    Calendar(CalendarArgs),
}

#[derive(Debug, Subcommand)]
pub enum ContractsCommand {
    /// List contracts from the backend
    List {
        /// Only show contracts from this source (manual or mcp)
        #[arg(long)]
        source: Option<ContractSource>,
    },
    /// Upload a contract document
    Upload { file: PathBuf },
    /// Sync contracts from the connected drive
    Sync {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Select the contract used by other commands
    Select { id: String },
}

#[derive(Debug, Subcommand)]
pub enum InvoicesCommand {
    /// List invoices, optionally for one contract
    List {
        #[arg(long)]
        contract: Option<String>,
    },
    /// Generate an invoice (defaults to the selected contract)
    Generate {
        #[arg(long)]
        contract: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        due_date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Download an invoice PDF into the download directory
    Download { id: String },
}

#[derive(Debug, Args)]
pub struct CalendarArgs {
    /// Read schedules from a JSON file instead of the backend
    #[arg(long)]
    pub schedules_file: Option<PathBuf>,

    /// Merge AI-extracted schedules from the backend
    #[arg(long)]
    pub with_extracted: bool,

    /// Read extracted schedule records from a JSON file
    #[arg(long)]
    pub extracted_file: Option<PathBuf>,

    /// Output format: table, json or csv
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Treat this date as today
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

impl Cli {
    /// 命令列參數覆蓋設定檔
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calendar_command() {
        let cli = Cli::try_parse_from([
            "contract-invoicer",
            "calendar",
            "--schedules-file",
            "s.json",
            "--format",
            "csv",
            "--today",
            "2025-01-31",
            "--api-url",
            "http://127.0.0.1:9000",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");

        match cli.command {
            Command::Calendar(args) => {
                assert_eq!(args.format, "csv");
                assert_eq!(args.today, NaiveDate::from_ymd_opt(2025, 1, 31));
                assert!(!args.with_extracted);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_contract_source_filter() {
        let cli =
            Cli::try_parse_from(["contract-invoicer", "contracts", "list", "--source", "mcp"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::Contracts(ContractsCommand::List {
                source: Some(ContractSource::Mcp)
            })
        ));
    }
}

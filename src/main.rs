use chrono::{NaiveTime, Utc};
use clap::Parser;
use contract_invoicer::config::cli::{CalendarArgs, ContractsCommand, InvoicesCommand};
use contract_invoicer::config::{Cli, Command};
use contract_invoicer::core::export::{self, OutputFormat};
use contract_invoicer::core::extracted::{merge_schedules, records_from_values};
use contract_invoicer::core::session;
use contract_invoicer::core::{BackendApi, ConfigProvider};
use contract_invoicer::domain::model::{Contract, GenerateInvoiceRequest, Schedule};
use contract_invoicer::utils::error::{AppError, ErrorSeverity, Result};
use contract_invoicer::utils::validation::{self, Validate};
use contract_invoicer::utils::logger;
use contract_invoicer::{ApiClient, AppConfig, AppState, LocalStorage, ScheduleExpander};
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("Config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(config.data_dir());

    if let Err(e) = run(&cli, &config, &storage).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        // 工作階段失效：清掉登入資訊，要求重新登入
        if e.requires_login() {
            if let Err(clear_err) = session::clear_session(&storage).await {
                tracing::warn!("Could not clear stored session: {}", clear_err);
            }
        }

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: &Cli, config: &AppConfig, storage: &LocalStorage) -> Result<()> {
    let stored_session = session::load_session(storage).await?;
    let api = ApiClient::from_config(config)?.with_session(stored_session.as_ref());
    let mut state = AppState::restore(storage).await?;

    let result = execute(&cli.command, config, &api, &mut state, storage).await;

    // 不論成功與否都寫回狀態
    if let Err(e) = state.persist(storage).await {
        tracing::warn!("Could not save state: {}", e);
    }
    result
}

async fn execute(
    command: &Command,
    config: &AppConfig,
    api: &ApiClient,
    state: &mut AppState,
    storage: &LocalStorage,
) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            validation::validate_non_empty_string("email", email)?;
            let new_session = api.login(email, password).await?;
            session::save_session(storage, &new_session).await?;
            println!("✅ Logged in as {}", new_session.email);
        }
        Command::Logout => {
            session::clear_session(storage).await?;
            println!("👋 Logged out");
        }
        Command::Contracts(cmd) => contracts(cmd, api, state).await?,
        Command::Invoices(cmd) => invoices(cmd, config, api, state).await?,
        Command::Calendar(args) => calendar(args, config, api, state).await?,
    }
    Ok(())
}

fn print_contract(contract: &Contract, selected: bool) {
    println!(
        "{} {:<14} [{:<6}] {:<32} {}",
        if selected { "*" } else { " " },
        contract.id(),
        contract.source().as_str(),
        contract.name(),
        contract.tenant().unwrap_or("-")
    );
}

async fn contracts(cmd: &ContractsCommand, api: &ApiClient, state: &mut AppState) -> Result<()> {
    match cmd {
        ContractsCommand::List { source } => {
            let selected = state.contracts.selected_id.clone();
            let contracts = state.contracts.fetch(api).await?;
            for contract in contracts
                .iter()
                .filter(|c| source.map_or(true, |s| c.source() == s))
            {
                print_contract(contract, selected.as_deref() == Some(contract.id()));
            }
        }
        ContractsCommand::Upload { file } => {
            validation::validate_upload_file("file", file)?;
            let contract = state.contracts.upload(api, file).await?;
            println!("✅ Uploaded {} ({})", contract.name(), contract.id());
        }
        ContractsCommand::Sync { folder } => {
            let count = state.contracts.sync_mcp(api, folder.as_deref()).await?;
            println!("🔄 Synced {} contracts from drive", count);
        }
        ContractsCommand::Select { id } => {
            if state.contracts.contracts.is_empty() {
                state.contracts.fetch(api).await?;
            }
            let contract = state.contracts.select(id)?;
            println!("✅ Selected {} ({})", contract.name(), contract.id());
        }
    }
    Ok(())
}

async fn invoices(
    cmd: &InvoicesCommand,
    config: &AppConfig,
    api: &ApiClient,
    state: &mut AppState,
) -> Result<()> {
    match cmd {
        InvoicesCommand::List { contract } => {
            for invoice in state.invoices.fetch(api, contract.as_deref()).await? {
                println!(
                    "{:<14} {:<14} {:>12.2} {:<4} {:?} due {}",
                    invoice.id,
                    invoice.contract_id,
                    invoice.amount,
                    invoice.currency.as_deref().unwrap_or(""),
                    invoice.status,
                    invoice
                        .due_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        InvoicesCommand::Generate {
            contract,
            template,
            due_date,
            notes,
        } => {
            let contract_id = contract
                .clone()
                .or_else(|| state.contracts.selected_id.clone())
                .ok_or_else(|| AppError::ValidationError {
                    message: "no contract given and none selected".to_string(),
                })?;
            let request = GenerateInvoiceRequest {
                template: template.clone().or_else(|| state.invoices.last_template.clone()),
                due_date: *due_date,
                notes: notes.clone(),
                ..GenerateInvoiceRequest::for_contract(contract_id)
            };
            let invoice = state.invoices.generate(api, &request).await?;
            println!(
                "✅ Generated invoice {} ({:.2})",
                invoice.invoice_number.as_deref().unwrap_or(&invoice.id),
                invoice.amount
            );
        }
        InvoicesCommand::Download { id } => {
            let downloads = LocalStorage::new(config.download_dir());
            let file = state.invoices.download_pdf(api, &downloads, id).await?;
            println!("💾 Saved {}", downloads.resolve(&file).display());
        }
    }
    Ok(())
}

async fn read_json_array(path: &Path) -> Result<Vec<serde_json::Value>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn calendar(
    args: &CalendarArgs,
    config: &AppConfig,
    api: &ApiClient,
    state: &AppState,
) -> Result<()> {
    let format: OutputFormat = args.format.parse()?;

    let schedules_file = args
        .schedules_file
        .clone()
        .or_else(|| config.schedule.schedules_file.as_ref().map(Into::into));
    let schedules: Vec<Schedule> = match schedules_file {
        Some(path) => {
            tracing::info!("📁 Loading schedules from {}", path.display());
            let bytes = tokio::fs::read(&path).await?;
            serde_json::from_slice(&bytes)?
        }
        None => api.list_schedules().await?,
    };

    let extracted = match (&args.extracted_file, args.with_extracted) {
        (Some(path), _) => records_from_values(read_json_array(path).await?),
        (None, true) => {
            api.extract_schedules(state.contracts.selected_id.as_deref())
                .await?
        }
        (None, false) => Vec::new(),
    };

    let merged = merge_schedules(schedules, &extracted);
    let now = args
        .today
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now);

    let expander = ScheduleExpander::new(config.expander_settings());
    let events = expander.expand(&merged, now);
    tracing::info!(
        "📅 {} events from {} schedules",
        events.len(),
        merged.len()
    );

    let rendered = export::render(&events, format)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            println!("📁 Calendar written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

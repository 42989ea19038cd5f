use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use std::path::Path;
use marketplace_report::adapters::csv_export::sales_to_csv;
use marketplace_report::adapters::sources::collect_sources;
use marketplace_report::adapters::storage::LocalStorage;
use marketplace_report::analytics::Report;
use marketplace_report::config::cli::FilterArgs;
use marketplace_report::core::jobs;
use marketplace_report::dashboard::{self, AppState};
use marketplace_report::domain::ports::{SalesRepository, Storage};
use marketplace_report::utils::error::ErrorSeverity;
use marketplace_report::utils::format::{eur, percent};
use marketplace_report::utils::validation::{self, Validate};
use marketplace_report::utils::logger;
use marketplace_report::{AppConfig, Cli, Command, EtlError, Result, RunSummary, SqliteSalesStore};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting marketplace-report CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
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

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    // 驗證配置
    config.validate()?;

    let store = SqliteSalesStore::open(&config.database.path).await?;
    let today = Local::now().date_naive();

    match cli.command {
        Command::Import {
            paths,
            folder,
            links_file,
        } => {
            let summary = if paths.is_empty() && folder.is_none() && links_file.is_none() {
                jobs::refresh_sources(store, &config.import).await?
            } else {
                let files: Vec<String> = paths
                    .iter()
                    .filter(|p| !p.starts_with("http://") && !p.starts_with("https://"))
                    .filter(|p| !Path::new(p.as_str()).is_dir())
                    .cloned()
                    .collect();
                validation::validate_xlsx_files("paths", &files)?;
                let locations =
                    collect_sources(&paths, folder.as_deref(), links_file.as_deref(), &[])?;
                jobs::import_locations(store, locations).await?
            };
            print_summary("Import", &summary);
        }
        Command::Sync {
            marketplace,
            all,
            period,
        } => {
            let range = period.resolve(today, today - Duration::days(30));
            let names: Vec<String> = if all {
                config
                    .configured_marketplaces()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                marketplace.into_iter().collect()
            };
            if names.is_empty() {
                return Err(EtlError::MissingConfigError {
                    field: "marketplaces".to_string(),
                });
            }

            let mut first_error = None;
            for name in names {
                match jobs::sync_marketplace(store.clone(), &config, &name, range).await {
                    Ok(summary) => print_summary(&name, &summary),
                    Err(e) => {
                        tracing::error!("❌ Sync of {} failed: {}", name, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            dashboard::serve(AppState::new(store, config), &bind).await?;
        }
        Command::Report { filter, top } => {
            if store.count().await? == 0 {
                println!("DB vuoto: importa dati.");
                return Ok(());
            }
            let rows = load_rows(&store, &filter, today).await?;
            if rows.is_empty() {
                println!("Nessun record.");
                return Ok(());
            }
            let report = Report::build(&rows, None, top.unwrap_or(config.server.default_top_n));
            print_report(&report);
        }
        Command::Export { output, filter } => {
            let rows = load_rows(&store, &filter, today).await?;
            let csv = sales_to_csv(&rows)?;
            LocalStorage::default().write_file(&output, &csv).await?;
            println!("📁 {} rows saved to {}", rows.len(), output);
        }
    }
    Ok(())
}

async fn load_rows(
    store: &SqliteSalesStore,
    filter: &FilterArgs,
    today: NaiveDate,
) -> Result<Vec<marketplace_report::domain::model::SaleRecord>> {
    let default_start = store
        .date_bounds()
        .await?
        .map(|bounds| bounds.start)
        .unwrap_or(today);
    store.load(&filter.to_filter(today, default_start)).await
}

fn print_summary(label: &str, summary: &RunSummary) {
    tracing::info!("✅ {} completed", label);
    println!(
        "✅ {}: {} new rows ({} read, {} already stored, {} skipped)",
        label,
        summary.inserted,
        summary.extracted,
        summary.duplicates(),
        summary.skipped
    );
}

fn print_report(report: &Report) {
    println!("Fatturato:        {}", eur(report.kpis.revenue));
    println!("Costi (acq+comm): {}", eur(report.kpis.costs));
    println!("Margine Lordo:    {}", eur(report.kpis.gross_margin));
    println!("Margine %:        {}", percent(report.kpis.margin_percent));

    println!();
    println!("Riepilogo marketplace");
    println!(
        "{:<20} {:>16} {:>16} {:>16} {:>16}",
        "Marketplace", "Vendite", "Acquisto", "Commissione", "Margine lordo"
    );
    for row in &report.summary {
        println!(
            "{:<20} {:>16} {:>16} {:>16} {:>16}",
            row.marketplace,
            eur(row.sales),
            eur(row.purchase_cost),
            eur(row.commission),
            eur(row.gross_margin)
        );
    }

    println!();
    println!("Prodotti più venduti");
    println!(
        "{:>3} {:<16} {:<30} {:>6} {:>14} {:>14}",
        "#", "SKU", "Nome", "Qta", "Vendite", "Margine"
    );
    for product in &report.top_products {
        let name: String = product.product_name.chars().take(30).collect();
        println!(
            "{:>3} {:<16} {:<30} {:>6} {:>14} {:>14}",
            product.rank,
            product.sku,
            name,
            product.quantity,
            eur(product.sales),
            eur(product.margin)
        );
    }
}

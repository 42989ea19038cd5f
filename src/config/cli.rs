use crate::analytics::periods::QuickRange;
use crate::domain::model::{DateRange, SalesFilter};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "marketplace-report")]
#[command(about = "Marketplace sales importer, API sync and reporting dashboard")]
pub struct Cli {
    /// Path to TOML configuration file (defaults to ./marketplace.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the SQLite database path
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import .xlsx sales exports into the database
    Import {
        /// Workbook files or URLs; configured sources are used when omitted
        paths: Vec<String>,

        /// Folder scanned for .xlsx files
        #[arg(long)]
        folder: Option<String>,

        /// File with one workbook URL per line
        #[arg(long)]
        links_file: Option<String>,
    },
    /// Pull orders from marketplace APIs into the database
    Sync {
        /// Marketplace name, e.g. "Worten" or "Leroy Merlin"
        #[arg(short, long, required_unless_present = "all")]
        marketplace: Option<String>,

        /// Sync every configured marketplace
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Serve the web dashboard
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print KPIs, marketplace summary and top products
    Report {
        #[command(flatten)]
        filter: FilterArgs,

        /// Number of top products
        #[arg(long)]
        top: Option<usize>,
    },
    /// Write the filtered rows to a CSV file
    Export {
        #[arg(short, long, default_value = "dati_filtrati.csv")]
        output: String,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PeriodArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Quick range: last30, today, yesterday, week, month, year
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub range: Option<QuickRange>,
}

impl PeriodArgs {
    /// Resolves against `today`; `default_start` fills a missing `--from`.
    pub fn resolve(&self, today: NaiveDate, default_start: NaiveDate) -> DateRange {
        if let Some(quick) = self.range {
            return quick.resolve(today);
        }
        DateRange::new(
            self.from.unwrap_or(default_start),
            self.to.unwrap_or(today),
        )
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Restrict to these marketplaces (repeatable)
    #[arg(short, long = "marketplace")]
    pub marketplaces: Vec<String>,

    #[command(flatten)]
    pub period: PeriodArgs,
}

impl FilterArgs {
    pub fn to_filter(&self, today: NaiveDate, default_start: NaiveDate) -> SalesFilter {
        SalesFilter {
            marketplaces: self.marketplaces.clone(),
            range: Some(self.period.resolve(today, default_start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_sync_command() {
        let cli = Cli::parse_from([
            "marketplace-report",
            "sync",
            "--marketplace",
            "Worten",
            "--from",
            "2024-05-01",
            "--to",
            "2024-05-31",
        ]);
        match cli.command {
            Command::Sync {
                marketplace,
                all,
                period,
            } => {
                assert_eq!(marketplace.as_deref(), Some("Worten"));
                assert!(!all);
                let range = period.resolve(ymd(2024, 6, 10), ymd(2024, 1, 1));
                assert_eq!(range, DateRange::new(ymd(2024, 5, 1), ymd(2024, 5, 31)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_sync_requires_marketplace_or_all() {
        assert!(Cli::try_parse_from(["marketplace-report", "sync"]).is_err());
        assert!(Cli::try_parse_from(["marketplace-report", "sync", "--all"]).is_ok());
    }

    #[test]
    fn test_report_filter_with_quick_range() {
        let cli = Cli::parse_from([
            "marketplace-report",
            "report",
            "-m",
            "Worten",
            "-m",
            "ePrice",
            "--range",
            "yesterday",
            "--top",
            "5",
        ]);
        let Command::Report { filter, top } = cli.command else {
            panic!("expected report");
        };
        assert_eq!(top, Some(5));
        let filter = filter.to_filter(ymd(2024, 5, 10), ymd(2024, 1, 1));
        assert_eq!(filter.marketplaces, vec!["Worten", "ePrice"]);
        assert_eq!(filter.range, Some(DateRange::single(ymd(2024, 5, 9))));
    }

    #[test]
    fn test_range_conflicts_with_explicit_dates() {
        assert!(Cli::try_parse_from([
            "marketplace-report",
            "export",
            "--range",
            "week",
            "--from",
            "2024-01-01",
        ])
        .is_err());
    }
}

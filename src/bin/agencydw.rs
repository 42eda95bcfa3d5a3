use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agencydw", about = "Clockify + Monday.com reporting warehouse CLI")]
struct Cli {
    /// Database path (default: ~/.agencydw/agencydw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl agencydw::SyncProgress for StderrProgress {
    fn on_user_start(&self, name: &str) {
        eprintln!("Processing user: {name}");
    }

    fn on_entries_fetched(&self, _name: &str, count: usize) {
        eprintln!("  Found {count} time entries");
    }

    fn on_board_start(&self, region: &str, board_name: &str) {
        eprintln!("Syncing {region} board: {board_name}");
    }

    fn on_group_start(&self, title: &str, items: usize) {
        eprintln!("  Processing group: {title} ({items} items)");
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sync against an external source
    Sync {
        #[command(subcommand)]
        source: SyncSource,
    },
    /// Serve the HTTP sync trigger endpoints
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8787")]
        port: u16,
    },
    /// Show warehouse status
    Status,
}

#[derive(Subcommand)]
enum SyncSource {
    /// Sync time entries from Clockify
    Clockify {
        /// Look-back window in days (default: 7)
        #[arg(long)]
        days_back: Option<i64>,
    },
    /// Sync clients and sprints from the Monday.com boards
    Monday,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => agencydw::Database::open_at(path).await?,
        None => agencydw::Database::open().await?,
    };
    let dw = agencydw::AgencyDW::new(db, agencydw::Config::from_env());

    match cli.command {
        Commands::Sync { source } => match source {
            SyncSource::Clockify { days_back } => {
                let options = agencydw::SyncOptions {
                    days_back: days_back.unwrap_or(agencydw::DEFAULT_DAYS_BACK),
                };
                let report = dw.sync_clockify(&options, &StderrProgress).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            SyncSource::Monday => {
                let report = dw.sync_monday(&StderrProgress).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        },
        Commands::Serve { port } => {
            tokio::task::block_in_place(|| {
                agencydw::serve::serve(&dw, &tokio::runtime::Handle::current(), port)
            })?;
        }
        Commands::Status => {
            print_status(dw.db()).await?;
        }
    }

    Ok(())
}

async fn print_status(db: &agencydw::Database) -> anyhow::Result<()> {
    use agencydw::storage::repository;

    let (counts, logs) = db
        .reader()
        .call(|conn| {
            let mut counts = Vec::new();
            for table in ["clients", "sprints", "time_entries", "users"] {
                counts.push((table, repository::count_rows(conn, table)?));
            }
            let mut logs = Vec::new();
            for source in ["clockify", "monday"] {
                if let Some(row) = repository::last_sync_log(conn, source)? {
                    logs.push(row);
                }
            }
            Ok::<_, rusqlite::Error>((counts, logs))
        })
        .await?;

    println!("Warehouse contents:");
    for (table, count) in counts {
        println!("  {table:<14} {count}");
    }
    if logs.is_empty() {
        println!("No syncs recorded yet.");
    } else {
        println!("Last syncs:");
        for row in logs {
            println!(
                "  {:<10} {} {} ({} records)",
                row.source, row.status, row.sync_end, row.records_synced
            );
        }
    }
    Ok(())
}

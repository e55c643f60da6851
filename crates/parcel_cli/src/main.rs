//! Command-line front end for the parcel tracker.
//!
//! # Responsibility
//! - Own the storage connection: open it, run one command, close it.
//! - Print command results as JSON on stdout.
//!
//! # Invariants
//! - Every command goes through `parcel_core`; no SQL lives here.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use parcel_core::db::{open_db, Connection};
use parcel_core::{
    created_at_now, default_log_level, init_logging, ClientId, LoggingConfig, Parcel,
    ParcelNumber, ParcelRepository, ParcelService, ParcelServiceError, SqliteParcelRepository,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "parcel",
    version,
    about = "Track parcels through registration, dispatch and delivery"
)]
struct Cli {
    /// SQLite database file holding the `parcel` table.
    #[arg(long, env = "PARCEL_DB", default_value = "tracker.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long, env = "PARCEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rolling log files. Logging stays off when unset.
    #[arg(long, env = "PARCEL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a parcel with an explicit status.
    Add(AddArgs),
    /// Show one parcel.
    Get { number: ParcelNumber },
    /// List all parcels of a client.
    List {
        #[arg(long)]
        client: ClientId,
    },
    /// Overwrite the status of a parcel.
    SetStatus { number: ParcelNumber, status: String },
    /// Change the address of a registered parcel.
    SetAddress {
        number: ParcelNumber,
        address: String,
    },
    /// Delete a registered parcel.
    Delete { number: ParcelNumber },
    /// Register a new parcel stamped with the current time.
    Register {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
    },
    /// Move a parcel to its next lifecycle status.
    Advance { number: ParcelNumber },
    /// Walk one client through the whole lifecycle.
    Demo {
        #[arg(long, default_value_t = 1)]
        client: ClientId,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    client: ClientId,
    #[arg(long)]
    address: String,
    #[arg(long, default_value = "registered")]
    status: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let result = run(&conn, cli.command);
    // Close explicitly so close errors are reported instead of dropped.
    conn.close()
        .map_err(|(_, err)| err)
        .context("failed to close database")?;
    result
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let Some(log_dir) = cli.log_dir.as_ref() else {
        return Ok(());
    };
    let log_dir = if log_dir.is_absolute() {
        log_dir.clone()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(log_dir)
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&LoggingConfig::new(level, log_dir)).context("failed to initialize logging")
}

fn run(conn: &Connection, command: Command) -> Result<()> {
    let repo = SqliteParcelRepository::try_new(conn)?;
    match command {
        Command::Add(args) => {
            let parcel = Parcel::new(
                args.client,
                args.status,
                args.address,
                created_at_now(),
            );
            let number = repo.add(&parcel)?;
            print_json(&json!({ "number": number }))
        }
        Command::Get { number } => print_json(&repo.get(number)?),
        Command::List { client } => print_json(&repo.get_by_client(client)?),
        Command::SetStatus { number, status } => {
            repo.set_status(number, &status)?;
            print_json(&repo.get(number)?)
        }
        Command::SetAddress { number, address } => {
            repo.set_address(number, &address)?;
            print_json(&repo.get(number)?)
        }
        Command::Delete { number } => {
            repo.delete(number)?;
            print_json(&json!({ "deleted": number }))
        }
        Command::Register { client, address } => {
            let service = ParcelService::new(repo);
            print_json(&service.register(client, address)?)
        }
        Command::Advance { number } => {
            let service = ParcelService::new(repo);
            let status = service.advance_status(number)?;
            print_json(&json!({ "number": number, "status": status }))
        }
        Command::Demo { client } => run_demo(ParcelService::new(repo), client),
    }
}

fn run_demo<R: ParcelRepository>(service: ParcelService<R>, client: ClientId) -> Result<()> {
    info!("event=demo module=cli status=start client={client}");

    let parcel = service.register(client, "Pskov, Pushkin st. 5")?;
    println!("registered parcel {}", parcel.number);

    service.change_address(parcel.number, "Saratov, Lenin sq. 15")?;
    println!("changed address of parcel {}", parcel.number);

    let status = service.advance_status(parcel.number)?;
    println!("parcel {} is now {status}", parcel.number);

    print_client_parcels(&service, client)?;

    match service.cancel(parcel.number) {
        Err(ParcelServiceError::NotCancellable(number)) => {
            println!("parcel {number} is already {status} and stays in the tracker");
        }
        other => other?,
    }

    let spare = service.register(client, "Pskov, Pushkin st. 5")?;
    println!("registered parcel {}", spare.number);
    service.cancel(spare.number)?;
    println!("cancelled parcel {}", spare.number);

    print_client_parcels(&service, client)?;
    info!("event=demo module=cli status=ok client={client}");
    Ok(())
}

fn print_client_parcels<R: ParcelRepository>(
    service: &ParcelService<R>,
    client: ClientId,
) -> Result<()> {
    println!("parcels of client {client}:");
    for parcel in service.client_parcels(client)? {
        println!(
            "  #{} {} [{}] created {}",
            parcel.number, parcel.address, parcel.status, parcel.created_at
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

mod client;
mod render;
mod types;
mod view;

use std::time::Duration;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};
use crate::types::{ClearableField, NewStore, StoreEdit};
use crate::view::{StoreListView, DEFAULT_PER_PAGE};

#[derive(Debug, Parser)]
#[command(name = "dvdscout-cli")]
#[command(about = "DVD Scout command line client")]
struct Cli {
    /// Base URL of the dvdscout-server API
    #[arg(
        long,
        env = "DVDSCOUT_API_URL",
        default_value = "http://localhost:8001/api",
        global = true
    )]
    api_url: String,

    /// Bearer token for the API
    #[arg(long, env = "DVDSCOUT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show aggregate counts and recent jobs
    Stats,
    /// Browse and edit stores
    Stores {
        #[command(subcommand)]
        command: StoreCommands,
    },
    /// Launch a background search job
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },
    /// List recent jobs
    Jobs {
        /// Maximum number of jobs to show
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Keep refreshing until no job is pending or running
        #[arg(long)]
        watch: bool,
        /// Seconds between refreshes when watching
        #[arg(long, default_value = "3")]
        interval: u64,
    },
    /// Show a single job
    Job { id: Uuid },
    /// Show the email provider's remaining credits
    Account,
}

#[derive(Debug, Subcommand)]
enum StoreCommands {
    /// List stores, newest first
    List {
        /// Case-insensitive text matched against name, address, and city
        #[arg(long)]
        search: Option<String>,
        /// Only verified (true) or unverified (false) stores
        #[arg(long)]
        verified: Option<bool>,
        /// Only stores with (true) or without (false) an email
        #[arg(long)]
        has_email: Option<bool>,
        /// Two-letter state, e.g. TX
        #[arg(long)]
        state: Option<String>,
        /// One-based page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Rows per page
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Show every field of a store
    Show { id: Uuid },
    /// Add a store manually
    Add {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: StoreFieldArgs,
    },
    /// Edit a store; omitted fields are left unchanged
    Edit {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: StoreFieldArgs,
        /// Clear a field (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<ClearableField>,
    },
    /// Mark a store as verified
    Verify { id: Uuid },
    /// Delete a store permanently
    Delete { id: Uuid },
}

#[derive(Debug, Default, clap::Args)]
struct StoreFieldArgs {
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Subcommand)]
enum SearchCommands {
    /// Search business directories
    Directory {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        max_results: Option<u32>,
    },
    /// Search Reddit posts for store names
    Reddit {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        max_posts: Option<u32>,
    },
    /// Look up emails for stores; without ids, every store with a website
    /// and no email is processed
    Emails {
        #[arg(long = "store-id")]
        store_ids: Vec<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("dvdscout-cli ready; run with --help to list commands");
        return Ok(());
    };

    let client = ApiClient::new(&cli.api_url, cli.api_key)?;
    tracing::debug!(?client, "api client ready");

    match command {
        Commands::Stats => {
            let stats = client.stats().await?;
            print!("{}", render::dashboard(&stats));
        }
        Commands::Stores { command } => run_store_command(&client, command).await?,
        Commands::Search { command } => run_search_command(&client, command).await?,
        Commands::Jobs {
            limit,
            watch,
            interval,
        } => run_jobs(&client, limit, watch, Duration::from_secs(interval.max(1))).await?,
        Commands::Job { id } => {
            let job = client
                .get_job(id)
                .await
                .map_err(|e| not_found_as(e, || format!("job {id} not found")))?;
            print!("{}", render::job_detail(&job));
        }
        Commands::Account => {
            let account = client.provider_account().await?;
            println!(
                "{} credits remaining ({} plan)",
                account.credits_remaining, account.plan_name
            );
        }
    }

    Ok(())
}

async fn run_store_command(client: &ApiClient, command: StoreCommands) -> anyhow::Result<()> {
    match command {
        StoreCommands::List {
            search,
            verified,
            has_email,
            state,
            page,
            per_page,
        } => {
            let view = StoreListView {
                search,
                verified,
                has_email,
                state,
                page,
                per_page,
            };
            let stores = client.list_stores(&view).await?;
            if stores.is_empty() {
                println!("no stores found ({})", view.describe());
                return Ok(());
            }
            print!("{}", render::stores_table(&stores));
            println!();
            let more = if view.has_next_page(stores.len()) {
                format!("; more with --page {}", view.page.max(1) + 1)
            } else {
                String::new()
            };
            println!("{} | {} shown{more}", view.describe(), stores.len());
        }
        StoreCommands::Show { id } => {
            let store = client
                .get_store(id)
                .await
                .map_err(|e| not_found_as(e, || format!("store {id} not found")))?;
            print!("{}", render::store_detail(&store));
        }
        StoreCommands::Add { name, fields } => {
            let store = client.create_store(&new_store(name, fields)).await?;
            println!("added store {} ({})", store.name, store.id);
        }
        StoreCommands::Edit {
            id,
            name,
            fields,
            clear,
        } => {
            let edit = store_edit(name, fields, clear);
            if edit.is_empty() {
                anyhow::bail!("nothing to change; pass at least one field or --clear");
            }
            let store = client.update_store(id, &edit).await?;
            print!("{}", render::store_detail(&store));
        }
        StoreCommands::Verify { id } => {
            let store = client.verify_store(id).await?;
            println!("verified store {} ({})", store.name, store.id);
        }
        StoreCommands::Delete { id } => {
            let message = client
                .delete_store(id)
                .await
                .map_err(|e| not_found_as(e, || format!("store {id} not found")))?;
            println!("{message}");
        }
    }
    Ok(())
}

async fn run_search_command(client: &ApiClient, command: SearchCommands) -> anyhow::Result<()> {
    let (kind, started) = match command {
        SearchCommands::Directory {
            query,
            location,
            max_results,
        } => (
            "directory",
            client
                .start_directory_search(query.as_deref(), location.as_deref(), max_results)
                .await?,
        ),
        SearchCommands::Reddit { query, max_posts } => (
            "reddit",
            client
                .start_reddit_search(query.as_deref(), max_posts)
                .await?,
        ),
        SearchCommands::Emails { store_ids } => {
            ("email", client.start_email_discovery(&store_ids).await?)
        }
    };
    println!("{}", render::job_started(kind, &started));
    println!("follow progress with `dvdscout-cli jobs --watch`");
    Ok(())
}

async fn run_jobs(
    client: &ApiClient,
    limit: u32,
    watch: bool,
    interval: Duration,
) -> anyhow::Result<()> {
    loop {
        let jobs = client.list_jobs(limit).await?;
        if jobs.is_empty() {
            println!("no jobs yet; start one with `dvdscout-cli search`");
            return Ok(());
        }
        print!("{}", render::jobs_table(&jobs));

        let active = jobs.iter().filter(|j| j.is_active()).count();
        if !watch || active == 0 {
            return Ok(());
        }
        println!("{active} job(s) still active; refreshing in {}s", interval.as_secs());
        println!();
        tokio::time::sleep(interval).await;
    }
}

/// Replaces a 404 with a message naming the missing record.
fn not_found_as(error: ClientError, message: impl FnOnce() -> String) -> anyhow::Error {
    if error.is_not_found() {
        anyhow::anyhow!(message())
    } else {
        error.into()
    }
}

fn new_store(name: String, fields: StoreFieldArgs) -> NewStore {
    NewStore {
        name,
        address: fields.address,
        city: fields.city,
        state: fields.state,
        phone: fields.phone,
        website: fields.website,
        email: fields.email,
        notes: fields.notes,
    }
}

fn store_edit(name: Option<String>, fields: StoreFieldArgs, clear: Vec<ClearableField>) -> StoreEdit {
    StoreEdit {
        name,
        address: fields.address,
        city: fields.city,
        state: fields.state,
        phone: fields.phone,
        website: fields.website,
        email: fields.email,
        notes: fields.notes,
        clear,
    }
}

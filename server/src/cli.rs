//! Command-line interface
//!
//! `serve` runs the web server, `mcp` the stdio MCP server, `local` works
//! on the local library file and `moderate` approves community content.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use favored_prompts::config::{
    default_local_store_path, Config, DEFAULT_BASE_URL, MCP_API_KEY_ENV, MCP_BASE_URL_ENV,
    USER_AGENT,
};
use favored_prompts::database::{create_pool, Repository};
use favored_prompts::local::storage::{decode, encode};
use favored_prompts::local::{FileStorage, LocalPrompt, LocalPromptPatch, LocalStore, SystemClock};
use favored_prompts::mcp::{StdioTransport, ToolServer};
use favored_prompts::remote::ApiClient;
use favored_prompts::services::{CommunityService, SubmissionsService};

#[derive(Parser)]
#[command(name = "favored", version, about = "Prompt library server and client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to listen on, overrides FAVORED_BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Serve MCP tools over stdin/stdout against a running server
    Mcp {
        #[arg(long, env = MCP_API_KEY_ENV, hide_env_values = true)]
        api_key: String,
        #[arg(long, env = MCP_BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Work with the local prompt library
    Local(LocalArgs),
    /// Approve community submissions and nominations
    Moderate {
        #[command(subcommand)]
        action: ModerateAction,
    },
}

#[derive(Args)]
pub struct LocalArgs {
    /// Library file, defaults to FAVORED_LOCAL_STORE or ./anon-prompts.json
    #[arg(long)]
    store: Option<PathBuf>,
    /// API key for syncing with a server; without it the library stays offline
    #[arg(long, env = MCP_API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = MCP_BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[command(subcommand)]
    command: LocalCommand,
}

#[derive(Subcommand)]
pub enum LocalCommand {
    /// List prompts
    List {
        /// Only prompts in this collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show one prompt, fetching its body from the server if needed
    Show { id: String },
    /// Add a prompt
    Add {
        text: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "collection")]
        collections: Vec<String>,
    },
    /// Delete a prompt
    Rm { id: String },
    /// Search text, title, category and tags
    Search { query: String },
    /// List collections
    Collections,
    /// Create a collection
    NewCollection {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a collection, keeping its prompts
    RmCollection { id: String },
    /// Add a prompt to a collection, or remove it if already there
    Toggle { prompt_id: String, collection_id: String },
    /// Merge prompts and collections from an exported file
    Import { file: PathBuf },
    /// Write the library as JSON to a file or stdout
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Pull the server's library index into the local library
    Sync,
}

#[derive(Subcommand)]
pub enum ModerateAction {
    /// Publish a pending guest submission
    ApproveSubmission { id: String },
    /// Move a pending nomination into the curated community library
    ApproveNomination { id: String },
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

pub async fn run_mcp(api_key: String, base_url: String) -> Result<()> {
    if api_key.trim().is_empty() {
        bail!("{MCP_API_KEY_ENV} is required");
    }

    let client = ApiClient::new(http_client()?, base_url, api_key);
    tracing::info!("Serving MCP tools for {}", client.base_url());

    let transport = StdioTransport::new(ToolServer::new(Arc::new(client)));
    transport.run().await.context("stdio transport failed")?;
    Ok(())
}

pub async fn run_local(args: LocalArgs) -> Result<()> {
    let path = args.store.unwrap_or_else(default_local_store_path);
    let store = LocalStore::open(Arc::new(FileStorage::new(path)), Arc::new(SystemClock)).await;

    if let Some(api_key) = args.api_key.filter(|k| !k.trim().is_empty()) {
        let client = ApiClient::new(http_client()?, args.base_url, api_key);
        if let Some(report) = store.connect(Arc::new(client)).await {
            if report.changed() {
                eprintln!(
                    "Synced: {} new prompts, {} updated, {} new collections",
                    report.prompts_added, report.prompts_updated, report.collections_added
                );
            }
        }
    } else if matches!(args.command, LocalCommand::Sync) {
        bail!("sync needs an API key (--api-key or {MCP_API_KEY_ENV})");
    }

    let result = run_local_command(&store, args.command).await;

    // Let queued remote writes and saves finish before exiting
    store.flush().await;
    result
}

async fn run_local_command(store: &LocalStore, command: LocalCommand) -> Result<()> {
    match command {
        LocalCommand::List { collection } => {
            let state = store.snapshot();
            state
                .prompts
                .iter()
                .filter(|p| {
                    collection
                        .as_ref()
                        .is_none_or(|c| p.collection_ids.contains(c))
                })
                .for_each(print_prompt_line);
        }
        LocalCommand::Show { id } => {
            let prompt = store.hydrate_prompt(&id).await?;
            println!("{}", serde_json::to_string_pretty(&prompt)?);
        }
        LocalCommand::Add {
            text,
            title,
            category,
            tags,
            collections,
        } => {
            let mut prompt = store.add_prompt(text, category, tags, collections).await;
            if title.is_some() {
                prompt = store
                    .update_prompt(
                        &prompt.id,
                        LocalPromptPatch {
                            title,
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            println!("{}", prompt.id);
        }
        LocalCommand::Rm { id } => store.delete_prompt(&id).await?,
        LocalCommand::Search { query } => {
            store.search(&query).iter().for_each(print_prompt_line);
        }
        LocalCommand::Collections => {
            for collection in store.snapshot().collections {
                println!("{}\t{}", collection.id, collection.name);
            }
        }
        LocalCommand::NewCollection {
            name,
            description,
            color,
        } => {
            let collection = store.create_collection(name, description, color).await?;
            println!("{}", collection.id);
        }
        LocalCommand::RmCollection { id } => store.delete_collection(&id).await?,
        LocalCommand::Toggle {
            prompt_id,
            collection_id,
        } => {
            let prompt = store.toggle_collection(&prompt_id, &collection_id).await?;
            let state = if prompt.collection_ids.contains(&collection_id) {
                "added to"
            } else {
                "removed from"
            };
            println!("{} {} {}", prompt.id, state, collection_id);
        }
        LocalCommand::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let data = decode(&raw).context("not a prompt library export")?;
            let summary = store.import_data(data).await;
            println!(
                "Imported {} prompts and {} collections",
                summary.prompts, summary.collections
            );
        }
        LocalCommand::Export { output } => {
            let data = store.export();
            let raw = encode(&data.prompts, &data.collections)?;
            match output {
                Some(path) => tokio::fs::write(&path, raw)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{raw}"),
            }
        }
        LocalCommand::Sync => {
            let state = store.snapshot();
            println!(
                "{} prompts, {} collections",
                state.prompts.len(),
                state.collections.len()
            );
        }
    }

    Ok(())
}

fn print_prompt_line(prompt: &LocalPrompt) {
    let label = prompt
        .title
        .clone()
        .unwrap_or_else(|| prompt.text.lines().next().unwrap_or_default().to_string());
    let synced = if prompt.remote_id.is_some() { "*" } else { " " };
    println!("{}{}\t[{}]\t{}", synced, prompt.id, prompt.category, label);
}

pub async fn run_moderate(action: ModerateAction) -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let repo = Repository::new(
        create_pool(&config.database_path)
            .await
            .context("failed to open database")?,
    );

    match action {
        ModerateAction::ApproveSubmission { id } => {
            let submission = SubmissionsService::new(repo).approve(&id).await?;
            println!("Approved submission {}", submission.id);
        }
        ModerateAction::ApproveNomination { id } => {
            let curated = CommunityService::new(repo).approve_nomination(&id).await?;
            println!("Published {} as {}", curated.gist_id, curated.title);
        }
    }

    Ok(())
}

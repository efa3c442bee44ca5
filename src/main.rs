use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xiaomi_jobs::agent::{self, JobsAgent, TaskRequest};
use xiaomi_jobs::api;
use xiaomi_jobs::client::{JobSource, JobsClient};
use xiaomi_jobs::config::{self, AppConfig};
use xiaomi_jobs::format::render_outcome;
use xiaomi_jobs::mcp::{McpClient, McpServer};
use xiaomi_jobs::models::{SearchQuery, DEFAULT_LIMIT};
use xiaomi_jobs::state::AppState;

const DEFAULT_LOG_FILTER: &str = "xiaomi_jobs=debug,tower_http=debug";

#[derive(Parser)]
#[command(name = "xiaomi-jobs")]
#[command(about = "Xiaomi careers job search: console, MCP tool server, REST API and A2A agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.json (defaults to ./config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SearchArgs {
    /// Search keyword
    #[arg(default_value = "")]
    keyword: String,

    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: u32,

    #[arg(short, long, default_value_t = 0)]
    offset: u32,

    /// Location codes, comma separated (e.g. CN_110000)
    #[arg(long, value_delimiter = ',')]
    locations: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Search once and print the results
    Search(SearchArgs),
    /// Serve the MCP tool protocol on stdin/stdout
    Mcp,
    /// Search through a spawned MCP server
    McpQuery(SearchArgs),
    /// Run the REST API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the A2A agent
    Agent {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one sample agent task and print it
    AgentDemo,
}

impl Command {
    /// stdout carries program output in these modes
    fn logs_to_stderr(&self) -> bool {
        matches!(
            self,
            Command::Search(_) | Command::Mcp | Command::McpQuery(_) | Command::AgentDemo
        )
    }
}

fn init_tracing(to_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if to_stderr {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn job_source(config: &AppConfig) -> anyhow::Result<Arc<dyn JobSource>> {
    Ok(Arc::new(JobsClient::new(&config.upstream)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.command.logs_to_stderr());

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    config::init_config(&config_path)?;
    let app_config = config::config();

    match cli.command {
        Command::Search(args) => {
            let source = job_source(&app_config)?;
            let query = SearchQuery::new(args.keyword)
                .with_limit(args.limit)
                .with_offset(args.offset)
                .with_locations(args.locations);
            let outcome = source.search(&query).await;
            println!("{}", render_outcome(&outcome));
        }
        Command::Mcp => {
            tracing::info!("Starting MCP server on stdio");
            McpServer::new(job_source(&app_config)?).serve_stdio().await?;
        }
        Command::McpQuery(args) => {
            let mut extra = Vec::new();
            if let Some(path) = &cli.config {
                extra.push("--config".to_string());
                extra.push(path.display().to_string());
            }
            let client = McpClient::current_exe(extra)?;
            let text = client
                .search_jobs(&args.keyword, args.limit, args.offset, &args.locations)
                .await?;
            println!("{}", text);
        }
        Command::Serve { host, port } => {
            let mut server = app_config.server.clone();
            server.host = host.unwrap_or(server.host);
            server.port = port.unwrap_or(server.port);

            let state = Arc::new(AppState::new(job_source(&app_config)?, &app_config.webhook));
            let app = api::create_router(state.clone())
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let bind_addr = server.bind_address();
            let listener = tokio::net::TcpListener::bind(&bind_addr)
                .await
                .with_context(|| format!("Failed to bind {}", bind_addr))?;
            tracing::info!("REST API running at http://{}", bind_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            state.webhooks.cancel_all();
        }
        Command::Agent { host, port } => {
            let mut agent_config = app_config.agent.clone();
            agent_config.host = host.unwrap_or(agent_config.host);
            agent_config.port = port.unwrap_or(agent_config.port);

            let jobs_agent = Arc::new(
                JobsAgent::new(job_source(&app_config)?, &agent_config.endpoint())
                    .with_task_retention(agent_config.task_retention),
            );
            let app = agent::create_router(jobs_agent)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let bind_addr = agent_config.bind_address();
            let listener = tokio::net::TcpListener::bind(&bind_addr)
                .await
                .with_context(|| format!("Failed to bind {}", bind_addr))?;
            tracing::info!("A2A agent running at http://{} (card: /agent-card)", bind_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::AgentDemo => {
            let endpoint = app_config.agent.endpoint();
            let jobs_agent = JobsAgent::new(job_source(&app_config)?, &endpoint);
            let request = TaskRequest::new("Search for Python developer jobs at Xiaomi")
                .with_context(json!({"keyword": "python", "limit": 5}));
            let task_id = request.task_id.clone();

            let status = jobs_agent.process_task(request).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            println!("Agent card: {}/agent-card", endpoint);
            println!("Task status: {}/task/{}/status", endpoint, task_id);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wb_analytics_mcp_runtime::client::DEFAULT_API_URL;
use wb_analytics_mcp_runtime::token::TokenSource;
use wb_analytics_mcp_runtime::{McpCommands, McpRuntimeConfig, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "wb-analytics-mcp",
    version,
    about = "WB seller analytics MCP server over stdio"
)]
struct Cli {
    /// Analytics API base URL
    #[arg(long, env = "WB_ANALYTICS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Access token, used when WB_ANALYTICS_OAUTH_TOKEN is not set
    #[arg(long = "apiKey", global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<McpCommands>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries protocol frames; logs go to stderr only.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wb_analytics_mcp=info,wb_analytics_mcp_runtime=info".into()),
        )
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = McpRuntimeConfig {
        api_url: cli.api_url,
        tokens: TokenSource::from_process(cli.api_key),
    };

    let code = run_mcp(config, cli.command.unwrap_or(McpCommands::Serve)).await;
    std::process::exit(code);
}

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use message_board::browse::{board_view, reply_view, thread_view, BoardView};
use message_board::render::render_board;
use message_board::{
    validate_content, ClientConfig, ClientError, ClientResult, HttpMessageService, LoginCredentials,
    Session,
};
use message_tree::{MessageId, ServiceError, TreeController};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Message board command line client
#[derive(Parser)]
#[clap(name = "message-board", version, about = "Read and post to the message board")]
struct Cli {
    /// Base URL of the board API (overrides MESSAGE_BOARD_API_URL)
    #[clap(long)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides MESSAGE_BOARD_TIMEOUT_SECS)
    #[clap(long)]
    timeout: Option<u64>,

    /// Retries for transient failures (overrides MESSAGE_BOARD_MAX_RETRIES)
    #[clap(long)]
    retries: Option<u32>,

    /// Set the log level (error, warn, info, debug, trace)
    #[clap(short, long, default_value = "warn")]
    log_level: String,

    /// Username or email to log in with
    #[clap(short, long, env = "MESSAGE_BOARD_USER")]
    user: Option<String>,

    /// Password to log in with
    #[clap(long, env = "MESSAGE_BOARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the board API is reachable
    Health,

    /// Show the board
    List {
        /// Show the replies of these messages, in order
        #[clap(long = "expand", value_name = "ID")]
        expand: Vec<MessageId>,
    },

    /// Show a message and its replies
    Thread {
        /// Message to start from; a reply needs its ancestors in --via
        id: MessageId,

        /// Levels of replies to load below the message
        #[clap(short, long, default_value = "1")]
        depth: usize,

        /// Ancestors of the message to open first, outermost first (e.g. 1,3)
        #[clap(long, value_name = "ID", value_delimiter = ',')]
        via: Vec<MessageId>,
    },

    /// Post a new message
    Post {
        content: String,
    },

    /// Reply to a message
    Reply {
        parent: MessageId,
        content: String,

        /// Ancestors of the parent to open first so the new reply is shown (e.g. 1,3)
        #[clap(long, value_name = "ID", value_delimiter = ',')]
        via: Vec<MessageId>,
    },
}

/// Initialize logging
fn init_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set global default subscriber: {}", e))
}

fn client_config(cli: &Cli) -> ClientResult<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_seconds = timeout;
    }
    if let Some(retries) = cli.retries {
        config.max_retry_attempts = retries;
    }
    config.validate()?;
    Ok(config)
}

async fn open_session(
    cli: &Cli,
    service: Arc<HttpMessageService>,
) -> ClientResult<Session<HttpMessageService>> {
    let (user, password) = match (&cli.user, &cli.password) {
        (Some(user), Some(password)) => (user, password),
        _ => {
            return Err(ClientError::Auth(
                "--user and --password (or MESSAGE_BOARD_USER and MESSAGE_BOARD_PASSWORD) \
                 are required"
                    .to_string(),
            ))
        }
    };
    Session::login(service, &LoginCredentials::new(user.as_str(), password.as_str())).await
}

/// Print the notices of a view to stderr, then its rendered text
fn print_view(view: &BoardView) {
    for notice in &view.notices {
        eprintln!("{}", notice.yellow());
    }
    if !view.rendered.is_empty() {
        println!("{}", view.rendered);
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = client_config(&cli)?;
    let service = Arc::new(HttpMessageService::new(config)?);

    match &cli.command {
        Commands::Health => {
            let url = service.config().api_base_url.clone();
            if TreeController::new(service).check_health().await {
                println!("{} {}", "reachable".green(), url);
            } else {
                println!("{} {}", "unreachable".red(), url);
                return Err(ServiceError::Connectivity(url).into());
            }
        }
        Commands::List { expand } => {
            let session = open_session(&cli, service).await?;
            print_view(&board_view(session.controller(), expand).await?);
        }
        Commands::Thread { id, depth, via } => {
            let session = open_session(&cli, service).await?;
            print_view(&thread_view(session.controller(), via, *id, *depth).await?);
        }
        Commands::Post { content } => {
            let content = validate_content(content)?;
            let session = open_session(&cli, service).await?;
            let controller = session.controller();

            let posted = controller.post_message(content).await?;
            println!("{} #{}", "Posted message".green(), posted.id);
            println!("{}", render_board(&*controller.read().await));
        }
        Commands::Reply {
            parent,
            content,
            via,
        } => {
            let content = validate_content(content)?;
            let session = open_session(&cli, service).await?;

            let (reply, view) = reply_view(session.controller(), via, *parent, content).await?;
            println!("{} #{} to #{}", "Posted reply".green(), reply, parent);
            print_view(&view);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_studio::{
    api,
    client::AgentClient,
    config::{ClientConfig, ServerConfig},
    db,
    models::Attachment,
    session::{AuthContext, EditSession, FieldKey, StepValue},
};

const PLACEHOLDER: &str = "(not set)";

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Create and edit chat agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent store server
    Serve {
        /// Port for HTTP API (defaults to AGENT_STUDIO_PORT or 17020)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List agents
    List,
    /// Show one agent
    Show { name: String },
    /// Delete an agent and its attachments
    Delete { name: String },
    /// Mark an agent's attachment processing as complete
    Ready { name: String },
    /// Create an agent (no NAME) or edit an existing one
    Edit(EditArgs),
}

#[derive(clap::Args)]
struct EditArgs {
    /// Agent to edit; omit to create a new one
    agent: Option<String>,

    /// Name of the new agent
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    instructions: Option<String>,

    #[arg(long)]
    welcome_message: Option<String>,

    /// Suggested prompt; repeat to give several, in order
    #[arg(long = "prompt")]
    prompts: Vec<String>,

    /// File to upload; repeatable
    #[arg(long = "attach")]
    attach: Vec<PathBuf>,

    /// Committed attachment to remove; repeatable
    #[arg(long = "detach")]
    detach: Vec<String>,

    /// Show the pending changes without saving
    #[arg(long)]
    dry_run: bool,
}

/// Initialize tracing; client commands log to stderr so stdout stays clean
fn init_tracing(use_stderr: bool) {
    let default_filter = if use_stderr {
        "agent_studio=warn"
    } else {
        "agent_studio=debug,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Commands::Serve { .. });
    init_tracing(use_stderr);

    match cli.command {
        Commands::Serve { port } => serve(port).await?,
        Commands::List => {
            let client = AgentClient::with_config(&ClientConfig::from_env())?;
            for agent in client.list_agents().await? {
                let processing = if agent.processing_state.is_processing() {
                    " (processing)"
                } else {
                    ""
                };
                println!("{}{}", agent.name, processing);
            }
        }
        Commands::Show { name } => {
            let client = AgentClient::with_config(&ClientConfig::from_env())?;
            let session = EditSession::load(AuthContext::read_only(), &client, &name).await?;
            print_session(&session);
        }
        Commands::Delete { name } => {
            let client = AgentClient::with_config(&ClientConfig::from_env())?;
            client.delete_agent(&name).await?;
            println!("Deleted agent {}", name);
        }
        Commands::Ready { name } => {
            let client = AgentClient::with_config(&ClientConfig::from_env())?;
            let agent = client.mark_processing_complete(&name).await?;
            println!("Agent {} is ready", agent.name);
        }
        Commands::Edit(args) => edit(args).await?,
    }

    Ok(())
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    tracing::info!("Starting agent store on port {}", config.port);

    let db = db::Database::open(config.database_path())?;
    db.migrate()?;
    let attachments = db::AttachmentDir::new(config.attachments_dir());

    let app = api::create_router_with_config(
        api::AppState::new(db, attachments),
        config.security.clone(),
    );

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!(
        "Agent store listening on http://127.0.0.1:{}/api/v1",
        config.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn edit(args: EditArgs) -> anyhow::Result<()> {
    let client = AgentClient::with_config(&ClientConfig::from_env())?;
    let mut session = match &args.agent {
        Some(name) => EditSession::load(AuthContext::admin(), &client, name).await?,
        None => EditSession::new(AuthContext::admin()),
    };

    let dry_run = args.dry_run;
    let steps = edit_steps(&session, args)?;
    session.run_steps(steps)?;
    print_session(&session);

    if !session.is_dirty() {
        println!("No changes");
        return Ok(());
    }

    let changed: Vec<&str> = session
        .changed_fields()
        .iter()
        .map(|field| field.label())
        .collect();
    println!("Pending: {}", changed.join(", "));
    if dry_run {
        return Ok(());
    }

    let agent = session.commit(&client).await?;
    println!("Saved agent {}", agent.name);
    Ok(())
}

/// Turn the edit flags into one step per field, in wizard order.
fn edit_steps(
    session: &EditSession,
    args: EditArgs,
) -> anyhow::Result<Vec<(FieldKey, StepValue)>> {
    let mut values: Vec<(FieldKey, StepValue)> = Vec::new();

    if let Some(name) = args.name {
        values.push((FieldKey::Name, StepValue::text(name)));
    }
    if let Some(instructions) = args.instructions {
        values.push((FieldKey::Instructions, StepValue::text(instructions)));
    }
    if let Some(welcome) = args.welcome_message {
        values.push((FieldKey::WelcomeMessage, StepValue::text(welcome)));
    }
    if !args.prompts.is_empty() {
        values.push((FieldKey::SuggestedPrompts, StepValue::prompts(args.prompts)));
    }
    if !args.attach.is_empty() || !args.detach.is_empty() {
        let staged = args
            .attach
            .iter()
            .map(|path| {
                Attachment::from_path(path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        values.push((
            FieldKey::Files,
            StepValue::files(staged, args.detach.join(", ")),
        ));
    }

    if session.has_identity() && values.iter().any(|(field, _)| *field == FieldKey::Name) {
        bail!("The name cannot be changed once the agent exists");
    }
    values.sort_by_key(|(field, _)| {
        session
            .fields()
            .iter()
            .position(|f| f == field)
            .unwrap_or(usize::MAX)
    });
    Ok(values)
}

fn print_session(session: &EditSession) {
    for field in [
        FieldKey::Name,
        FieldKey::Instructions,
        FieldKey::WelcomeMessage,
        FieldKey::SuggestedPrompts,
    ] {
        let view = session.field_view(field, PLACEHOLDER);
        println!(
            "{:<18} {} [{}]",
            format!("{}:", field.label()),
            view.text,
            view.style.as_str()
        );
    }

    let entries = session.attachment_entries();
    if entries.is_empty() {
        println!("{:<18} {}", format!("{}:", FieldKey::Files.label()), PLACEHOLDER);
    } else {
        println!("{}:", FieldKey::Files.label());
        for entry in entries {
            println!("  {}. {} [{}]", entry.number, entry.name, entry.style.as_str());
        }
    }

    if session.snapshot().is_processing() {
        println!("Attachments are still being processed; editing is locked");
    }
}

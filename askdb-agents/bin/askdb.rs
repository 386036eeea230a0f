use askdb_agents::config::{Provider, Settings};
use askdb_agents::factory::create_sql_agent;
use askdb_agents::logging::init_logging;
use askdb_agents::{AgentEvent, SqlAgent};
use clap::Parser;
use futures_util::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(author, version, about = "Ask questions about a SQLite database in plain language", long_about = None)]
struct Args {
    /// Path to the SQLite database to query
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Question to answer; starts an interactive session when omitted
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM provider (openai or ollama)
    #[arg(long)]
    provider: Option<Provider>,

    /// Model ID to request
    #[arg(long)]
    model: Option<String>,

    /// Provider endpoint, e.g. https://api.groq.com/openai/v1
    #[arg(long)]
    base_url: Option<String>,

    /// Completion rounds before giving up
    #[arg(long)]
    max_steps: Option<usize>,

    /// Rows shown to the model when a query returns more
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(provider) = self.provider {
            settings.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            settings.llm.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            settings.llm.base_url = Some(base_url.clone());
        }
        if let Some(max_steps) = self.max_steps {
            settings.agent.max_steps = max_steps;
        }
        if let Some(preview_rows) = self.preview_rows {
            settings.agent.preview_rows = preview_rows;
        }
    }
}

fn render(event: &AgentEvent) -> String {
    match event {
        AgentEvent::Thought(_) | AgentEvent::Debug(_) => format!("{DIM}{event}{RESET}"),
        AgentEvent::ExecutingSql(_) => format!("{CYAN}{event}{RESET}"),
        AgentEvent::SqlError(_) | AgentEvent::Error(_) => format!("{RED}{event}{RESET}"),
        AgentEvent::FinalAnswer(_) => format!("{BOLD}{event}{RESET}"),
        AgentEvent::SqlResult { .. } => event.to_string(),
    }
}

async fn answer(agent: &SqlAgent, question: &str) {
    let mut events = Box::pin(agent.run(question));
    while let Some(event) = events.next().await {
        println!("{}", render(&event));
        if event.is_terminal() {
            break;
        }
    }
}

async fn repl(agent: &SqlAgent) -> anyhow::Result<()> {
    if agent.schema_context().await.is_empty() {
        anyhow::bail!(
            "Could not read a schema from {}",
            agent.db_path().display()
        );
    }

    println!(
        "Connected to {}. Type 'exit' or 'quit' to leave.",
        agent.db_path().display()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        answer(agent, question).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);

    let db_path = args
        .db_path
        .clone()
        .or_else(|| settings.database.path.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No database given. Pass --db-path or set database.path in the config file")
        })?;

    tracing::debug!(
        provider = ?settings.llm.provider,
        model = %settings.llm.model,
        db = %db_path.display(),
        "settings resolved"
    );

    let agent = create_sql_agent(&settings, db_path)?;

    match &args.prompt {
        Some(prompt) => answer(&agent, prompt).await,
        None => repl(&agent).await?,
    }

    Ok(())
}

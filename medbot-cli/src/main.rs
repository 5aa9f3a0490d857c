//! medbot-cli: terminal client for the MedBot HTTP API
//!
//! The interactive `chat` shell owns the conversation history; the server is
//! stateless and only sees one question at a time.
//!
//! # Subcommands
//! ```text
//! chat                               interactive shell (default)
//! ask <query> [--mode m] [--json]    one question
//! classify <query>                   show the detected intent
//! lookup <kind> <name>               first local record by name
//! topics                             loaded corpus files
//! status                             server health
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use medbot_core::protocol::AskMode;
use medbot_core::{Conversation, Role};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8767";
const ASK_TIMEOUT: Duration = Duration::from_secs(120);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

const DISCLAIMER: &str = "⚠️  Educational information only, not medical advice. \
For emergencies call your local emergency number immediately.";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "medbot-cli", version, about = "MedBot medical information assistant")]
struct Cli {
    /// MedBot HTTP server URL (overrides MEDBOT_HTTP_URL env var)
    #[arg(long, env = "MEDBOT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat shell
    Chat,

    /// Ask a single question
    Ask {
        query: String,

        #[arg(short, long, value_enum, default_value_t = ModeArg::Smart)]
        mode: ModeArg,

        /// Print the raw JSON reply
        #[arg(long)]
        json: bool,
    },

    /// Show which intent a query is routed to
    Classify { query: String },

    /// Find a local record by kind (condition, drug, symptom, solution) and name
    Lookup { kind: String, name: String },

    /// List the loaded corpus files
    Topics,

    /// Show MedBot server status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Smart,
    Medication,
    Condition,
}

impl From<ModeArg> for AskMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Smart => AskMode::Smart,
            ModeArg::Medication => AskMode::Medication,
            ModeArg::Condition => AskMode::Condition,
        }
    }
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MatchView {
    pub name: String,
    pub kind: String,
    pub source: String,
    pub score: f64,
}

/// Body of a successful POST /ask
#[derive(Debug, Deserialize)]
pub struct ReplyView {
    pub text: String,
    pub intent: String,
    pub source: String,
    #[serde(default)]
    pub matches: Vec<MatchView>,
    pub took_ms: Option<u64>,
}

// ============================================================================
// HTTP Client
// ============================================================================

struct ApiClient {
    client: reqwest::blocking::Client,
    base: String,
}

impl ApiClient {
    fn new(server: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: server.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, route: &str) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}{}", self.base, route);
        tracing::debug!(%url, "GET");
        let resp = self.client.get(&url).send()?;
        Self::decode(resp, &url)
    }

    fn post(&self, route: &str, body: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}{}", self.base, route);
        tracing::debug!(%url, "POST");
        let resp = self.client.post(&url).json(body).send()?;
        Self::decode(resp, &url)
    }

    /// Parse the JSON body; non-2xx statuses become errors except 404 with a body.
    fn decode(resp: reqwest::blocking::Response, url: &str) -> anyhow::Result<serde_json::Value> {
        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();
        if status.is_success() || (status == reqwest::StatusCode::NOT_FOUND && body.is_object()) {
            return Ok(body);
        }
        let detail = body["error"].as_str().unwrap_or("no detail");
        anyhow::bail!("{} returned {}: {}", url, status, detail)
    }

    fn ask(&self, query: &str, mode: AskMode) -> anyhow::Result<ReplyView> {
        let body = self.post("/ask", &serde_json::json!({ "query": query, "mode": mode }))?;
        Ok(serde_json::from_value(body)?)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Reply text followed by a compact list of the local matches.
pub fn render_reply(reply: &ReplyView) -> String {
    let mut out = reply.text.clone();
    if !reply.matches.is_empty() {
        out.push_str("\n\nLocal matches:");
        for m in &reply.matches {
            out.push_str(&format!(
                "\n  {:>5.1}%  {} ({}/{})",
                m.score * 100.0,
                m.name,
                m.kind,
                m.source
            ));
        }
    }
    out
}

pub fn format_history(conversation: &Conversation) -> String {
    if conversation.is_empty() {
        return "No messages yet.".to_string();
    }
    conversation
        .turns()
        .iter()
        .map(|turn| {
            let who = match turn.role {
                Role::User => "You",
                Role::Assistant => "MedBot",
            };
            format!("[{}] {}: {}", turn.at.format("%H:%M:%S"), who, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Chat shell
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    Medication(String),
    Condition(String),
    History,
    Clear,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ShellCommand::Ask(line.to_string());
    };

    let (command, arg) = match rest.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (rest, ""),
    };

    match (command, arg) {
        ("med" | "medication", name) if !name.is_empty() => ShellCommand::Medication(name.to_string()),
        ("cond" | "condition", name) if !name.is_empty() => ShellCommand::Condition(name.to_string()),
        ("history", _) => ShellCommand::History,
        ("clear", _) => ShellCommand::Clear,
        ("help" | "?", _) => ShellCommand::Help,
        ("quit" | "exit" | "q", _) => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line.to_string()),
    }
}

const SHELL_HELP: &str = "\
Type a question, or:
  /med <name>    medication overview
  /cond <name>   condition overview
  /history       show this conversation
  /clear         clear the conversation
  /quit          leave";

fn run_chat(api: &ApiClient) -> anyhow::Result<()> {
    println!("🏥 MedBot: medical information assistant");
    println!("{}\n", DISCLAIMER);
    println!("{}\n", SHELL_HELP);

    let mut conversation = Conversation::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let (question, mode) = match parse_line(&line) {
            ShellCommand::Empty => continue,
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                println!("{}", SHELL_HELP);
                continue;
            }
            ShellCommand::History => {
                println!("{}", format_history(&conversation));
                continue;
            }
            ShellCommand::Clear => {
                conversation.clear();
                println!("Conversation cleared.");
                continue;
            }
            ShellCommand::Unknown(cmd) => {
                println!("Unknown command: {} (try /help)", cmd);
                continue;
            }
            ShellCommand::Ask(q) => (q, AskMode::Smart),
            ShellCommand::Medication(name) => (name, AskMode::Medication),
            ShellCommand::Condition(name) => (name, AskMode::Condition),
        };

        conversation.push_user(question.clone());
        match api.ask(&question, mode) {
            Ok(reply) => {
                println!("\n{}\n", render_reply(&reply));
                conversation.push_assistant(reply.text);
            }
            Err(e) => {
                let text = format!("⚠️ Could not reach MedBot: {}", e);
                println!("\n{}\n", text);
                conversation.push_assistant(text);
            }
        }
    }

    println!("Goodbye. Take care.");
    Ok(())
}

// ============================================================================
// One-shot commands
// ============================================================================

fn do_ask(api: &ApiClient, query: &str, mode: AskMode, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let body = api.post("/ask", &serde_json::json!({ "query": query, "mode": mode }))?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    let reply = api.ask(query, mode)?;
    println!("{}", render_reply(&reply));
    if let Some(ms) = reply.took_ms {
        eprintln!("({} intent, {} source, {} ms)", reply.intent, reply.source, ms);
    }
    Ok(())
}

fn do_classify(api: &ApiClient, query: &str) -> anyhow::Result<()> {
    let body = api.post("/classify", &serde_json::json!({ "query": query }))?;
    println!("{}", body["intent"].as_str().unwrap_or("unknown"));
    Ok(())
}

fn do_lookup(api: &ApiClient, kind: &str, name: &str) -> anyhow::Result<()> {
    let body = api.post("/lookup", &serde_json::json!({ "kind": kind, "name": name }))?;
    if body["found"] == true {
        println!("{}", body["text"].as_str().unwrap_or_default());
        if let Some(source) = body["record"]["source"].as_str() {
            println!("(from {})", source);
        }
    } else {
        println!("No {} named '{}' in the local database.", kind, name);
    }
    Ok(())
}

fn do_topics(api: &ApiClient) -> anyhow::Result<()> {
    let body = api.get("/topics")?;
    let topics = body["topics"].as_array().cloned().unwrap_or_default();
    if topics.is_empty() {
        println!("No corpus files loaded.");
    }
    for topic in topics {
        println!("- {}", topic.as_str().unwrap_or_default());
    }
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let api = ApiClient::new(server, STATUS_TIMEOUT)?;
    let body = match api.get("/health") {
        Ok(b) => b,
        Err(e) => {
            eprintln!("medbot-cli: cannot reach {}: {}", server, e);
            std::process::exit(1);
        }
    };

    println!("MedBot server: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
    println!("Records:       {}", body["records"]);
    println!("Indexed:       {} (dims {})", body["indexed"], body["dimensions"]);
    println!(
        "Embeddings:    {} / {}",
        body["embedding_backend"].as_str().unwrap_or("?"),
        body["embedding_model"].as_str().unwrap_or("?")
    );
    println!("Generation:    {}", body["generation_backend"].as_str().unwrap_or("?"));
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn run(server: &str, command: Commands) -> anyhow::Result<()> {
    if let Commands::Status = command {
        return do_status(server);
    }

    let api = ApiClient::new(server, ASK_TIMEOUT)?;
    match command {
        Commands::Chat => run_chat(&api),
        Commands::Ask { query, mode, json } => do_ask(&api, &query, mode.into(), json),
        Commands::Classify { query } => do_classify(&api, &query),
        Commands::Lookup { kind, name } => do_lookup(&api, &kind, &name),
        Commands::Topics => do_topics(&api),
        Commands::Status => do_status(server),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = run(&server, cli.command.unwrap_or(Commands::Chat));

    if let Err(e) = result {
        eprintln!("medbot-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

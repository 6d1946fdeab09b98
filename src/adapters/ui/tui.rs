//! Implements InputPort. Inquire-based chat loop with a password gate and slash commands.

use crate::domain::{DomainError, Role};
use crate::ports::{BlobStorePort, FunctionPort, InputPort};
use crate::usecases::{ChatService, KnowledgeBaseAdminService};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Password, Text};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Wrong passwords allowed before the session is refused.
const MAX_PASSWORD_ATTEMPTS: u32 = 3;

const HELP: &str = "\
Commands:
  /help                 show this help
  /history              print the conversation so far
  /reset                start a new conversation
  /files [prefix]       list documents in the configured bucket
  /invoke <json>        call the processing function with a JSON payload
  /kb status            knowledge base status
  /kb list              list knowledge bases
  /kb find <name>       find a knowledge base by name
  /kb sync <source-id>  start an ingestion job for a data source
  /quit                 exit
Anything else is sent to the assistant. Ctrl-C while waiting cancels the request.";

/// Apply the prompt theme for all subsequent inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_answered_prompt_prefix(Styled::new("✓").with_fg(Color::LightBlue));
    inquire::set_global_render_config(config);
}

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Help,
    History,
    Reset,
    Files(Option<String>),
    Invoke(String),
    KbStatus,
    KbList,
    KbFind(String),
    KbSync(String),
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Chat(line.to_string());
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match head {
        "/help" | "/?" => Command::Help,
        "/history" => Command::History,
        "/reset" | "/new" => Command::Reset,
        "/files" => Command::Files(arg),
        "/invoke" => match arg {
            Some(json) => Command::Invoke(json),
            None => Command::Unknown("/invoke needs a JSON payload".into()),
        },
        "/kb" => {
            let (sub, sub_arg) = match rest.split_once(char::is_whitespace) {
                Some((s, a)) => (s, a.trim()),
                None => (rest, ""),
            };
            match (sub, sub_arg) {
                ("status", _) => Command::KbStatus,
                ("list", _) => Command::KbList,
                ("find", name) if !name.is_empty() => Command::KbFind(name.to_string()),
                ("sync", id) if !id.is_empty() => Command::KbSync(id.to_string()),
                _ => Command::Unknown(format!("unknown /kb command: {}", rest)),
            }
        }
        "/quit" | "/exit" => Command::Quit,
        other => Command::Unknown(format!("unknown command: {}", other)),
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    chat: Arc<ChatService>,
    admin: Arc<KnowledgeBaseAdminService>,
    blob_store: Arc<dyn BlobStorePort>,
    function: Option<Arc<dyn FunctionPort>>,
    knowledge_base_id: Option<String>,
    bucket: Option<String>,
    default_prefix: String,
    password: Option<String>,
}

impl TuiInputPort {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chat: Arc<ChatService>,
        admin: Arc<KnowledgeBaseAdminService>,
        blob_store: Arc<dyn BlobStorePort>,
        function: Option<Arc<dyn FunctionPort>>,
        knowledge_base_id: Option<String>,
        bucket: Option<String>,
        default_prefix: String,
        password: Option<String>,
    ) -> Self {
        Self {
            chat,
            admin,
            blob_store,
            function,
            knowledge_base_id,
            bucket,
            default_prefix,
            password: password.filter(|p| !p.is_empty()),
        }
    }

    /// Returns Ok(true) when access is granted.
    fn password_gate(&self) -> Result<bool, DomainError> {
        let Some(expected) = &self.password else {
            return Ok(true);
        };
        for attempt in 1..=MAX_PASSWORD_ATTEMPTS {
            let entered = match Password::new("Password:").without_confirmation().prompt() {
                Ok(p) => p,
                Err(e) if is_interrupt(&e) => return Ok(false),
                Err(e) => return Err(DomainError::Ui(e.to_string())),
            };
            if entered == *expected {
                return Ok(true);
            }
            warn!(attempt, "wrong password");
            println!("Incorrect password.");
        }
        Ok(false)
    }

    async fn ask(&self, prompt: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });

        let result = self.chat.send_with_cancel(prompt, &cancel).await;
        ctrl_c.abort();
        spinner.finish_and_clear();

        match result {
            Ok(reply) => println!("\nassistant › {}\n", reply),
            Err(e) => println!("\n[error] {}\n", e),
        }
    }

    async fn handle(&self, command: Command) -> bool {
        match command {
            Command::Empty => {}
            Command::Quit => return false,
            Command::Help => println!("{}", HELP),
            Command::Chat(prompt) => self.ask(&prompt).await,
            Command::History => {
                for m in self.chat.history().await {
                    let who = match m.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("{} › {}", who, m.content);
                }
            }
            Command::Reset => {
                self.chat.reset().await;
                println!("Conversation cleared.");
            }
            Command::Files(prefix) => {
                let Some(bucket) = &self.bucket else {
                    println!("No bucket configured (KB_CHAT_S3_BUCKET).");
                    return true;
                };
                let prefix = prefix.unwrap_or_else(|| self.default_prefix.clone());
                let names = self.blob_store.list_object_names(bucket, &prefix).await;
                if names.is_empty() {
                    println!("No documents found.");
                }
                for name in names {
                    println!("  {}", name);
                }
            }
            Command::Invoke(raw) => {
                let Some(function) = &self.function else {
                    println!("No function configured (KB_CHAT_FUNCTION_URL).");
                    return true;
                };
                let payload: serde_json::Value = match serde_json::from_str(&raw) {
                    Ok(v) => v,
                    Err(e) => {
                        println!("Invalid JSON: {}", e);
                        return true;
                    }
                };
                match function.invoke(&payload).await {
                    Some(v) => println!(
                        "{}",
                        serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())
                    ),
                    None => println!("Function invocation failed."),
                }
            }
            Command::KbStatus => {
                let Some(kb_id) = &self.knowledge_base_id else {
                    println!("No knowledge base configured.");
                    return true;
                };
                match self.admin.status(kb_id).await {
                    Some(kb) => println!("{} ({}): {}", kb.name, kb.id, kb.status),
                    None => println!("Could not read knowledge base status."),
                }
            }
            Command::KbList => match self.admin.list().await {
                Ok(kbs) => {
                    for kb in kbs {
                        println!("  {}  {}  [{}]", kb.id, kb.name, kb.status);
                    }
                }
                Err(e) => println!("[error] {}", e),
            },
            Command::KbFind(name) => match self.admin.find_by_name(&name).await {
                Ok(Some(info)) => println!(
                    "{}",
                    serde_json::to_string_pretty(&info).unwrap_or_else(|_| info.id.clone())
                ),
                Ok(None) => println!("Knowledge base '{}' not found.", name),
                Err(e) => println!("[error] {}", e),
            },
            Command::KbSync(data_source_id) => {
                let Some(kb_id) = &self.knowledge_base_id else {
                    println!("No knowledge base configured.");
                    return true;
                };
                match self.admin.sync(kb_id, &data_source_id).await {
                    Some(job) => println!("Sync started. Job ID: {}", job.id),
                    None => println!("Knowledge base sync failed."),
                }
            }
            Command::Unknown(msg) => println!("{} (try /help)", msg),
        }
        true
    }
}

fn is_interrupt(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        if !self.password_gate()? {
            println!("Access denied.");
            return Ok(());
        }

        loop {
            let line = match Text::new("you").prompt() {
                Ok(l) => l,
                Err(e) if is_interrupt(&e) => break,
                Err(e) => return Err(DomainError::Ui(e.to_string())),
            };
            if !self.handle(parse_command(&line)).await {
                break;
            }
        }
        Ok(())
    }
}

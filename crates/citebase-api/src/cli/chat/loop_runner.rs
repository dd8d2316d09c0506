//! Main chat loop orchestration.
//!
//! Runs the readline loop against the shared `ChatService`, plus two
//! background tasks: a one-second ticker that forwards wall-clock time to the
//! rate window, and a notifier that prints budget events as they happen.
//! Both stop when the session's `CancellationToken` is cancelled.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use console::style;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info_span, warn};

use citebase_observe::attrs;
use citebase_types::error::SubmitError;
use citebase_types::event::BudgetEvent;

use crate::cli::display::{
    format_tokens, render_breakdown, render_context_warning, render_rate_indicator,
    render_rate_limited, render_reply,
};
use crate::state::{AppState, ConcreteChatService};

use super::banner::welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

/// How often the ticker forwards the clock to the rate window.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Longest message excerpt shown by `/history`, in characters.
const HISTORY_PREVIEW_CHARS: usize = 100;

/// Result of a send attempt, rendered for the terminal.
#[derive(Debug)]
pub struct SendOutcome {
    pub output: String,
    /// The send was refused and the draft should be offered again.
    pub draft_kept: bool,
}

/// Result of a slash command.
#[derive(Debug)]
pub enum CommandOutcome {
    Print(String),
    Exit,
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState, knowledge_base: bool, history: u64) -> anyhow::Result<()> {
    let (banner, events) = {
        let mut service = state.service.lock().await;
        service.set_knowledge_base(knowledge_base);
        let events = service.events().subscribe();
        service.start_conversation_with_history(history, state.clock.now());
        let rate = &state.config.rate_limit;
        (
            welcome_banner(service.active_model(), knowledge_base, rate.max_requests, rate.window_secs),
            events,
        )
    };

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, mut out) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    writeln!(out, "{banner}")?;

    let cancel = CancellationToken::new();
    let ticker = spawn_ticker(state.clone(), cancel.clone());
    let notifier = spawn_notifier(events, out.clone(), cancel.clone());

    let mut pending_draft: Option<String> = None;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                writeln!(out, "\n  {}", style("Session ended.").dim())?;
                break;
            }
            InputEvent::Interrupted => {
                writeln!(out, "\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim())?;
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => match pending_draft.take() {
                Some(draft) => draft,
                None => continue,
            },
            InputEvent::Message(text) => text,
        };

        let now = state.clock.now();
        let mut service = state.service.lock().await;

        if let Some(cmd) = commands::parse(&text) {
            match run_command(&mut service, cmd, now, &state.data_dir) {
                CommandOutcome::Print(output) => writeln!(out, "{output}")?,
                CommandOutcome::Exit => {
                    writeln!(out, "\n  {}", style("Session ended.").dim())?;
                    break;
                }
            }
            continue;
        }

        let outcome = submit(&mut service, &text, now);
        drop(service);
        writeln!(out, "\n{}\n", outcome.output)?;
        pending_draft = outcome.draft_kept.then_some(text);
    }

    cancel.cancel();
    let _ = ticker.await;
    let _ = notifier.await;
    chat_input.close();
    Ok(())
}

/// Forward wall-clock time to the rate window once per second.
fn spawn_ticker(state: AppState, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let now = state.clock.now();
                    state.service.lock().await.tick(now);
                }
            }
        }
        debug!("Rate window ticker stopped");
    })
}

/// Print budget events that happen outside a send, such as the rate window
/// reopening while the user is typing.
fn spawn_notifier<W>(
    mut events: broadcast::Receiver<BudgetEvent>,
    mut out: W,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    W: Write + Send + 'static,
{
    tokio::spawn(async move {
        let mut notifier = Notifier::default();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Some(line) = notifier.observe(&event) {
                            let _ = writeln!(out, "{line}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Budget event notifier lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

/// Decides which events deserve a line of their own.
///
/// Window resets happen every minute; only the one that lifts a block is
/// worth announcing.
#[derive(Debug, Default)]
pub struct Notifier {
    blocked: bool,
}

impl Notifier {
    pub fn observe(&mut self, event: &BudgetEvent) -> Option<String> {
        match event {
            BudgetEvent::RateLimited { .. } => {
                self.blocked = true;
                None
            }
            BudgetEvent::RequestAccepted { current, max } if current >= max => {
                self.blocked = true;
                None
            }
            BudgetEvent::RateWindowReset { .. } if self.blocked => {
                self.blocked = false;
                Some(format!(
                    "\n  {} {}",
                    style("*").green().bold(),
                    style("Rate limit lifted. You can send messages again.").green()
                ))
            }
            _ => None,
        }
    }
}

/// Send `text` through the gate and render the outcome.
pub fn submit(service: &mut ConcreteChatService, text: &str, now: DateTime<Utc>) -> SendOutcome {
    let span = info_span!(
        "submit",
        { attrs::GEN_AI_OPERATION_NAME } = attrs::OP_SUBMIT,
        { attrs::GEN_AI_REQUEST_MODEL } = %service.active_model().name,
        { attrs::KNOWLEDGE_BASE_ENABLED } = service.knowledge_base_enabled(),
        { attrs::CONVERSATION_ID } = field::Empty,
        { attrs::GEN_AI_USAGE_INPUT_TOKENS } = field::Empty,
        { attrs::CONTEXT_STATUS } = field::Empty,
        { attrs::RATE_CURRENT_REQUESTS } = field::Empty,
        { attrs::RATE_MAX_REQUESTS } = field::Empty,
    );
    let _entered = span.enter();

    let result = service.send(text, now);

    if let Some(conversation) = service.active_conversation() {
        span.record(attrs::CONVERSATION_ID, field::display(conversation.id));
    }
    let window = service.rate_limiter().budget();
    span.record(attrs::RATE_CURRENT_REQUESTS, window.current_requests);
    span.record(attrs::RATE_MAX_REQUESTS, window.max_requests);

    match result {
        Ok(submission) => {
            span.record(attrs::GEN_AI_USAGE_INPUT_TOKENS, submission.breakdown.total);
            span.record(attrs::CONTEXT_STATUS, field::display(submission.status));

            let mut output = render_reply(&submission.reply);
            let indicator = service.rate_view(now);
            if indicator.visible {
                output.push_str(&format!("\n\n{}", render_rate_indicator(&indicator)));
            }
            if let Some(warning) = service.context_view() {
                output.push_str(&format!("\n\n{}", render_context_warning(&warning)));
            }
            SendOutcome {
                output,
                draft_kept: false,
            }
        }
        Err(SubmitError::RateLimited { retry_after }) => {
            let indicator = service.rate_view(now);
            SendOutcome {
                output: format!(
                    "{}\n{}",
                    render_rate_limited(retry_after),
                    render_rate_indicator(&indicator)
                ),
                draft_kept: true,
            }
        }
        Err(SubmitError::ContextOverflow { projected, max }) => SendOutcome {
            output: format!(
                "  {} {}\n  {}",
                style("!").red().bold(),
                style(format!(
                    "This exchange would need {} of {} tokens.",
                    format_tokens(projected),
                    format_tokens(u64::from(max))
                ))
                .red(),
                style("Start a /new conversation or switch to a larger /model. Your message was kept.").dim()
            ),
            draft_kept: true,
        },
    }
}

/// Execute a slash command against the service.
pub fn run_command(
    service: &mut ConcreteChatService,
    cmd: ChatCommand,
    now: DateTime<Utc>,
    data_dir: &Path,
) -> CommandOutcome {
    let output = match cmd {
        ChatCommand::Exit => return CommandOutcome::Exit,
        ChatCommand::Help => commands::help_text(),
        ChatCommand::New => {
            service.start_conversation(now);
            format!(
                "\n  {} {}\n",
                style("*").cyan().bold(),
                "Started a new conversation. The rate limit window carries over."
            )
        }
        ChatCommand::Model(name) => match service.switch_model(&name) {
            Ok(model) => {
                let mut output = format!(
                    "\n  {} Switched to {} ({}K context)",
                    style("*").cyan().bold(),
                    style(&model.name).cyan(),
                    model.context_k()
                );
                if let Some(warning) = service.context_view() {
                    output.push_str(&format!("\n{}", render_context_warning(&warning)));
                }
                output.push('\n');
                output
            }
            Err(err) => format!(
                "\n  {} {err}. Type /models to list available models.\n",
                style("?").yellow().bold()
            ),
        },
        ChatCommand::Models => models_text(service),
        ChatCommand::KnowledgeBase(enabled) => {
            service.set_knowledge_base(enabled);
            let label = if enabled { "enabled" } else { "disabled" };
            format!("\n  {} Knowledge base {label}.\n", style("*").cyan().bold())
        }
        ChatCommand::Preview(text) => match service.preview(&text) {
            Some(preview) => format!("\n{}\n", render_breakdown(&preview)),
            None => format!(
                "\n  {}\n",
                style("Nothing to estimate: empty message and knowledge base off.").dim()
            ),
        },
        ChatCommand::Status => status_text(service, now, data_dir),
        ChatCommand::Reset => {
            service.reset_rate_limit(now);
            format!("\n  {} Rate limit window reset.\n", style("*").cyan().bold())
        }
        ChatCommand::History => history_text(service),
        ChatCommand::Unknown(cmd_name) => format!(
            "\n  {} Unknown command: {}. Type /help for available commands.\n",
            style("?").yellow().bold(),
            style(cmd_name).dim()
        ),
    };
    CommandOutcome::Print(output)
}

fn models_text(service: &ConcreteChatService) -> String {
    let active = &service.active_model().name;
    let mut out = String::from("\n");
    for model in service.catalog().iter() {
        let marker = if &model.name == active {
            format!("{}", style("*").green().bold())
        } else {
            " ".to_string()
        };
        out.push_str(&format!(
            "  {marker} {:<18} {:>8}  {}\n",
            model.name,
            format!("{}K", model.context_k()),
            style(&model.description).dim()
        ));
    }
    out
}

fn status_text(service: &ConcreteChatService, now: DateTime<Utc>, data_dir: &Path) -> String {
    let model = service.active_model();
    let kb = if service.knowledge_base_enabled() { "on" } else { "off" };
    let mut out = String::from("\n");
    out.push_str(&format!(
        "  {}           {} ({}K)\n",
        style("Model:").bold(),
        model.name,
        model.context_k()
    ));
    out.push_str(&format!("  {}  {kb}\n", style("Knowledge base:").bold()));

    if let Some(conversation) = service.active_conversation() {
        let budget = &conversation.budget;
        out.push_str(&format!(
            "  {}    {} ({} messages)\n",
            style("Conversation:").bold(),
            conversation.title,
            conversation.message_count()
        ));
        out.push_str(&format!(
            "  {}         {} / {} tokens ({:.1}%)\n",
            style("Context:").bold(),
            format_tokens(budget.current_tokens),
            format_tokens(u64::from(budget.model_max_tokens)),
            citebase_core::budget::context::usage_percent(budget),
        ));
    }

    out.push_str(&format!("\n{}\n", render_rate_indicator(&service.rate_view(now))));
    if let Some(warning) = service.context_view() {
        out.push_str(&format!("\n{}\n", render_context_warning(&warning)));
    }
    out.push_str(&format!(
        "\n  {}\n",
        style(format!("Config: {}", data_dir.join("config.toml").display())).dim()
    ));
    out
}

fn history_text(service: &ConcreteChatService) -> String {
    let Some(conversation) = service.active_conversation() else {
        return format!("\n  {}\n", style("No conversation yet.").dim());
    };
    if conversation.messages.is_empty() {
        return format!("\n  {}\n", style("No messages yet.").dim());
    }

    let mut out = String::from("\n");
    for message in &conversation.messages {
        let label = if message.is_user {
            format!("{}", style("You").green().bold())
        } else {
            format!("{}", style("Assistant").cyan().bold())
        };
        let excerpt = if message.content.chars().count() > HISTORY_PREVIEW_CHARS {
            let head: String = message.content.chars().take(HISTORY_PREVIEW_CHARS - 3).collect();
            format!("{head}...")
        } else {
            message.content.clone()
        };
        out.push_str(&format!("  {label} {excerpt}\n"));
    }
    out
}

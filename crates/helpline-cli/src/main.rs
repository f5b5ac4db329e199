use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use helpline_application::{ChatController, ControllerConfig};
use helpline_core::channel::RealtimeChannel;
use helpline_core::protocol::{InboundBot, ServerEvent};
use helpline_core::session::{ChatSession, IntakeRecord, MessageRole, SupportCategory};
use helpline_infrastructure::{AppConfig, JsonDraftRepository};
use helpline_transport::{ChannelConfig, SocketChannel};

#[derive(Parser)]
#[command(name = "helpline")]
#[command(about = "Helpline terminal client - customer support chat", long_about = None)]
struct Cli {
    /// WebSocket endpoint of the support backend
    #[arg(long)]
    url: Option<String>,

    /// Path to an alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Retract the "thinking" indicator after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

/// What the latest assistant message left on the table for the next input
/// line to act on.
#[derive(Default)]
struct ReplyContext {
    suggestions: Vec<String>,
    resolution_pending: bool,
}

type SharedReplyContext = Arc<Mutex<ReplyContext>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(url) = cli.url {
        config.socket_url = url;
    }
    if let Some(ms) = cli.timeout_ms {
        config.placeholder_timeout_ms = Some(ms);
    }

    let drafts = Arc::new(match &config.draft_path {
        Some(path) => JsonDraftRepository::new(path.clone()),
        None => JsonDraftRepository::from_default_path()?,
    });

    let channel = Arc::new(SocketChannel::new(ChannelConfig {
        url: config.socket_url.clone(),
        max_reconnect_attempts: config.reconnect_attempts,
        reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        reconnect_delay_max: Duration::from_millis(config.reconnect_delay_max_ms),
        connect_timeout: Duration::from_millis(config.connect_timeout_ms),
    }));
    channel
        .connect()
        .await
        .with_context(|| format!("Cannot reach support backend at {}", config.socket_url))?;

    let controller = Arc::new(
        ChatController::new(
            channel.clone(),
            drafts,
            ControllerConfig {
                placeholder_timeout: config.placeholder_timeout(),
            },
        )
        .await,
    );

    // Pump inbound events into the controller.
    {
        let controller = controller.clone();
        tokio::spawn(async move { controller.run().await });
    }

    // Print assistant replies as they arrive.
    let reply_context: SharedReplyContext = Arc::new(Mutex::new(ReplyContext::default()));
    {
        let mut inbound = channel.subscribe();
        let reply_context = reply_context.clone();
        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(ServerEvent::BotMessage(bot)) => render_reply(&bot, &reply_context),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let session = controller.session().await;
    if session.started {
        println!(
            "{}",
            format!("Recovered conversation \"{}\" for {}.", session.intake.subject, session.intake.name).bold()
        );
        render_history(&session);
    } else {
        match intake_flow(&mut lines).await? {
            Some(intake) => controller.start_session(intake).await,
            None => return Ok(()),
        }
        render_history(&controller.session().await);
    }

    chat_loop(&controller, &mut lines, &reply_context).await?;

    channel.disconnect().await.ok();
    Ok(())
}

/// Reads one line, returning `None` on end of input.
async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{label}");
    use std::io::Write;
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

/// Collects the intake record. Loops until the required fields are
/// present, mirroring the web form's refusal to start without them.
async fn intake_flow(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<IntakeRecord>> {
    println!("{}", "Start your support session".bold());
    loop {
        let Some(name) = prompt(lines, "Your name: ").await? else {
            return Ok(None);
        };
        let Some(email) = prompt(lines, "Email (optional): ").await? else {
            return Ok(None);
        };
        let Some(subject) = prompt(lines, "What can we help you with? ").await? else {
            return Ok(None);
        };
        let Some(category) = prompt(lines, "Category [General/Technical/Billing/Account]: ").await?
        else {
            return Ok(None);
        };

        let intake = IntakeRecord {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            subject: subject.trim().to_string(),
            category: SupportCategory::from_str(category.trim()).unwrap_or_default(),
        };
        if intake.is_valid() {
            return Ok(Some(intake));
        }
        println!("{}", "Name and subject are required.".yellow());
    }
}

/// The interactive loop: stdin lines become messages; `y`/`n` answer a
/// pending resolution prompt; a bare number picks a related suggestion;
/// `/end` ends the session.
async fn chat_loop(
    controller: &Arc<ChatController>,
    lines: &mut Lines<BufReader<Stdin>>,
    reply_context: &SharedReplyContext,
) -> Result<()> {
    loop {
        let Some(line) = lines.next_line().await? else {
            if controller.has_unsaved_work().await {
                println!(
                    "{}",
                    "Conversation saved as a draft; it will be restored next time.".yellow()
                );
            }
            return Ok(());
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if line == "/end" {
            let Some(answer) = prompt(
                lines,
                "End this chat session? Your conversation will be discarded. [y/N] ",
            )
            .await?
            else {
                return Ok(());
            };
            if answer.trim().eq_ignore_ascii_case("y") {
                controller.end_session().await;
                println!("{}", "Session ended.".bold());
                return Ok(());
            }
            continue;
        }

        let (resolution_pending, suggestion) = {
            let mut context = reply_context.lock().unwrap_or_else(|e| e.into_inner());
            let pending = context.resolution_pending;
            let suggestion = line
                .parse::<usize>()
                .ok()
                .and_then(|n| context.suggestions.get(n.checked_sub(1)?).cloned());
            if pending && (line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("n")) {
                context.resolution_pending = false;
            }
            (pending, suggestion)
        };

        if resolution_pending && line.eq_ignore_ascii_case("y") {
            controller.confirm_resolution(true).await;
        } else if resolution_pending && line.eq_ignore_ascii_case("n") {
            controller.confirm_resolution(false).await;
        } else if let Some(question) = suggestion {
            println!("{} {}", "you:".blue().bold(), question);
            controller.send_message(&question, true).await;
        } else {
            controller.send_message(&line, false).await;
        }

        if !controller.is_connected() {
            warn!("Support channel is offline; the message will show as pending");
        }
    }
}

fn render_reply(bot: &InboundBot, reply_context: &SharedReplyContext) {
    let stamp = chrono::Local::now().format("%H:%M");
    println!(
        "{} {} {}",
        format!("[{stamp}]").dimmed(),
        "assistant:".green().bold(),
        bot.content
    );
    if !bot.related.is_empty() {
        println!("{}", "Related questions (reply with a number to ask):".dimmed());
        for (i, question) in bot.related.iter().enumerate() {
            println!("  {}. {}", i + 1, question);
        }
    }
    if bot.wants_resolution_prompt() {
        println!(
            "{}",
            "Reply 'y' if this resolved your issue, 'n' if you still need help.".yellow()
        );
    }

    let mut context = reply_context.lock().unwrap_or_else(|e| e.into_inner());
    context.suggestions = bot.related.clone();
    context.resolution_pending = bot.wants_resolution_prompt();
}

fn render_history(session: &ChatSession) {
    for message in &session.messages {
        let label = match message.role {
            MessageRole::User => "you:".blue().bold(),
            MessageRole::Assistant => "assistant:".green().bold(),
        };
        println!("{} {}", label, message.content);
    }
}

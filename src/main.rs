//! folio-chat - lead-capture chatbot client and schedule admin
//!
//! Drives the portfolio site's chatbot from a terminal and manages
//! bookings, schedule blocks and chat sessions through the admin API.

mod admin;
mod api;
mod config;
mod locale;
mod runtime;
mod session;
mod storage;
mod widget;

use admin::AdminPanel;
use api::{AdminClient, BlockWindow, ChatClient, NewBlock, SessionFilter};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use config::Config;
use locale::Locale;
use runtime::{spawn_widget, WidgetEvent, WidgetHandle, WidgetInput};
use std::io::Write;
use std::time::Duration;
use storage::SqliteStorage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use widget::{ConversationState, Message, Role};

#[derive(Parser)]
#[command(name = "folio-chat")]
#[command(about = "Portfolio chatbot client and schedule admin")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the site chatbot
    Chat {
        /// Conversation language (en, es)
        #[arg(short, long)]
        locale: Option<Locale>,
        /// Open the widget by itself after this many seconds
        #[arg(long)]
        auto_open_secs: Option<u64>,
        /// Forget the stored session and widget flags first
        #[arg(long)]
        new_session: bool,
    },
    /// Manage bookings, blocks and chat sessions
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List bookings, optionally cancelling one first
    Bookings {
        #[arg(long)]
        cancel: Option<String>,
        /// Only confirmed bookings that have not ended yet
        #[arg(long)]
        upcoming: bool,
    },
    /// Manage schedule blocks
    Blocks {
        #[command(subcommand)]
        command: BlockCommand,
    },
    /// List chat sessions
    Sessions {
        /// Only sessions that left contact details
        #[arg(long)]
        leads: bool,
        #[arg(long, default_value_t = admin::DEFAULT_SESSION_LIMIT)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List blocks, optionally only those covering an instant
    List {
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Block a one-off range (RFC 3339 timestamps)
    AddSpecific {
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Block a weekly window (day 0 = Sunday, times HH:MM in UTC)
    AddRecurring {
        #[arg(long)]
        day: u8,
        #[arg(long, value_parser = parse_hh_mm)]
        start: (u8, u8),
        #[arg(long, value_parser = parse_hh_mm)]
        end: (u8, u8),
        #[arg(long)]
        reason: Option<String>,
    },
    Delete {
        id: String,
    },
}

fn parse_hh_mm(raw: &str) -> Result<(u8, u8), String> {
    let (hour, minute) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got {raw}"))?;
    let hour = hour.parse().map_err(|_| format!("bad hour in {raw}"))?;
    let minute = minute.parse().map_err(|_| format!("bad minute in {raw}"))?;
    Ok((hour, minute))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so the transcript on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Chat {
            locale,
            auto_open_secs,
            new_session,
        } => {
            if let Some(locale) = locale {
                config.locale = locale;
            }
            if let Some(secs) = auto_open_secs {
                config.auto_open_delay = Some(Duration::from_secs(secs));
            }
            run_chat(&config, new_session).await?;
        }
        Commands::Admin { command } => {
            let client = AdminClient::new(
                &config.base_url,
                config.admin_password()?,
                config.request_timeout,
            )?;
            run_admin(AdminPanel::new(client), command).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Chat
// ============================================================================

async fn run_chat(config: &Config, new_session: bool) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(path = %config.storage_path.display(), "Opening client storage");
    let storage = SqliteStorage::open(&config.storage_path)?;
    if new_session {
        storage::forget_visitor(&storage)?;
    }
    let backend = ChatClient::new(&config.base_url, config.request_timeout)?;
    let (handle, mut events, task) = spawn_widget(config.widget_options(), storage, backend)?;

    println!("Commands: /open /close /toggle /locale <en|es> /option <n> /cancel /quit");
    if config.auto_open_delay.is_none() {
        handle.send(WidgetInput::Open).await?;
    }

    let mut printer = TranscriptPrinter::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(WidgetEvent::StateChanged { state }) => printer.print(&state),
                Ok(WidgetEvent::LocaleChanged { locale }) => println!("[locale: {locale}]"),
                Ok(WidgetEvent::Error { message }) => eprintln!("error: {message}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Transcript printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&handle, &printer, line.trim()).await? {
                    break;
                }
            }
        }
    }

    if let Ok(state) = handle.snapshot().await {
        tracing::info!(
            session_id = ?state.session_id,
            messages = state.messages.len(),
            flow = ?state.flow,
            "Chat ended"
        );
    }
    drop(handle);
    task.await?;
    Ok(())
}

/// Returns `false` when the visitor quits
async fn handle_line(
    handle: &WidgetHandle,
    printer: &TranscriptPrinter,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let input = match line.split_once(' ').unwrap_or((line, "")) {
        ("/quit", _) => return Ok(false),
        ("/open", _) => WidgetInput::Open,
        ("/close", _) => WidgetInput::Close,
        ("/toggle", _) => WidgetInput::Toggle,
        ("/cancel", _) => WidgetInput::Cancel,
        ("/locale", code) => match code.parse::<Locale>() {
            Ok(locale) => WidgetInput::ChangeLocale(locale),
            Err(e) => {
                eprintln!("{e}");
                return Ok(true);
            }
        },
        ("/option", n) => match n.trim().parse::<usize>().ok().and_then(|n| printer.option(n)) {
            Some(option) => WidgetInput::Choose(option),
            None => {
                eprintln!("no such option: {n}");
                return Ok(true);
            }
        },
        _ => {
            // Typed into the input box, then submitted
            handle.send(WidgetInput::SetInput(line.to_string())).await?;
            WidgetInput::Send(line.to_string())
        }
    };
    handle.send(input).await?;
    Ok(true)
}

/// Prints only what changed since the last state
#[derive(Default)]
struct TranscriptPrinter {
    shown: Vec<Message>,
    was_typing: bool,
    options: Vec<widget::QuickOption>,
}

impl TranscriptPrinter {
    fn print(&mut self, state: &ConversationState) {
        // Appends keep the shown prefix; anything else is a replaced transcript
        if !state.messages.starts_with(&self.shown) {
            self.shown.clear();
            self.options.clear();
            println!("---");
        }
        for message in &state.messages[self.shown.len()..] {
            match message.role {
                Role::User => println!("you> {}", message.text),
                Role::Bot => println!("bot> {}", message.text),
            }
            if let Some(link) = &message.link {
                println!("     {} <{}>", link.label, link.url);
            }
            if let Some(download) = &message.download {
                println!("     download: {} <{}>", download.label, download.url);
            }
            if let Some(options) = &message.quick_options {
                for (i, option) in options.iter().enumerate() {
                    println!("     [{}] {}", i + 1, option.label);
                }
                self.options.clone_from(options);
            }
        }
        self.shown.clone_from(&state.messages);

        if state.is_typing && !self.was_typing {
            println!("bot> ...");
        }
        self.was_typing = state.is_typing;
        if let Err(e) = std::io::stdout().flush() {
            tracing::debug!(error = %e, "Failed to flush transcript");
        }
    }

    fn option(&self, n: usize) -> Option<widget::QuickOption> {
        n.checked_sub(1).and_then(|i| self.options.get(i)).cloned()
    }
}

// ============================================================================
// Admin
// ============================================================================

async fn run_admin(
    mut panel: AdminPanel,
    command: AdminCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        AdminCommand::Bookings { cancel, upcoming } => {
            if let Some(id) = cancel {
                panel.cancel_booking(&id).await?;
            } else {
                panel.refresh_bookings().await?;
            }
            let bookings: Vec<_> = if upcoming {
                panel.upcoming_bookings(Utc::now()).collect()
            } else {
                panel.bookings().iter().collect()
            };
            for b in bookings {
                println!(
                    "{}  {:?}  {} - {}  {} <{}> ({}){}",
                    b.id,
                    b.status,
                    b.start_iso.to_rfc3339(),
                    b.end_iso.to_rfc3339(),
                    b.client_name,
                    b.client_email,
                    b.client_timezone,
                    b.message.as_deref().map(|m| format!("  \"{m}\"")).unwrap_or_default()
                );
            }
        }
        AdminCommand::Blocks { command } => {
            let blocks = match command {
                BlockCommand::List { at: None } => panel.refresh_blocks().await?.to_vec(),
                BlockCommand::List { at: Some(at) } => {
                    panel.refresh_blocks().await?;
                    panel.blocks_covering(at).cloned().collect()
                }
                BlockCommand::AddSpecific { start, end, reason } => {
                    let block = NewBlock {
                        window: BlockWindow::Specific {
                            start_iso: start,
                            end_iso: end,
                        },
                        reason,
                    };
                    panel.create_block(&block).await?.to_vec()
                }
                BlockCommand::AddRecurring {
                    day,
                    start,
                    end,
                    reason,
                } => {
                    let block = NewBlock {
                        window: BlockWindow::Recurring {
                            day_of_week: day,
                            start_hour_utc: start.0,
                            start_minute_utc: start.1,
                            end_hour_utc: end.0,
                            end_minute_utc: end.1,
                        },
                        reason,
                    };
                    panel.create_block(&block).await?.to_vec()
                }
                BlockCommand::Delete { id } => panel.delete_block(&id).await?.to_vec(),
            };
            for block in &blocks {
                println!("{}", serde_json::to_string(block)?);
            }
        }
        AdminCommand::Sessions { leads, limit } => {
            let filter = if leads {
                SessionFilter::Leads
            } else {
                SessionFilter::All
            };
            let mut panel = panel.with_session_limit(limit);
            for s in panel.refresh_sessions(filter).await? {
                let contact = s
                    .lead_data
                    .as_ref()
                    .map(|d| {
                        format!(
                            "{} <{}> {}",
                            d.name.as_deref().unwrap_or("-"),
                            d.email.as_deref().unwrap_or("-"),
                            d.company.as_deref().unwrap_or("")
                        )
                    })
                    .unwrap_or_default();
                println!(
                    "{}  {}  {} msgs  {}{}",
                    s.session_id,
                    s.locale.as_deref().unwrap_or("?"),
                    s.message_count,
                    if s.lead_captured { "lead  " } else { "" },
                    contact
                );
            }
        }
    }
    Ok(())
}

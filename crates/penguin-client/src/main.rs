//! # penguin
//!
//! Command-line client for the Penguin chat backend. The session token is
//! kept in the local data directory between invocations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use penguin_client::commands::{auth, chats, messaging, participants};
use penguin_client::events::{ClientEvent, NoticeLevel};
use penguin_client::{AppState, ClientConfig, MessageSyncLoop, SyncHealth};
use penguin_shared::protocol::Message;
use penguin_shared::ChatId;

#[derive(Parser)]
#[command(name = "penguin")]
#[command(about = "Penguin chat client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PENGUIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long, env = "PENGUIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// List your chats
    Chats {
        /// Only chats whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Create a chat you own
    CreateChat { name: String },

    /// Follow a chat live; lines typed on stdin are sent
    Watch { chat: ChatId },

    /// Send one message
    Send {
        chat: ChatId,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the owner and participants of a chat
    Members { chat: ChatId },

    /// Add a user to a chat you own
    AddMember { chat: ChatId, username: String },

    /// Users that could be added to a chat
    Users {
        chat: ChatId,
        #[arg(default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    penguin_client::init_tracing(cli.verbose);

    let config = ClientConfig::from_env();
    let state = AppState::from_config(config).context("failed to initialise client")?;
    state.session.load_persisted_token().await;

    let mut events = state.events.subscribe();
    let result = run(&state, cli.command, &mut events).await;
    print_notices(&mut events);
    result
}

async fn run(
    state: &AppState,
    command: Commands,
    events: &mut broadcast::Receiver<ClientEvent>,
) -> Result<()> {
    match command {
        Commands::Register {
            username,
            email,
            password,
        } => {
            auth::register(state, &username, &email, &password).await?;
        }

        Commands::Login { username, password } => {
            auth::login(state, &username, &password).await?;
        }

        Commands::Logout => auth::logout(state),

        Commands::Chats { search } => {
            chats::load_chats(state).await?;
            let list = match search {
                Some(query) => chats::search_chats(state, &query),
                None => state.session.chats(),
            };
            if list.is_empty() {
                println!("No chats");
            }
            for chat in list {
                println!("{:>6}  {}", chat.id, chat.chat_name);
            }
        }

        Commands::CreateChat { name } => {
            chats::create_chat(state, &name).await?;
        }

        Commands::Watch { chat } => watch(state, chat, events).await?,

        Commands::Send { chat, text } => {
            enter_chat(state, chat).await?;
            let mut composer = messaging::Composer::new();
            composer.set_text(text.join(" "));
            if messaging::send_message(state, &mut composer, None).await?
                == messaging::SendOutcome::Skipped
            {
                eprintln!("Nothing to send");
            }
        }

        Commands::Members { chat } => {
            let members = participants::load_participants(state, chat).await?;
            println!("{:>6}  {} (owner)", members.owner_id, members.owner_name());
            for p in members.participants.iter().filter(|p| !members.is_owner(p)) {
                println!("{:>6}  {}", p.user_id, p.username);
            }
        }

        Commands::AddMember { chat, username } => {
            participants::add_participant(state, chat, &username).await?;
        }

        Commands::Users { chat, query } => {
            for user in participants::available_users(state, chat, &query).await? {
                println!("{user}");
            }
        }
    }
    Ok(())
}

/// Load the chat list and select `chat_id`.
async fn enter_chat(state: &AppState, chat_id: ChatId) -> Result<()> {
    chats::load_chats(state).await?;
    chats::open_chat(state, chat_id)?;
    Ok(())
}

async fn watch(
    state: &AppState,
    chat_id: ChatId,
    events: &mut broadcast::Receiver<ClientEvent>,
) -> Result<()> {
    enter_chat(state, chat_id).await?;
    print_notices(events);

    let handle = MessageSyncLoop::start(
        &state.session,
        state.api.clone(),
        chat_id,
        state.config.sync_config(),
    )?;
    let mut messages = handle.subscribe();
    let mut health = handle.subscribe_health();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut composer = messaging::Composer::new();
    let mut last_shown = None;

    eprintln!("Watching chat {chat_id}. Type to send, Ctrl-C to quit.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = messages.borrow_and_update().clone();
                last_shown = print_new(&current, last_shown);
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = health.borrow_and_update().clone();
                match status {
                    SyncHealth::Stale { consecutive_failures, last_error } => {
                        eprintln!("[offline: {last_error} ({consecutive_failures} failed attempts)]");
                    }
                    SyncHealth::Unauthorized => {
                        eprintln!("Session expired, please log in again");
                        break;
                    }
                    SyncHealth::Idle => break,
                    SyncHealth::Starting | SyncHealth::Live => {}
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        composer.set_text(line);
                        // Failures are reported as notices.
                        let _ = messaging::send_message(state, &mut composer, Some(&handle)).await;
                        print_notices(events);
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    handle.stop().await;
    Ok(())
}

/// Print messages newer than `last_shown`, returning the newest id printed.
fn print_new(messages: &[Message], last_shown: Option<i64>) -> Option<i64> {
    let mut newest = last_shown;
    for m in messages {
        if last_shown.map_or(true, |id| m.message_id.0 > id) {
            println!("[{}] {}: {}", m.message_id, m.username, m.message_text);
            newest = Some(m.message_id.0);
        }
    }
    newest
}

fn print_notices(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::Notice(notice) => match notice.level {
                NoticeLevel::Success => println!("{}", notice.message),
                NoticeLevel::Error => eprintln!("{}: {}", notice.header, notice.message),
            },
            ClientEvent::Navigate(route) if !route.is_protected() => {
                eprintln!("Log in with `penguin login <username>` to continue");
            }
            ClientEvent::Navigate(_) => {}
        }
    }
}

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ochat::{
    api::{
        self, chat::render_messages, AppState, CredentialFlows, RoomChange, RoomHost, RoomView,
        Screen, SessionGate,
    },
    config::Config,
    db::{self, FsObjectStorage, LocalBackend, SqliteKeyValueStore},
    error::ClientError,
    terminal::{render_room, Command, FileMediaLibrary, TerminalNotifier, HELP},
};

/// Echo every list the room displays to the terminal.
fn spawn_printer(view: &RoomView) -> JoinHandle<()> {
    let header = view.header_name();
    let uid = view.session().uid.clone();
    let mut messages = view.watch_messages();

    tokio::spawn(async move {
        loop {
            let rendered = {
                let current = messages.borrow_and_update();
                render_room(&header, &render_messages(&current, &uid))
            };
            println!("{}", rendered);
            if messages.changed().await.is_err() {
                break;
            }
        }
    })
}

/// Bring the room in line with navigation and session, restarting the printer on change.
async fn follow(state: &AppState, host: &mut RoomHost, printer: &mut Option<JoinHandle<()>>) {
    match host.sync(state).await {
        RoomChange::Unchanged => {}
        RoomChange::Unmounted => {
            if let Some(task) = printer.take() {
                task.abort();
            }
        }
        RoomChange::Mounted => {
            if let Some(task) = printer.take() {
                task.abort();
            }
            *printer = host.room().map(spawn_printer);
        }
    }
}

/// Credential commands are refused while someone is signed in.
fn signed_in_as(state: &AppState, requested: Screen) -> Option<String> {
    match SessionGate::new(&state.session).credential_screen(requested) {
        Screen::Room => state.session.current().map(|s| s.author_name()),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ochat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting OChat v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_env()?);
    tracing::info!(data_dir = %config.data_dir.display(), "configuration loaded");

    let pool = db::connect(&config).await?;
    tracing::info!(url = %config.database_url, "local backend database ready");

    let backend = Arc::new(LocalBackend::open(pool.clone(), &config).await?);
    let state = AppState::new(
        backend.clone(),
        backend,
        Arc::new(FsObjectStorage::new(config.blob_dir())),
        Arc::new(SqliteKeyValueStore::new(pool)),
        Arc::new(TerminalNotifier),
        config.clone(),
    );
    let flows = CredentialFlows::new(state.clone());

    api::start(&state).await;
    println!("{}", HELP);

    let mut host = RoomHost::new();
    let mut printer: Option<JoinHandle<()>> = None;
    let mut session_changes = state.session.subscribe();
    let mut session_live = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        follow(&state, &mut host, &mut printer).await;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            changed = session_changes.changed(), if session_live => {
                session_live = changed.is_some();
                continue;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Invalid(raw) => println!("Unknown command: {} (try /help)", raw),
            Command::OpenLogin => {
                let screen = SessionGate::new(&state.session).credential_screen(Screen::Login);
                state.navigator.push(screen);
            }
            Command::OpenRegister => {
                let screen = SessionGate::new(&state.session).credential_screen(Screen::Register);
                state.navigator.push(screen);
            }
            Command::Login { email, secret } => match signed_in_as(&state, Screen::Login) {
                Some(name) => println!("Already signed in as {}. /logout first.", name),
                None => {
                    let _ = flows.sign_in(&email, &secret).await;
                }
            },
            Command::Register {
                display_name,
                email,
                secret,
            } => match signed_in_as(&state, Screen::Register) {
                Some(name) => println!("Already signed in as {}. /logout first.", name),
                None => {
                    let _ = flows.register(&display_name, &email, &secret).await;
                }
            },
            Command::Logout => match host.room_mut() {
                Some(room) => {
                    let _ = room.logout().await;
                }
                None => println!("Not signed in."),
            },
            Command::Image(path) => match host.room() {
                Some(room) => {
                    let library = FileMediaLibrary::new(config.media_library_access, path);
                    let _ = room.composer.send_image(&library).await;
                }
                None => println!("Sign in first (/login <email> <secret>)."),
            },
            Command::Text(text) => match host.room_mut() {
                Some(room) => {
                    room.composer.set_draft(text);
                    let _ = room.composer.send_text().await;
                }
                None => println!("Sign in first (/login <email> <secret>)."),
            },
        }
    }

    if let Some(task) = printer.take() {
        task.abort();
    }
    host.close().await;
    tracing::info!("OChat stopped");

    Ok(())
}

pub mod auth;
pub mod chat;
pub mod host;
pub mod mirror;
pub mod navigation;
pub mod retry;
pub mod session;
pub mod state;

pub use auth::{CredentialFlows, RegisterOutcome};
pub use chat::{Composer, ImageSend, MessageView, RoomView};
pub use host::{RoomChange, RoomHost};
pub use mirror::LocalMirror;
pub use navigation::{Navigator, Screen};
pub use session::{SessionContext, SessionGate, SessionSubscription};
pub use state::AppState;

/// Wait for the cached session to resolve, then pick the first screen.
pub async fn start(state: &AppState) -> Screen {
    let session = state.session.resolved().await;
    let screen = SessionGate::new(&state.session).initial_screen();
    tracing::info!(
        signed_in = session.is_some(),
        route = screen.route(),
        "session resolved"
    );
    state.navigator.replace(screen);
    screen
}

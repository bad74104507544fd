use std::sync::Arc;

use tokio::sync::watch;

use crate::api::navigation::Screen;
use crate::models::Session;
use crate::services::{IdentityService, SessionState};

/// Process-wide view of "who is signed in".
///
/// Wraps the identity service's session-change feed. Every screen receives a
/// clone of this context; none of them reach for a global.
#[derive(Clone)]
pub struct SessionContext {
    identity: Arc<dyn IdentityService>,
}

impl SessionContext {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        SessionContext { identity }
    }

    /// Synchronous read of the cached session.
    pub fn current(&self) -> Option<Session> {
        self.identity.current_session()
    }

    pub fn state(&self) -> SessionState {
        self.identity.session_changes().borrow().clone()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.identity.session_changes(),
        }
    }

    /// Wait until the identity service has resolved its cached session.
    pub async fn resolved(&self) -> Option<Session> {
        let mut rx = self.identity.session_changes();
        let resolved = rx
            .wait_for(SessionState::is_resolved)
            .await
            .map(|state| state.session().cloned());
        match resolved {
            Ok(session) => session,
            // Sender gone: nothing will ever resolve, fall back to the cached read.
            Err(_) => self.current(),
        }
    }
}

/// Handle returned by [`SessionContext::subscribe`]. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    /// Next session transition, or `None` once the identity service is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        let state = self.rx.borrow_and_update().clone();
        Some(state)
    }

    pub fn unsubscribe(self) {}
}

/// Routing decisions driven by session presence. Pure reads, never fail.
pub struct SessionGate<'a> {
    context: &'a SessionContext,
}

impl<'a> SessionGate<'a> {
    pub fn new(context: &'a SessionContext) -> Self {
        SessionGate { context }
    }

    /// Screen to show at startup.
    pub fn initial_screen(&self) -> Screen {
        if self.context.current().is_some() {
            Screen::Room
        } else {
            Screen::Landing
        }
    }

    /// Login and register bounce a signed-in user straight to the room.
    pub fn credential_screen(&self, requested: Screen) -> Screen {
        if self.context.current().is_some() {
            Screen::Room
        } else {
            requested
        }
    }

    /// Session the room may mount with, or the screen to redirect to.
    pub fn room_access(&self) -> Result<Session, Screen> {
        self.context.current().ok_or(Screen::Login)
    }
}

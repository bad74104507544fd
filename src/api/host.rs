use crate::api::chat::RoomView;
use crate::api::navigation::Screen;
use crate::api::session::SessionGate;
use crate::api::state::AppState;

/// What [`RoomHost::sync`] did to the mounted room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomChange {
    Unchanged,
    /// A room was mounted, possibly replacing one bound to another user.
    Mounted,
    Unmounted,
}

/// Owns the mounted room and keeps it in step with the navigator and the
/// signed-in user.
#[derive(Default)]
pub struct RoomHost {
    room: Option<RoomView>,
}

impl RoomHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self) -> Option<&RoomView> {
        self.room.as_ref()
    }

    pub fn room_mut(&mut self) -> Option<&mut RoomView> {
        self.room.as_mut()
    }

    /// Reconcile with the current screen and session.
    ///
    /// Call after every navigation and every session transition. A room bound
    /// to a different uid is remounted for the new user. Losing the session
    /// while in the room unmounts it, clears the mirror and routes to login.
    pub async fn sync(&mut self, state: &AppState) -> RoomChange {
        let session = state.session.current();

        let screen = state.navigator.current();
        if matches!(screen, Screen::Login | Screen::Register) {
            let routed = SessionGate::new(&state.session).credential_screen(screen);
            if routed != screen {
                state.navigator.replace(routed);
            }
        }
        let on_room = state.navigator.current() == Screen::Room;

        let mut change = RoomChange::Unchanged;
        if let Some(mut room) = self.room.take() {
            let same_user = session
                .as_ref()
                .is_some_and(|s| s.uid == room.session().uid);
            if room.is_mounted() && on_room && same_user {
                self.room = Some(room);
                return RoomChange::Unchanged;
            }

            room.unmount().await;
            change = RoomChange::Unmounted;

            if session.is_none() && on_room {
                tracing::info!(uid = %room.session().uid, "session ended while in the room");
                state.mirror().clear().await;
                state.navigator.replace(Screen::Login);
                return change;
            }
            if let Some(session) = &session {
                tracing::info!(from = %room.session().uid, to = %session.uid, "user changed");
            }
        }

        if on_room {
            if let Some(room) = RoomView::mount(state).await {
                self.room = Some(room);
                change = RoomChange::Mounted;
            }
        }
        change
    }

    /// Unmount whatever is mounted.
    pub async fn close(&mut self) {
        if let Some(mut room) = self.room.take() {
            room.unmount().await;
        }
    }
}

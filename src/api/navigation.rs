use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Login,
    Register,
    Room,
}

impl Screen {
    pub fn route(&self) -> &'static str {
        match self {
            Screen::Landing => "/",
            Screen::Login => "/login",
            Screen::Register => "/register",
            Screen::Room => "/chat",
        }
    }
}

/// Screen stack with push/replace semantics.
pub struct Navigator {
    stack: watch::Sender<Vec<Screen>>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        let (stack, _) = watch::channel(vec![Screen::Landing]);
        Navigator { stack }
    }

    pub fn current(&self) -> Screen {
        self.stack.borrow().last().copied().unwrap_or(Screen::Landing)
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    pub fn push(&self, screen: Screen) {
        tracing::debug!(route = screen.route(), "navigate push");
        self.stack.send_modify(|stack| stack.push(screen));
    }

    pub fn replace(&self, screen: Screen) {
        tracing::debug!(route = screen.route(), "navigate replace");
        self.stack.send_modify(|stack| match stack.last_mut() {
            Some(top) => *top = screen,
            None => stack.push(screen),
        });
    }
}

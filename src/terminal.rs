//! Line-oriented front end over the client core.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::api::chat::MessageView;
use crate::error::ClientError;
use crate::models::PickedImage;
use crate::services::{MediaLibrary, Notifier};

pub const HELP: &str = "\
/signin                             open the login screen
/signup                             open the register screen
/register <email> <secret> <name>   create an account (name may contain spaces)
/login <email> <secret>             sign in
/image [path]                       send an image (no path cancels)
/logout                             sign out
/quit                               exit
//text                              send text starting with '/'
anything else                       send as a message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    OpenLogin,
    OpenRegister,
    Register {
        display_name: String,
        email: String,
        secret: String,
    },
    Login {
        email: String,
        secret: String,
    },
    Image(Option<PathBuf>),
    Logout,
    Quit,
    Help,
    Text(String),
    Invalid(String),
}

/// Split off the first whitespace-delimited word.
fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

impl Command {
    pub fn parse(line: &str) -> Command {
        if let Some(text) = line.strip_prefix("//") {
            return Command::Text(format!("/{}", text));
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Text(line.to_string());
        };
        let (name, args) = next_word(rest);
        let args = args.trim_end();

        match name {
            "register" => {
                let (email, args) = next_word(args);
                let (secret, display_name) = next_word(args);
                if email.is_empty() || secret.is_empty() || display_name.is_empty() {
                    return Command::Invalid(line.to_string());
                }
                Command::Register {
                    display_name: display_name.to_string(),
                    email: email.to_string(),
                    secret: secret.to_string(),
                }
            }
            "login" => {
                let (email, args) = next_word(args);
                let (secret, extra) = next_word(args);
                if email.is_empty() || !extra.is_empty() {
                    return Command::Invalid(line.to_string());
                }
                // A missing secret reaches the flow as "" and fails validation there.
                Command::Login {
                    email: email.to_string(),
                    secret: secret.to_string(),
                }
            }
            "image" if args.is_empty() => Command::Image(None),
            "image" => Command::Image(Some(PathBuf::from(args))),
            _ if !args.is_empty() => Command::Invalid(line.to_string()),
            "signin" => Command::OpenLogin,
            "signup" => Command::OpenRegister,
            "logout" => Command::Logout,
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            _ => Command::Invalid(line.to_string()),
        }
    }
}

pub fn render_room(header: &str, views: &[MessageView]) -> String {
    let mut out = format!("== OChat: {} ==\n", header);
    for view in views {
        let side = if view.is_own { ">" } else { "<" };
        out.push_str(&format!("{} [{}]", side, view.sender));
        if let Some(text) = &view.text {
            out.push(' ');
            out.push_str(text);
        }
        if let Some(url) = &view.image_url {
            out.push_str(&format!(" (image: {})", url));
        }
        out.push('\n');
    }
    out
}

pub struct TerminalNotifier;

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn alert(&self, title: &str, message: &str) {
        println!("[{}] {}", title, message);
    }

    fn banner(&self, message: &str) {
        println!("* {}", message);
    }
}

/// Gallery stand-in: the "picked" image is a file named on the command line.
pub struct FileMediaLibrary {
    granted: bool,
    path: Option<PathBuf>,
}

impl FileMediaLibrary {
    pub fn new(granted: bool, path: Option<PathBuf>) -> Self {
        FileMediaLibrary { granted, path }
    }
}

#[async_trait]
impl MediaLibrary for FileMediaLibrary {
    async fn request_permission(&self) -> Result<bool, ClientError> {
        Ok(self.granted)
    }

    async fn pick_image(&self) -> Result<Option<PickedImage>, ClientError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let base64 = match tokio::fs::read(path).await {
            Ok(bytes) => Some(base64_simd::STANDARD.encode_to_string(&bytes)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "picked image unreadable");
                None
            }
        };

        Ok(Some(PickedImage {
            base64,
            content_type: "image/jpeg".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_plain_text() {
        assert_eq!(Command::parse("hello there"), Command::Text("hello there".into()));
        assert_eq!(
            Command::parse("/login a@b.com secret1"),
            Command::Login {
                email: "a@b.com".into(),
                secret: "secret1".into()
            }
        );
        assert_eq!(Command::parse("/image"), Command::Image(None));
        assert_eq!(
            Command::parse("/image cat.jpg"),
            Command::Image(Some(PathBuf::from("cat.jpg")))
        );
        assert_eq!(Command::parse("/register Rina"), Command::Invalid("/register Rina".into()));
        assert_eq!(Command::parse("/logout now"), Command::Invalid("/logout now".into()));
    }

    #[test]
    fn display_names_keep_their_spaces() {
        assert_eq!(
            Command::parse("/register  rina@x.io  secret1  Rina  Sari "),
            Command::Register {
                display_name: "Rina  Sari".into(),
                email: "rina@x.io".into(),
                secret: "secret1".into()
            }
        );
    }

    #[test]
    fn double_slash_sends_literal_text() {
        assert_eq!(Command::parse("//shrug"), Command::Text("/shrug".into()));
        assert_eq!(Command::parse("/login a@b.com"), Command::Login {
            email: "a@b.com".into(),
            secret: String::new()
        });
        assert_eq!(
            Command::parse("/image my cat.jpg"),
            Command::Image(Some(PathBuf::from("my cat.jpg")))
        );
    }

    #[test]
    fn room_rendering_marks_sides() {
        let views = vec![
            MessageView {
                id: "1".into(),
                author_id: "u1".into(),
                sender: "You".into(),
                text: Some("hi".into()),
                image_url: None,
                is_own: true,
            },
            MessageView {
                id: "2".into(),
                author_id: "u2".into(),
                sender: "Bayu".into(),
                text: None,
                image_url: Some("file:///tmp/x.jpg".into()),
                is_own: false,
            },
        ];

        let out = render_room("Rina", &views);
        assert!(out.contains("> [You] hi"));
        assert!(out.contains("< [Bayu] (image: file:///tmp/x.jpg)"));
    }

    #[tokio::test]
    async fn missing_path_is_a_cancelled_pick() {
        let library = FileMediaLibrary::new(true, None);
        assert!(library.request_permission().await.unwrap());
        assert_eq!(library.pick_image().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_file_yields_image_without_data() {
        let library = FileMediaLibrary::new(true, Some(PathBuf::from("/nonexistent/x.jpg")));
        let picked = library.pick_image().await.unwrap().unwrap();
        assert_eq!(picked.base64, None);
    }
}

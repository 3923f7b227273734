//! Interactive chat: stdin lines in, session updates out.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use pairup_core::{
    ConnectionState, LookingFor, PairupClient, SessionController, SessionPhase, SessionUpdate,
};

use crate::cli::{ChatArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, paint};

/// How long to wait for queued frames to flush on exit.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// One line typed by the user.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Next,
    Leave,
    Quit,
    Say(String),
    Unknown(String),
    Blank,
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed {
        "" => Input::Blank,
        "/next" | "/n" => Input::Next,
        "/leave" | "/l" => Input::Leave,
        "/quit" | "/q" | "/exit" => Input::Quit,
        cmd if cmd.starts_with('/') && !cmd.starts_with("//") => Input::Unknown(cmd.to_owned()),
        // `//text` sends a line that starts with a slash.
        text => Input::Say(text.strip_prefix('/').unwrap_or(text).to_owned()),
    }
}

struct Screen {
    color: bool,
    partner: String,
}

impl Screen {
    fn status(&self, text: &str) {
        println!("{}", paint(&format!("* {text}"), self.color, output::dim));
    }

    fn warn(&self, text: &str) {
        eprintln!("{}", paint(&format!("! {text}"), self.color, output::alert));
    }

    fn render(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Phase(SessionPhase::Idle) => {
                self.status("Left the queue. /next to search again, /quit to exit.");
            }
            SessionUpdate::Phase(SessionPhase::Queued { looking_for }) => {
                self.status(&format!("Looking for a partner ({looking_for})..."));
            }
            SessionUpdate::Phase(SessionPhase::Chatting { partner }) => {
                self.partner = partner.display_name().to_owned();
                let name = paint(&self.partner, self.color, output::accent);
                println!("* Matched with {name}. Say hi!");
                if let Some(bio) = partner.bio.as_deref().filter(|b| !b.is_empty()) {
                    self.status(&format!("Bio: {bio}"));
                }
            }
            SessionUpdate::Phase(SessionPhase::Ended { reason }) => {
                self.status(&format!(
                    "Chat ended: {reason}. /next for a new partner, /quit to exit."
                ));
            }
            SessionUpdate::Message(message) => {
                let name = paint(&self.partner, self.color, output::accent);
                println!("{name}: {}", message.content);
            }
            SessionUpdate::Notice(text) => self.warn(&text),
        }
    }
}

pub async fn handle(
    client: &PairupClient,
    args: ChatArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let looking_for = LookingFor::new(args.looking_for);
    let session = client.session();
    let mut updates = session.updates();
    let mut screen = Screen {
        color: output::should_color(global.color),
        partner: String::new(),
    };

    session.find_match(looking_for.clone()).await?;
    screen.status("Connected. Type to chat; /next, /leave, /quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            update = updates.recv() => match update {
                Ok(update) => screen.render(update),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "chat output fell behind");
                }
                Err(RecvError::Closed) => break,
            },

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let outcome = match parse_input(&line) {
                    Input::Blank => Ok(()),
                    Input::Quit => break,
                    Input::Next => session.next(looking_for.clone()).await,
                    Input::Leave => leave(&session),
                    Input::Say(text) => session.say(&text),
                    Input::Unknown(cmd) => {
                        screen.warn(&format!("Unknown command {cmd}"));
                        Ok(())
                    }
                };
                if let Err(err) = outcome {
                    screen.warn(&err.to_string());
                }
            }
        }
    }

    shutdown(client, &session).await;
    Ok(())
}

/// `/leave` ends a chat, or drops out of the queue while waiting.
fn leave(session: &SessionController) -> Result<(), pairup_core::CoreError> {
    match session.current_phase() {
        SessionPhase::Queued { .. } => session.cancel(),
        _ => session.leave(),
    }
}

/// Tell the server we are going, then close the socket and give the
/// writer a moment to flush.
async fn shutdown(client: &PairupClient, session: &SessionController) {
    let phase = session.current_phase();
    let _ = match phase {
        SessionPhase::Chatting { .. } => session.leave(),
        SessionPhase::Queued { .. } => session.cancel(),
        SessionPhase::Idle | SessionPhase::Ended { .. } => Ok(()),
    };

    let mut state = client.realtime().state();
    client.realtime().disconnect();
    let closed = tokio::time::timeout(
        CLOSE_GRACE,
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await;
    if closed.is_err() {
        tracing::debug!("socket did not close within {CLOSE_GRACE:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_and_aliases() {
        assert_eq!(parse_input("/next"), Input::Next);
        assert_eq!(parse_input("  /n  "), Input::Next);
        assert_eq!(parse_input("/leave"), Input::Leave);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/dance"), Input::Unknown("/dance".into()));
    }

    #[test]
    fn text_lines_are_sent_trimmed() {
        assert_eq!(parse_input("  hello there "), Input::Say("hello there".into()));
        assert_eq!(parse_input("   "), Input::Blank);
    }

    #[test]
    fn double_slash_escapes_a_leading_slash() {
        assert_eq!(parse_input("//shrug"), Input::Say("/shrug".into()));
    }
}

//! Chat presence over the IRC-over-WebSocket endpoint.
//!
//! The session does not read or send chat messages; it only stays joined so
//! the account shows up in the channel's chatter list.

use anyhow::{Context, Result, bail};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::auth::Credential;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A parsed IRC line. Tags and source prefix are skipped.
#[derive(Debug, PartialEq, Eq)]
pub struct IrcLine<'a> {
    pub command: &'a str,
    pub params: Vec<&'a str>,
    pub trailing: Option<&'a str>,
}

impl<'a> IrcLine<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        if let Some(tagged) = rest.strip_prefix('@') {
            rest = tagged.split_once(' ')?.1;
        }
        if let Some(sourced) = rest.strip_prefix(':') {
            rest = sourced.split_once(' ')?.1;
        }

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut parts = head.split_whitespace();
        let command = parts.next()?;
        Some(Self {
            command,
            params: parts.collect(),
            trailing,
        })
    }
}

/// Lines sent right after connecting: capabilities, login, join.
pub fn registration_lines(username: &str, credential: &Credential, channel: &str) -> Vec<String> {
    vec![
        "CAP REQ :twitch.tv/membership".to_string(),
        format!("PASS {}", credential.irc_pass()),
        format!("NICK {}", username.to_lowercase()),
        format!("JOIN #{}", channel.to_lowercase()),
    ]
}

/// A joined chat channel, kept alive by a background task.
pub struct ChatSession {
    channel: String,
    outgoing: mpsc::UnboundedSender<String>,
    task: JoinHandle<Result<()>>,
}

impl ChatSession {
    /// Connect, log in and join `channel`.
    pub async fn join(
        url: &str,
        username: &str,
        credential: &Credential,
        channel: &str,
    ) -> Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to chat at {url}"))?;
        let (mut write, read) = ws.split();

        for line in registration_lines(username, credential, channel) {
            write
                .send(Message::Text(line.into()))
                .await
                .context("failed to send chat registration")?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let channel = channel.to_lowercase();
        let task = tokio::spawn(pump(write, read, rx));
        info!("Joining chat #{channel}");

        Ok(Self {
            channel,
            outgoing: tx,
            task,
        })
    }

    /// False once the connection dropped or was rejected.
    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }

    /// Part the channel and close the socket.
    pub async fn leave(self) -> Result<()> {
        let Self {
            channel,
            outgoing,
            task,
        } = self;
        // Fails only if the task already ended; the join below reports why.
        let _ = outgoing.send(format!("PART #{channel}"));
        drop(outgoing);
        info!("Left chat #{channel}");
        task.await.context("chat task panicked")?
    }
}

/// Forward outgoing lines and answer keepalives until the sender is dropped
/// or the server closes the connection.
async fn pump(
    mut write: SplitSink<WsStream, Message>,
    mut read: SplitStream<WsStream>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    loop {
        tokio::select! {
            line = outgoing.recv() => match line {
                Some(line) => write.send(Message::Text(line.into())).await?,
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    for line in text.as_str().lines() {
                        if let Some(reply) = handle_line(line)? {
                            write.send(Message::Text(reply.into())).await?;
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    write.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    bail!("chat closed by server: {frame:?}");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("chat connection error"),
                None => bail!("chat connection ended"),
            },
        }
    }
}

/// React to one server line. Returns a reply to send, if any.
fn handle_line(line: &str) -> Result<Option<String>> {
    let Some(msg) = IrcLine::parse(line) else {
        return Ok(None);
    };
    match msg.command {
        "PING" => Ok(Some(format!("PONG :{}", msg.trailing.unwrap_or("tmi.twitch.tv")))),
        "001" => {
            info!("Logged into chat");
            Ok(None)
        }
        "JOIN" => {
            debug!("Joined {}", msg.params.first().copied().unwrap_or("?"));
            Ok(None)
        }
        "NOTICE" => {
            let text = msg.trailing.unwrap_or_default();
            if text.contains("Login authentication failed")
                || text.contains("Improperly formatted auth")
            {
                bail!("chat login rejected: {text}");
            }
            warn!("Chat notice: {text}");
            Ok(None)
        }
        "RECONNECT" => bail!("chat server requested a reconnect"),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── IrcLine ────────────────────────────────────────────────────

    #[test]
    fn parses_ping() {
        let msg = IrcLine::parse("PING :tmi.twitch.tv\r\n").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
        assert_eq!(msg.trailing, Some("tmi.twitch.tv"));
    }

    #[test]
    fn parses_prefixed_join() {
        let msg = IrcLine::parse(":viewer!viewer@viewer.tmi.twitch.tv JOIN #yugi2x").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#yugi2x"]);
        assert_eq!(msg.trailing, None);
    }

    #[test]
    fn skips_tags() {
        let msg =
            IrcLine::parse("@msg-id=x :tmi.twitch.tv NOTICE * :Login authentication failed")
                .unwrap();
        assert_eq!(msg.command, "NOTICE");
        assert_eq!(msg.params, vec!["*"]);
        assert_eq!(msg.trailing, Some("Login authentication failed"));
    }

    #[test]
    fn empty_line_is_none() {
        assert!(IrcLine::parse("").is_none());
        assert!(IrcLine::parse(":only-a-prefix").is_none());
    }

    // ── handle_line ────────────────────────────────────────────────

    #[test]
    fn ping_gets_pong() {
        let reply = handle_line("PING :tmi.twitch.tv").unwrap();
        assert_eq!(reply.as_deref(), Some("PONG :tmi.twitch.tv"));
    }

    #[test]
    fn auth_failure_is_error() {
        let err = handle_line(":tmi.twitch.tv NOTICE * :Login authentication failed").unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn reconnect_is_error() {
        assert!(handle_line(":tmi.twitch.tv RECONNECT").is_err());
    }

    #[test]
    fn welcome_is_quiet() {
        assert_eq!(handle_line(":tmi.twitch.tv 001 viewer :Welcome, GLHF!").unwrap(), None);
    }

    #[test]
    fn registration_order() {
        let cred = Credential::from_raw("tok").unwrap();
        let lines = registration_lines("Viewer", &cred, "Yugi2x");
        assert_eq!(
            lines,
            vec![
                "CAP REQ :twitch.tv/membership",
                "PASS oauth:tok",
                "NICK viewer",
                "JOIN #yugi2x",
            ]
        );
    }
}

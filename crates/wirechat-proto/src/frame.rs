//! Text frame codec for the push channel.
//!
//! A [`Frame`] is one unit of data on the wire: a command line, zero or more
//! `name:value` header lines, a blank line, and a body terminated by a NUL
//! byte. This is the STOMP 1.2 text framing the chat server speaks over its
//! WebSocket endpoint.
//!
//! ```text
//! SEND\n
//! destination:/app/chat\n
//! content-type:application/json\n
//! \n
//! {"senderId":5,...}\0
//! ```
//!
//! The codec is a pure data layer: it validates structure (command, header
//! syntax, terminator) but does not interpret bodies. Body decoding happens
//! in the payload types.
//!
//! # Invariants
//!
//! - `decode(encode(frame)) == frame` for every frame this client constructs.
//! - `decode` never panics; every malformed input returns a
//!   [`ProtocolError`].
//! - Header values are escaped per STOMP 1.2 (`\\`, `\n`, `\r`, `\c`) on
//!   every frame except CONNECT and CONNECTED, which STOMP 1.2 exempts for
//!   backward compatibility.

use std::{fmt, str::FromStr};

use crate::errors::{ProtocolError, Result};

/// Frame commands understood by this protocol.
///
/// Client-originated: CONNECT, SEND, SUBSCRIBE, UNSUBSCRIBE, DISCONNECT.
/// Server-originated: CONNECTED, MESSAGE, RECEIPT, ERROR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open a session on an established socket
    Connect,
    /// Server accepted the session
    Connected,
    /// Deliver a body to a destination
    Send,
    /// Register for frames addressed to a destination
    Subscribe,
    /// Release a prior registration
    Unsubscribe,
    /// Server delivery of a body to a subscriber
    Message,
    /// Server acknowledgement of a receipt-requested frame
    Receipt,
    /// Server-reported failure
    Error,
    /// Close the session
    Disconnect,
}

impl Command {
    /// Wire spelling of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            "DISCONNECT" => Ok(Self::Disconnect),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of data on the push channel.
///
/// Headers preserve insertion order and allow repeats; [`Frame::header`]
/// returns the first occurrence, matching the protocol's "first entry wins"
/// rule for duplicated headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command
    pub command: Command,
    /// Header lines in insertion order
    headers: Vec<(String, String)>,
    /// Frame body (may be empty)
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of the named header. `None` if absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// All headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// True if the raw transport payload is a heartbeat (EOLs only), which
    /// carries no frame and must not be fed to [`Frame::decode`].
    #[must_use]
    pub fn is_heartbeat(raw: &str) -> bool {
        !raw.is_empty() && raw.chars().all(|c| c == '\n' || c == '\r')
    }

    /// Session-open frame for the given virtual host.
    ///
    /// Advertises `heart-beat:0,0`: this client negotiates no heartbeats,
    /// matching the upstream server defaults.
    #[must_use]
    pub fn connect(host: &str) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
    }

    /// Registration frame for `destination` under subscription `id`.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    /// Release frame for subscription `id`.
    #[must_use]
    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    /// JSON delivery frame addressed to `destination`.
    #[must_use]
    pub fn send_to(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Server-side delivery frame, as pushed to a subscriber.
    ///
    /// Used by this crate's consumers to stand up in-process servers in
    /// tests; a real broker adds more headers than receivers require.
    #[must_use]
    pub fn message(destination: &str, subscription: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Message)
            .with_header("destination", destination)
            .with_header("subscription", subscription)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Server-side failure frame with a short description.
    #[must_use]
    pub fn error(message: &str) -> Self {
        Self::new(Command::Error).with_header("message", message)
    }

    /// Session-close frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Render the frame to its wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        let escaped = !matches!(self.command, Command::Connect | Command::Connected);

        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse a frame from its wire form.
    ///
    /// Leading EOLs (inter-frame padding and heartbeats) are skipped. The
    /// terminating NUL is required.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MalformedFrame`] if the terminator or the blank
    ///   line separating headers from body is missing
    /// - [`ProtocolError::UnknownCommand`] for an unrecognized command line
    /// - [`ProtocolError::MalformedHeader`] for a header line without `:`
    /// - [`ProtocolError::InvalidEscape`] for an undefined escape sequence
    pub fn decode(raw: &str) -> Result<Self> {
        let raw = raw.trim_start_matches(['\r', '\n']);
        let raw = raw
            .strip_suffix('\0')
            .ok_or(ProtocolError::MalformedFrame("missing NUL terminator"))?;

        let (head, body) = split_head(raw)?;

        let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let command: Command = lines
            .next()
            .ok_or(ProtocolError::MalformedFrame("missing command line"))?
            .parse()?;
        let escaped = !matches!(command, Command::Connect | Command::Connected);

        let mut headers = Vec::new();
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                return Err(ProtocolError::MalformedHeader(line.to_string()));
            };
            if escaped {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        Ok(Self { command, headers, body: body.to_string() })
    }
}

/// Split the raw frame at the blank line separating headers from body.
///
/// Accepts both bare-LF and CRLF line endings, taking whichever separator
/// occurs first.
fn split_head(raw: &str) -> Result<(&str, &str)> {
    let lf = raw.find("\n\n").map(|i| (i, 2));
    let crlf = raw.find("\r\n\r\n").map(|i| (i, 4));

    let sep = match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match sep {
        Some((i, width)) => Ok((&raw[..i], &raw[i + width..])),
        None => Err(ProtocolError::MalformedFrame("missing header terminator")),
    }
}

/// Escape a header token per STOMP 1.2.
fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape_header`]. Undefined sequences are fatal per STOMP 1.2.
fn unescape_header(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::InvalidEscape(s.to_string())),
        }
    }
    Ok(out)
}

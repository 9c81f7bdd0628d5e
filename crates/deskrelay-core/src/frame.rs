//! STOMP-style text frame codec.
//!
//! Wire grammar: `COMMAND\n<header>:<value>\n...\n\n<body>\0`. A bare
//! newline is a heartbeat, not a frame. Header names and values are escaped
//! per STOMP 1.1+ (`\\`, `\n`, `\r`, `\c`) on every frame except
//! `CONNECT`/`CONNECTED`, which predate escaping.

use crate::error::ClientError;

/// Frame commands used by the client and the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Client → broker
    Connect,
    Subscribe,
    Unsubscribe,
    Send,
    Disconnect,
    // Broker → client
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Disconnect => "DISCONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "CONNECT" => Some(Self::Connect),
            "SUBSCRIBE" => Some(Self::Subscribe),
            "UNSUBSCRIBE" => Some(Self::Unsubscribe),
            "SEND" => Some(Self::Send),
            "DISCONNECT" => Some(Self::Disconnect),
            "CONNECTED" => Some(Self::Connected),
            "MESSAGE" => Some(Self::Message),
            "RECEIPT" => Some(Self::Receipt),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One discrete wire frame.
///
/// Headers keep insertion order; on lookup the first occurrence wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The heartbeat "frame": a single end-of-line, no command, no NUL.
pub const HEARTBEAT: &str = "\n";

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header (builder style).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of the named header, if present.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `destination` header, present on SEND/SUBSCRIBE/MESSAGE frames.
    pub fn destination(&self) -> Option<&str> {
        self.header_value("destination")
    }

    /// Returns `true` if `raw` is a heartbeat rather than a frame.
    pub fn is_heartbeat(raw: &str) -> bool {
        raw.trim_matches(|c| c == '\r' || c == '\n').is_empty()
    }

    // ─── Frame constructors ──────────────────────────────────────────────

    /// CONNECT handshake frame carrying the bearer token and heart-beat offer.
    pub fn connect(token: &str, heartbeat_ms: (u64, u64)) -> Self {
        Self::new(Command::Connect)
            .header("accept-version", "1.1,1.0")
            .header("heart-beat", format!("{},{}", heartbeat_ms.0, heartbeat_ms.1))
            .header("Authorization", format!("Bearer {token}"))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).header("id", id)
    }

    /// SEND frame with a JSON body.
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", body.len().to_string())
            .body(body)
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    // ─── Codec ───────────────────────────────────────────────────────────

    /// Encode to the wire representation (NUL-terminated).
    pub fn encode(&self) -> String {
        let escaped = self.command != Command::Connect && self.command != Command::Connected;
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
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

    /// Parse a wire frame. Heartbeats are not frames — check
    /// [`Frame::is_heartbeat`] first.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let raw = raw.strip_suffix('\0').unwrap_or(raw);
        let mut lines = raw.split('\n');

        let raw_command_line = lines
            .next()
            .ok_or_else(|| ClientError::Frame("empty frame".into()))?;
        let command_line = raw_command_line.trim_end_matches('\r');
        let command = Command::parse(command_line)
            .ok_or_else(|| ClientError::Frame(format!("unknown command: {command_line:?}")))?;
        let escaped = command != Command::Connect && command != Command::Connected;

        let mut headers = Vec::new();
        let mut header_len = raw_command_line.len() + 1;
        for line in lines {
            header_len += line.len() + 1;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                // Blank line ends the header block; the rest is the body.
                let body = raw.get(header_len..).unwrap_or("").to_string();
                return Ok(Self { command, headers, body });
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ClientError::Frame(format!("header without colon: {line:?}")))?;
            if escaped {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        Err(ClientError::Frame("missing header terminator".into()))
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> Result<String, ClientError> {
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
            other => {
                return Err(ClientError::Frame(format!(
                    "invalid escape sequence: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

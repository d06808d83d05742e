// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Minimal SIP message snapshot.
//!
//! The real transaction stack lives outside this crate; the core only
//! needs a read-only view of a message to evaluate filter criteria and to
//! feed the accounting builder. Tests and the demo binary construct
//! messages from text, so a small text parser is included.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SipParseError {
    #[error("empty message")]
    Empty,
    #[error("malformed start line: {0}")]
    StartLine(String),
    #[error("malformed header line: {0}")]
    Header(String),
}

/// SIP request methods this node routes. Anything else is carried
/// verbatim in `Other` so unknown methods still flow through IFC matching
/// and accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Invite,
    Register,
    Bye,
    Ack,
    Cancel,
    Options,
    Subscribe,
    Notify,
    Message,
    Other(String),
}

impl Method {
    pub fn from_token(token: &str) -> Self {
        match token {
            "INVITE" => Self::Invite,
            "REGISTER" => Self::Register,
            "BYE" => Self::Bye,
            "ACK" => Self::Ack,
            "CANCEL" => Self::Cancel,
            "OPTIONS" => Self::Options,
            "SUBSCRIBE" => Self::Subscribe,
            "NOTIFY" => Self::Notify,
            "MESSAGE" => Self::Message,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invite => "INVITE",
            Self::Register => "REGISTER",
            Self::Bye => "BYE",
            Self::Ack => "ACK",
            Self::Cancel => "CANCEL",
            Self::Options => "OPTIONS",
            Self::Subscribe => "SUBSCRIBE",
            Self::Notify => "NOTIFY",
            Self::Message => "MESSAGE",
            Self::Other(other) => other,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request { method: Method, uri: String },
    Response { status: u16, reason: String },
}

/// One parsed SIP message: start line, ordered headers, body.
///
/// Headers keep document order and duplicates; lookup is
/// case-insensitive per RFC 3261.
#[derive(Debug, Clone)]
pub struct SipMessage {
    start: StartLine,
    headers: Vec<(String, String)>,
    body: String,
}

impl SipMessage {
    /// Parses a message from text. Accepts both CRLF and bare-LF line
    /// endings (test fixtures use either).
    pub fn parse(text: &str) -> Result<Self, SipParseError> {
        let (head, body) = split_head_body(text);
        let mut lines = head.lines();

        let start_line = lines.next().ok_or(SipParseError::Empty)?;
        let start = parse_start_line(start_line)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| SipParseError::Header(line.to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self {
            start,
            headers,
            body: body.to_string(),
        })
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start, StartLine::Request { .. })
    }

    pub fn method(&self) -> Option<&Method> {
        match &self.start {
            StartLine::Request { method, .. } => Some(method),
            StartLine::Response { .. } => None,
        }
    }

    pub fn request_uri(&self) -> Option<&str> {
        match &self.start {
            StartLine::Request { uri, .. } => Some(uri),
            StartLine::Response { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.start {
            StartLine::Response { status, .. } => Some(*status),
            StartLine::Request { .. } => None,
        }
    }

    /// First header with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers with the given name, in document order.
    pub fn headers(&self, name: &str) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header("Call-ID")
    }

    /// Method named in the CSeq header; the only way to learn the method
    /// of a response.
    pub fn cseq_method(&self) -> Option<Method> {
        let cseq = self.header("CSeq")?;
        let token = cseq.split_whitespace().nth(1)?;
        Some(Method::from_token(token))
    }

    /// Value of the `tag` parameter on the To header, if any. Presence on
    /// a request marks an in-dialog transaction.
    pub fn to_tag(&self) -> Option<&str> {
        header_param(self.header("To")?, "tag")
    }

    pub fn expires(&self) -> Option<u32> {
        self.header("Expires")?.trim().parse().ok()
    }
}

fn split_head_body(text: &str) -> (&str, &str) {
    if let Some(pos) = text.find("\r\n\r\n") {
        (&text[..pos], &text[pos + 4..])
    } else if let Some(pos) = text.find("\n\n") {
        (&text[..pos], &text[pos + 2..])
    } else {
        (text, "")
    }
}

fn parse_start_line(line: &str) -> Result<StartLine, SipParseError> {
    if let Some(rest) = line.strip_prefix("SIP/2.0 ") {
        let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
        let status = code
            .parse::<u16>()
            .map_err(|_| SipParseError::StartLine(line.to_string()))?;
        return Ok(StartLine::Response {
            status,
            reason: reason.to_string(),
        });
    }

    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(uri), Some("SIP/2.0")) => Ok(StartLine::Request {
            method: Method::from_token(method),
            uri: uri.to_string(),
        }),
        _ => Err(SipParseError::StartLine(line.to_string())),
    }
}

/// Extracts a `;name=value` parameter from a header value, searching only
/// the part after the closing `>` when a name-addr form is present (URI
/// parameters inside the brackets belong to the URI, not the header).
pub fn header_param<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    let search = match value.rfind('>') {
        Some(pos) => &value[pos + 1..],
        None => value,
    };
    for param in search.split(';').skip_while(|p| p.is_empty()) {
        let (k, v) = param.split_once('=').unwrap_or((param, ""));
        if k.trim().eq_ignore_ascii_case(name) {
            return Some(v.trim());
        }
    }
    None
}

// src/core/master.rs

//! A thin XML-RPC client for the ROS master (`ROS_MASTER_URI`).
//!
//! Only the calls rosdev needs are implemented: `getPid` (is the master up,
//! and which process to stop) and `getSystemState` (topics and services).

use crate::constants::MASTER_CALLER_ID;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

lazy_static! {
    static ref XML_TOKEN_RE: Regex =
        Regex::new(concat!(
            r"(?s)<!\[CDATA\[(?P<cdata>.*?)\]\]>|<!--.*?-->|<\?.*?\?>",
            r"|<(?P<close>/?)(?P<name>[A-Za-z0-9_.:-]+)[^>]*?(?P<empty>/?)>",
            r"|(?P<text>[^<]+)",
        ))
        .unwrap();
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum MasterError {
    #[error("Could not reach the ROS master at {uri}: {source}")]
    Unreachable {
        uri: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("The ROS master at {uri} answered with HTTP {status}.")]
    Http { uri: String, status: u16 },
    #[error("Malformed XML-RPC response: {0}")]
    Malformed(String),
    #[error("XML-RPC fault: {0}")]
    Fault(String),
    #[error("The ROS master rejected '{method}': {message}")]
    Rejected { method: String, message: String },
}

// --- XML-RPC values ---

/// The subset of XML-RPC value types the master uses.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Renders a method call with string parameters.
pub fn encode_call(method: &str, params: &[&str]) -> String {
    let mut body = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    body.push_str(&format!("<methodName>{}</methodName><params>", escape(method)));
    for param in params {
        body.push_str(&format!(
            "<param><value><string>{}</string></value></param>",
            escape(param)
        ));
    }
    body.push_str("</params></methodCall>\n");
    body
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

fn tokenize(xml: &str) -> Vec<Token> {
    XML_TOKEN_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            if let Some(text) = caps.name("text") {
                return Some(Token::Text(text.as_str().to_string()));
            }
            // CDATA is literal; escape it so the shared unescape leaves it intact.
            if let Some(cdata) = caps.name("cdata") {
                return Some(Token::Text(escape(cdata.as_str())));
            }
            let name = caps.name("name")?.as_str().to_string();
            let closing = caps.name("close").is_some_and(|m| !m.as_str().is_empty());
            let self_closing = caps.name("empty").is_some_and(|m| !m.as_str().is_empty());
            Some(if closing {
                Token::Close(name)
            } else if self_closing {
                Token::Empty(name)
            } else {
                Token::Open(name)
            })
        })
        .collect()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(xml: &str) -> Self {
        Self {
            tokens: tokenize(xml),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Skips whitespace-only text between elements.
    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(Token::Text(t)) if t.trim().is_empty()) {
            self.pos += 1;
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<(), MasterError> {
        self.skip_blank();
        match self.next() {
            Some(Token::Open(n)) if n == name => Ok(()),
            other => Err(MasterError::Malformed(format!(
                "expected <{}>, found {:?}",
                name, other
            ))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), MasterError> {
        self.skip_blank();
        match self.next() {
            Some(Token::Close(n)) if n == name => Ok(()),
            other => Err(MasterError::Malformed(format!(
                "expected </{}>, found {:?}",
                name, other
            ))),
        }
    }

    fn text_until_close(&mut self, name: &str) -> Result<String, MasterError> {
        let mut text = String::new();
        while let Some(Token::Text(t)) = self.peek() {
            text.push_str(t);
            self.pos += 1;
        }
        self.expect_close(name)?;
        Ok(unescape(&text))
    }

    /// Parses one `<value>...</value>` element.
    fn value(&mut self) -> Result<Value, MasterError> {
        self.expect_open("value")?;

        // A bare `<value>text</value>` is a string.
        let leading = match self.peek() {
            Some(Token::Text(t)) => Some(t.clone()),
            _ => None,
        };
        if leading.is_some() {
            self.pos += 1;
        }
        self.skip_blank();
        if let Some(Token::Close(n)) = self.peek() {
            if n == "value" {
                self.pos += 1;
                return Ok(Value::Str(unescape(&leading.unwrap_or_default())));
            }
        }

        let value = match self.next() {
            Some(Token::Empty(kind)) if kind == "string" => Value::Str(String::new()),
            Some(Token::Open(kind)) => match kind.as_str() {
                "int" | "i4" | "i8" => {
                    let raw = self.text_until_close(&kind)?;
                    Value::Int(raw.trim().parse().map_err(|_| {
                        MasterError::Malformed(format!("invalid integer '{}'", raw))
                    })?)
                }
                "boolean" => {
                    let raw = self.text_until_close(&kind)?;
                    Value::Bool(raw.trim() == "1")
                }
                "double" => {
                    let raw = self.text_until_close(&kind)?;
                    Value::Double(raw.trim().parse().map_err(|_| {
                        MasterError::Malformed(format!("invalid double '{}'", raw))
                    })?)
                }
                "string" => Value::Str(self.text_until_close(&kind)?),
                "array" => self.array()?,
                "struct" => self.structure()?,
                other => {
                    return Err(MasterError::Malformed(format!(
                        "unsupported value type <{}>",
                        other
                    )));
                }
            },
            other => {
                return Err(MasterError::Malformed(format!(
                    "unexpected token in value: {:?}",
                    other
                )));
            }
        };

        self.expect_close("value")?;
        Ok(value)
    }

    fn array(&mut self) -> Result<Value, MasterError> {
        self.skip_blank();
        if let Some(Token::Empty(n)) = self.peek() {
            if n == "data" {
                self.pos += 1;
                self.expect_close("array")?;
                return Ok(Value::Array(Vec::new()));
            }
        }
        self.expect_open("data")?;
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                Some(Token::Close(n)) if n == "data" => break,
                _ => items.push(self.value()?),
            }
        }
        self.expect_close("data")?;
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }

    fn structure(&mut self) -> Result<Value, MasterError> {
        let mut members = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                Some(Token::Close(n)) if n == "struct" => break,
                _ => {
                    self.expect_open("member")?;
                    self.expect_open("name")?;
                    let name = self.text_until_close("name")?;
                    let value = self.value()?;
                    self.expect_close("member")?;
                    members.push((name, value));
                }
            }
        }
        self.expect_close("struct")?;
        Ok(Value::Struct(members))
    }
}

/// Decodes a `methodResponse` into its single return value.
pub fn decode_response(xml: &str) -> Result<Value, MasterError> {
    let mut parser = Parser::new(xml);
    parser.skip_blank();
    parser.expect_open("methodResponse")?;
    parser.skip_blank();

    match parser.peek() {
        Some(Token::Open(n)) if n == "fault" => {
            parser.pos += 1;
            let fault = parser.value()?;
            let message = match &fault {
                Value::Struct(members) => members
                    .iter()
                    .find(|(name, _)| name == "faultString")
                    .and_then(|(_, v)| v.as_str())
                    .unwrap_or("unknown fault")
                    .to_string(),
                other => format!("{:?}", other),
            };
            Err(MasterError::Fault(message))
        }
        _ => {
            parser.expect_open("params")?;
            parser.expect_open("param")?;
            let value = parser.value()?;
            parser.expect_close("param")?;
            Ok(value)
        }
    }
}

/// Unwraps the ROS `[code, statusMessage, value]` convention.
pub fn ros_result(method: &str, response: Value) -> Result<Value, MasterError> {
    let malformed = || MasterError::Malformed(format!("'{}' did not return [code, message, value]", method));
    let Value::Array(mut items) = response else {
        return Err(malformed());
    };
    if items.len() != 3 {
        return Err(malformed());
    }
    let value = items.pop().ok_or_else(malformed)?;
    let message = items.pop().and_then(|m| m.as_str().map(str::to_string)).unwrap_or_default();
    let code = items.pop().and_then(|c| c.as_int()).ok_or_else(malformed)?;
    if code != 1 {
        return Err(MasterError::Rejected {
            method: method.to_string(),
            message,
        });
    }
    Ok(value)
}

// --- System state ---

/// A topic or service and the nodes attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemState {
    pub publishers: Vec<Registration>,
    pub subscribers: Vec<Registration>,
    pub services: Vec<Registration>,
}

impl SystemState {
    fn from_value(value: &Value) -> Result<Self, MasterError> {
        let sections = value
            .as_array()
            .filter(|s| s.len() == 3)
            .ok_or_else(|| MasterError::Malformed("system state must have three sections".to_string()))?;
        let mut parsed = sections.iter().map(registrations);
        Ok(Self {
            publishers: parsed.next().unwrap_or(Ok(Vec::new()))?,
            subscribers: parsed.next().unwrap_or(Ok(Vec::new()))?,
            services: parsed.next().unwrap_or(Ok(Vec::new()))?,
        })
    }
}

fn registrations(section: &Value) -> Result<Vec<Registration>, MasterError> {
    let malformed = || MasterError::Malformed("invalid system state entry".to_string());
    section
        .as_array()
        .ok_or_else(malformed)?
        .iter()
        .map(|entry| {
            let pair = entry.as_array().ok_or_else(malformed)?;
            let name = pair.first().and_then(Value::as_str).ok_or_else(malformed)?;
            let nodes = pair
                .get(1)
                .and_then(Value::as_array)
                .ok_or_else(malformed)?
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect();
            Ok(Registration {
                name: name.to_string(),
                nodes,
            })
        })
        .collect()
}

// --- Client ---

/// Talks to one ROS master.
#[derive(Debug, Clone)]
pub struct MasterClient {
    uri: String,
    http: reqwest::Client,
}

impl PartialEq for MasterClient {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl MasterClient {
    pub fn new(uri: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            uri: uri.to_string(),
            http,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    async fn call(&self, method: &str) -> Result<Value, MasterError> {
        log::trace!("XML-RPC {} -> {}", method, self.uri);
        let response = self
            .http
            .post(&self.uri)
            .header("Content-Type", "text/xml")
            .body(encode_call(method, &[MASTER_CALLER_ID]))
            .send()
            .await
            .map_err(|source| MasterError::Unreachable {
                uri: self.uri.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MasterError::Http {
                uri: self.uri.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| MasterError::Unreachable {
            uri: self.uri.clone(),
            source,
        })?;
        ros_result(method, decode_response(&body)?)
    }

    /// True when the master answers `getPid`.
    pub async fn is_online(&self) -> bool {
        match self.get_pid().await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Master check failed: {}", e);
                false
            }
        }
    }

    pub async fn get_pid(&self) -> Result<u32, MasterError> {
        let value = self.call("getPid").await?;
        value
            .as_int()
            .and_then(|pid| u32::try_from(pid).ok())
            .ok_or_else(|| MasterError::Malformed(format!("invalid pid {:?}", value)))
    }

    pub async fn system_state(&self) -> Result<SystemState, MasterError> {
        let value = self.call("getSystemState").await?;
        SystemState::from_value(&value)
    }
}

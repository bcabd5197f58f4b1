//! Messages exchanged with the host process.

use crate::selection::overlay::{ContentMessage, ContentSink};
use crate::settings::Settings;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::sync::Mutex;

/// Sent by the menu content on the `glider:service` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuMessage {
    /// An action was picked; `data` is forwarded to the expanded overlay.
    Select {
        #[serde(default)]
        data: Value,
    },
    /// The menu itself was clicked.
    Tap,
    Hide,
}

/// Sent by the expanded overlay content on the `fastchat:service` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpandedMessage {
    Close,
    /// Content finished loading and can receive payloads.
    Ready,
}

/// Sent by the host's main window on the `win:service` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowMessage {
    /// A user signed in; `data` is the host's session payload and is not
    /// interpreted here.
    Login {
        #[serde(default)]
        data: Value,
    },
    Logout,
    /// The main window was brought forward.
    Open,
}

/// One line of the host bridge protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel")]
pub enum HostMessage {
    #[serde(rename = "settings")]
    Settings { data: Settings },
    #[serde(rename = "glider:service")]
    Menu(MenuMessage),
    #[serde(rename = "fastchat:service")]
    Expanded(ExpandedMessage),
    #[serde(rename = "win:service")]
    Window(WindowMessage),
}

pub fn parse_host_line(line: &str) -> anyhow::Result<HostMessage> {
    serde_json::from_str(line.trim()).with_context(|| format!("invalid host message: {line}"))
}

/// Writes every content message as one JSON line.
pub struct JsonLineSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ContentSink for JsonLineSink<W> {
    fn deliver(&self, message: &ContentMessage) -> anyhow::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("output stream poisoned"))?;
        serde_json::to_writer(&mut *out, message)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

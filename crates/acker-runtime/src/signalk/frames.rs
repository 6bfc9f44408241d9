//! Server frames on the Signal K stream.

use serde::Deserialize;
use serde_json::Value;
use signalk_types::Delta;

const VESSELS_PREFIX: &str = "vessels.";

/// The hello frame sent right after connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Hello {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// The self vessel, as `vessels.<urn>` or a bare URN.
    #[serde(default, rename = "self")]
    pub self_urn: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Hello {
    /// Full context of the self vessel (`vessels.<urn>`), if announced.
    #[must_use]
    pub fn self_context(&self) -> Option<String> {
        let urn = self.self_urn.as_deref()?.trim();
        if urn.is_empty() {
            return None;
        }
        if urn.starts_with(VESSELS_PREFIX) {
            Some(urn.to_string())
        } else {
            Some(format!("{VESSELS_PREFIX}{urn}"))
        }
    }
}

/// Reply to a request or a rejected command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReply {
    pub request_id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RequestReply {
    /// Whether the server reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status_code.is_some_and(|code| code >= 400)
    }
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Hello(Hello),
    Delta(Delta),
    Reply(RequestReply),
    /// Anything else; ignored.
    Other(Value),
}

/// Decode one text frame.
///
/// # Errors
///
/// When the text is not JSON, or a recognised frame has the wrong shape.
pub fn parse_frame(text: &str) -> Result<ServerFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("updates").is_some() {
        return serde_json::from_value(value).map(ServerFrame::Delta);
    }
    if value.get("requestId").is_some() {
        return serde_json::from_value(value).map(ServerFrame::Reply);
    }
    if value.get("self").is_some() || value.get("roles").is_some() {
        return serde_json::from_value(value).map(ServerFrame::Hello);
    }
    Ok(ServerFrame::Other(value))
}

use crate::domain::LiveStatus;
use serde_json::{Value, json};

/// Events pushed to a live-stream subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Snapshot sent as soon as the stream opens
    Init(LiveStatus),
    /// The shop's version moved since the last event
    Update(LiveStatus),
    /// Heartbeat carrying the server time in ms
    Ping { ts: u64 },
}

impl LiveEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Init(_) => "init",
            LiveEvent::Update(_) => "update",
            LiveEvent::Ping { .. } => "ping",
        }
    }

    /// JSON object sent as the event's `data`
    pub fn payload(&self) -> Value {
        match self {
            LiveEvent::Init(status) | LiveEvent::Update(status) => json!({
                "shop": status.shop,
                "version": status.version,
                "lastWebhookTs": status.last_webhook_ts,
            }),
            LiveEvent::Ping { ts } => json!({ "ts": ts }),
        }
    }
}

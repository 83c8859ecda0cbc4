//! Wire protocol spoken with the sync backend.
//!
//! Outbound frames are `{action, ...}` objects, inbound frames are
//! `{type, data}` objects. Inbound decoding is forward-compatible: an
//! unrecognized `type` decodes to [`ServerMessage::Unknown`] and is dropped by
//! the caller instead of terminating the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::clipboard::{ClipboardEntry, EntryContentType};
use crate::device::DeviceInfo;
use crate::error::SyncError;

/// Payload of a `sync_clipboard` action and of inbound clipboard copies.
///
/// The same shape serves three message sites: our own outbound sync, the
/// broadcast relayed to other devices (which gains `clipboard_id` and
/// `file_url` server-side), and the `clipboard_item` of a timestamp update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardSyncData {
    pub content: String,
    pub content_type: EntryContentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    /// Added by the server once the item is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipboard_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ClipboardSyncData {
    /// Materialize a history entry, but only for persisted payloads.
    ///
    /// Messages without a `clipboard_id` are ephemeral notifications and do
    /// not enter the history store.
    pub fn into_entry(self, received_at: DateTime<Utc>) -> Option<ClipboardEntry> {
        let id = self.clipboard_id?;
        Some(ClipboardEntry {
            id,
            content: self.content,
            content_type: self.content_type,
            device_id: self.device_id,
            device_name: self.device_name,
            favorite: false,
            updated_at: self.updated_at.unwrap_or(received_at),
            file_name: self.file_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            file_url: self.file_url,
        })
    }
}

/// Client → server frames.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Heartbeat; the server echoes the timestamp back in `pong`.
    Ping { timestamp: i64 },
    SyncClipboard(ClipboardSyncData),
    GetOnlineDevices,
}

impl ClientMessage {
    /// Serialize to the backend's `{action, ...}` shape.
    ///
    /// `ping` carries its timestamp at the top level, not under `data`;
    /// that is what the server reads.
    pub fn encode(&self) -> String {
        let value = match self {
            ClientMessage::Ping { timestamp } => {
                json!({ "action": "ping", "timestamp": timestamp })
            }
            ClientMessage::SyncClipboard(data) => {
                json!({ "action": "sync_clipboard", "data": data })
            }
            ClientMessage::GetOnlineDevices => json!({ "action": "get_online_devices" }),
        };
        value.to_string()
    }
}

/// Server → client frames, decoded from the `{type, data}` envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Connected {
        device_id: Option<String>,
        online_devices: Vec<DeviceInfo>,
    },
    ClipboardSync(ClipboardSyncData),
    SyncConfirmed {
        clipboard_data: ClipboardSyncData,
    },
    SyncSkipped {
        reason: Option<String>,
    },
    TimestampUpdated {
        clipboard_item: ClipboardSyncData,
    },
    DeviceOnline {
        device: DeviceInfo,
    },
    DeviceOffline {
        device_id: String,
    },
    OnlineDevices {
        devices: Vec<DeviceInfo>,
    },
    Pong,
    ServerError {
        message: String,
    },
    /// Forward compatibility: unrecognized `type`, logged and ignored.
    Unknown(String),
}

fn field<T: serde::de::DeserializeOwned>(data: &Value, key: &str) -> Result<T, SyncError> {
    let value = data
        .get(key)
        .cloned()
        .ok_or_else(|| SyncError::ProtocolAnomaly(format!("missing field `{key}`")))?;
    serde_json::from_value(value)
        .map_err(|e| SyncError::ProtocolAnomaly(format!("bad field `{key}`: {e}")))
}

fn optional<T: serde::de::DeserializeOwned>(data: &Value, key: &str) -> Option<T> {
    data.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

impl ServerMessage {
    pub fn decode(raw: &str) -> Result<Self, SyncError> {
        let envelope: Value = serde_json::from_str(raw)
            .map_err(|e| SyncError::ProtocolAnomaly(format!("malformed frame: {e}")))?;

        let kind = envelope
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::ProtocolAnomaly("frame without `type`".into()))?;
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);

        let message = match kind {
            "connected" => ServerMessage::Connected {
                device_id: optional(&data, "device_id"),
                online_devices: optional(&data, "online_devices").unwrap_or_default(),
            },
            "clipboard_sync" => {
                ServerMessage::ClipboardSync(serde_json::from_value(data).map_err(|e| {
                    SyncError::ProtocolAnomaly(format!("bad clipboard_sync payload: {e}"))
                })?)
            }
            "sync_confirmed" => ServerMessage::SyncConfirmed {
                clipboard_data: field(&data, "clipboard_data")?,
            },
            "sync_skipped" => ServerMessage::SyncSkipped {
                reason: optional(&data, "reason"),
            },
            "timestamp_updated" => ServerMessage::TimestampUpdated {
                clipboard_item: field(&data, "clipboard_item")?,
            },
            "device_online" => ServerMessage::DeviceOnline {
                device: DeviceInfo {
                    device_id: field(&data, "device_id")?,
                    device_name: optional(&data, "device_name"),
                    username: None,
                    connected_at: None,
                },
            },
            "device_offline" => ServerMessage::DeviceOffline {
                device_id: field(&data, "device_id")?,
            },
            "online_devices" => ServerMessage::OnlineDevices {
                devices: optional(&data, "devices").unwrap_or_default(),
            },
            "pong" => ServerMessage::Pong,
            "error" => ServerMessage::ServerError {
                message: optional(&data, "message").unwrap_or_else(|| "unknown error".into()),
            },
            other => ServerMessage::Unknown(other.to_string()),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_timestamp_is_top_level() {
        let frame = ClientMessage::Ping { timestamp: 1234 }.encode();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["action"], "ping");
        assert_eq!(value["timestamp"], 1234);
        assert!(value.get("data").is_none());
    }

    #[test]
    fn sync_clipboard_nests_data() {
        let data = ClipboardSyncData {
            content: "hello".into(),
            content_type: EntryContentType::Text,
            device_id: Some("desktop_a".into()),
            device_name: Some("A".into()),
            file_name: None,
            file_size: None,
            mime_type: None,
            file_id: None,
            clipboard_id: None,
            file_url: None,
            updated_at: None,
        };
        let frame = ClientMessage::SyncClipboard(data).encode();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["action"], "sync_clipboard");
        assert_eq!(value["data"]["content"], "hello");
        assert_eq!(value["data"]["content_type"], "text");
        // absent optionals are omitted, not serialized as null
        assert!(value["data"].get("file_name").is_none());
    }

    #[test]
    fn decodes_sync_confirmed() {
        let raw = r#"{
            "type": "sync_confirmed",
            "data": {
                "message": "saved",
                "synced_to": 1,
                "saved_to_db": true,
                "clipboard_data": {
                    "clipboard_id": 42,
                    "content": "hello",
                    "content_type": "text"
                }
            }
        }"#;
        match ServerMessage::decode(raw).unwrap() {
            ServerMessage::SyncConfirmed { clipboard_data } => {
                assert_eq!(clipboard_data.clipboard_id, Some(42));
                assert_eq!(clipboard_data.content, "hello");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn decodes_timestamp_updated() {
        let raw = r#"{
            "type": "timestamp_updated",
            "data": {
                "message": "duplicate",
                "reason": "duplicate_content",
                "clipboard_item": {
                    "clipboard_id": 7,
                    "content": "again",
                    "content_type": "text",
                    "updated_at": "2026-01-02T03:04:05Z"
                }
            }
        }"#;
        match ServerMessage::decode(raw).unwrap() {
            ServerMessage::TimestampUpdated { clipboard_item } => {
                assert_eq!(clipboard_item.clipboard_id, Some(7));
                assert!(clipboard_item.updated_at.is_some());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let raw = r#"{"type": "totally_new_thing", "data": {}}"#;
        assert_eq!(
            ServerMessage::decode(raw).unwrap(),
            ServerMessage::Unknown("totally_new_thing".into())
        );
    }

    #[test]
    fn malformed_json_is_a_protocol_anomaly() {
        assert!(matches!(
            ServerMessage::decode("{nope"),
            Err(SyncError::ProtocolAnomaly(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"data": {}}"#),
            Err(SyncError::ProtocolAnomaly(_))
        ));
    }

    #[test]
    fn ephemeral_sync_without_id_does_not_materialize() {
        let data = ClipboardSyncData {
            content: "x".into(),
            content_type: EntryContentType::Text,
            device_id: None,
            device_name: None,
            file_name: None,
            file_size: None,
            mime_type: None,
            file_id: None,
            clipboard_id: None,
            file_url: None,
            updated_at: None,
        };
        assert!(data.into_entry(Utc::now()).is_none());
    }
}

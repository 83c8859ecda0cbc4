//! Session and pipeline configuration.
//!
//! Nothing in the sync core reads ambient global state: the backend address
//! and token are injected as a [`SessionConfig`] with an explicit
//! `reconfigure` / `clear` lifecycle driven by login and logout, and shared
//! between the session and the uploader through [`SharedConfig`].

use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Backend endpoint and identity of this device.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Normalized REST base, always ending in `/api/v1`.
    pub base_url: String,
    pub token: String,
    pub device_id: String,
    pub device_name: String,
    pub is_configured: bool,
}

impl SessionConfig {
    pub fn new(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            ..Default::default()
        }
    }

    /// Point the session at a backend. Accepts the URL with or without a
    /// trailing slash or an `/api/v1` suffix and normalizes either way.
    pub fn reconfigure(&mut self, api_url: &str, token: impl Into<String>) {
        let base = api_url.trim_end_matches('/').trim_end_matches("/api/v1");
        self.base_url = format!("{base}/api/v1");
        self.token = token.into();
        self.is_configured = true;
    }

    /// Logout: forget the endpoint and token.
    pub fn clear(&mut self) {
        self.base_url.clear();
        self.token.clear();
        self.is_configured = false;
    }

    /// WebSocket base with the scheme switched to ws/wss.
    pub fn ws_base(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        }
    }

    /// Resolve a possibly relative file URL (`/api/v1/files/download/..`)
    /// against the configured origin.
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let origin = self.base_url.trim_end_matches("/api/v1");
        format!("{}{}", origin, url)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading session config from {}", path.display()))?;
        toml::from_str(&raw).context("parsing session config")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config dir {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("serializing session config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing session config to {}", path.display()))
    }
}

/// Handle to the mutable session configuration, shared by the session
/// runtime and the uploader. Login calls [`SharedConfig::reconfigure`],
/// logout calls [`SharedConfig::clear`].
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<RwLock<SessionConfig>>);

impl SharedConfig {
    pub fn new(config: SessionConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    pub fn snapshot(&self) -> SessionConfig {
        self.0.read().expect("config lock poisoned").clone()
    }

    pub fn reconfigure(&self, api_url: &str, token: impl Into<String>) {
        self.0
            .write()
            .expect("config lock poisoned")
            .reconfigure(api_url, token);
    }

    pub fn clear(&self) {
        self.0.write().expect("config lock poisoned").clear();
    }
}

/// Timing and behavior knobs of the sync pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Write received clipboard content back to the local OS clipboard.
    pub auto_write_to_clipboard: bool,
    /// Heartbeat ping interval while connected.
    pub heartbeat_interval_ms: u64,
    /// Fixed delay before a reconnect attempt.
    pub reconnect_interval_ms: u64,
    /// Reconnect attempt budget; 0 means unlimited.
    pub max_reconnect_attempts: u32,
    /// Debounce window coalescing bursts of OS clipboard events.
    pub debounce_ms: i64,
    /// Feedback-suppression window after a programmatic clipboard write.
    pub suppression_ms: i64,
    /// Cool-down after a dispatch before the pipeline accepts new events.
    pub processing_cooldown_ms: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_write_to_clipboard: true,
            heartbeat_interval_ms: 30_000,
            reconnect_interval_ms: 3_000,
            max_reconnect_attempts: 0,
            debounce_ms: 300,
            suppression_ms: 2_000,
            processing_cooldown_ms: 500,
        }
    }
}

/// User-configured gate files must pass before upload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadPolicy {
    /// Maximum file size in bytes; 0 disables the size check.
    pub max_file_size_bytes: u64,
    /// Allowed extensions (lowercase, no dot); empty allows everything.
    pub allowed_extensions: Vec<String>,
    /// Regex deny-list matched against the file name.
    pub deny_patterns: Vec<String>,
}

impl UploadPolicy {
    /// Check one file. A rejection skips the file individually; it never
    /// aborts the rest of the batch.
    pub fn check(&self, file_name: &str, size_bytes: u64) -> Result<(), SyncError> {
        if self.max_file_size_bytes > 0 && size_bytes > self.max_file_size_bytes {
            return Err(SyncError::PolicyRejection {
                name: file_name.to_string(),
                reason: format!(
                    "size {size_bytes} exceeds limit {}",
                    self.max_file_size_bytes
                ),
            });
        }

        if !self.allowed_extensions.is_empty() {
            let ext = Path::new(file_name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase());
            let allowed = ext
                .as_deref()
                .map(|e| self.allowed_extensions.iter().any(|a| a == e))
                .unwrap_or(false);
            if !allowed {
                return Err(SyncError::PolicyRejection {
                    name: file_name.to_string(),
                    reason: "extension not in allow-list".into(),
                });
            }
        }

        for pattern in &self.deny_patterns {
            match regex::Regex::new(pattern) {
                Ok(re) => {
                    if re.is_match(file_name) {
                        return Err(SyncError::PolicyRejection {
                            name: file_name.to_string(),
                            reason: format!("matches deny pattern `{pattern}`"),
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "skipping invalid deny pattern");
                }
            }
        }

        Ok(())
    }
}

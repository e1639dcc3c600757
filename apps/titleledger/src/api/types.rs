//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use titleledger_core::{AuditReport, LedgerError, TitleRecord};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// INVOKE REQUEST/RESPONSE
// =============================================================================

/// A dispatcher call: operation name plus positional string arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Raw read request for `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub args: Vec<String>,
}

/// Outcome of an invoke or query call.
///
/// `payload` carries the stored bytes, base64-encoded, for reads only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub success: bool,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub payload: Option<String>,
}

impl InvokeResponse {
    /// Successful call, with the read payload if there is one.
    pub fn success(payload: Option<Vec<u8>>) -> Self {
        Self {
            success: true,
            error_kind: None,
            error: None,
            payload: payload.map(|bytes| STANDARD.encode(bytes)),
        }
    }

    /// Failed call.
    pub fn error(e: &LedgerError) -> Self {
        Self::failure(e.kind(), e.to_string())
    }

    /// Failed call rejected before reaching the registry.
    pub fn failure(kind: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind.to_string()),
            error: Some(message.into()),
            payload: None,
        }
    }

    /// Decode the base64 payload back into bytes.
    pub fn payload_bytes(&self) -> Option<Vec<u8>> {
        self.payload
            .as_deref()
            .and_then(|encoded| STANDARD.decode(encoded).ok())
    }
}

// =============================================================================
// TITLE RESPONSES
// =============================================================================

/// A single decoded title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleResponse {
    pub success: bool,
    pub title: Option<TitleRecord>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl TitleResponse {
    pub fn success(title: TitleRecord) -> Self {
        Self {
            success: true,
            title: Some(title),
            error_kind: None,
            error: None,
        }
    }

    pub fn error(e: &LedgerError) -> Self {
        Self {
            success: false,
            title: None,
            error_kind: Some(e.kind().to_string()),
            error: Some(e.to_string()),
        }
    }
}

/// The id index, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleListResponse {
    pub success: bool,
    pub count: usize,
    pub ids: Vec<String>,
    pub error: Option<String>,
}

impl TitleListResponse {
    pub fn success(ids: Vec<String>) -> Self {
        Self {
            success: true,
            count: ids.len(),
            ids,
            error: None,
        }
    }

    pub fn error(e: &LedgerError) -> Self {
        Self {
            success: false,
            count: 0,
            ids: Vec::new(),
            error: Some(e.to_string()),
        }
    }
}

// =============================================================================
// AUDIT RESPONSE
// =============================================================================

/// Index consistency report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub success: bool,
    pub consistent: bool,
    pub report: Option<AuditReport>,
    pub error: Option<String>,
}

impl AuditResponse {
    pub fn success(report: AuditReport) -> Self {
        Self {
            success: true,
            consistent: report.is_consistent(),
            report: Some(report),
            error: None,
        }
    }

    pub fn error(e: &LedgerError) -> Self {
        Self {
            success: false,
            consistent: false,
            report: None,
            error: Some(e.to_string()),
        }
    }
}

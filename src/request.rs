//! Host input contract
//!
//! The host scheduler hands the worker a flat key/value map. This module
//! decodes it into a [`RunRequest`], including the versioned source payload
//! that describes the remote item of a download.

use crate::error::{Error, Result};
use crate::types::{FileItem, Operation, OperationKind, RemoteItem, RunRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Input key carrying the operation kind
pub const EPHEMERAL_TYPE: &str = "TASK_EPHEMERAL_TYPE";
/// Input key carrying the remote name
pub const REMOTE_ID: &str = "REMOTE_ID";
/// Input key carrying the remote backend type
pub const REMOTE_TYPE: &str = "REMOTE_TYPE";
/// Input key carrying the local download directory
pub const DOWNLOAD_TARGETPATH: &str = "DOWNLOAD_TARGETPATH";
/// Input key carrying the encoded source payload
pub const DOWNLOAD_SOURCE: &str = "DOWNLOAD_SOURCE";
/// Optional input key suppressing terminal notifications
pub const SILENT_RUN: &str = "SILENT_RUN";

/// Current source payload format version
pub const SOURCE_PAYLOAD_VERSION: u32 = 1;

/// One value in the host input map
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    /// UTF-8 string value
    String(String),
    /// Opaque byte payload
    Bytes(Vec<u8>),
    /// Boolean flag
    Bool(bool),
}

/// Key/value input supplied by the host scheduler
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputData {
    values: HashMap<String, InputValue>,
}

impl InputData {
    /// Create an empty input map
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style string insert
    pub fn with_string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(key.to_string(), InputValue::String(value.into()));
        self
    }

    /// Builder-style byte payload insert
    pub fn with_bytes(mut self, key: &str, value: Vec<u8>) -> Self {
        self.values.insert(key.to_string(), InputValue::Bytes(value));
        self
    }

    /// Builder-style flag insert
    pub fn with_bool(mut self, key: &str, value: bool) -> Self {
        self.values.insert(key.to_string(), InputValue::Bool(value));
        self
    }

    /// Whether `key` is present at all
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// String value for `key`, if present and a string
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(InputValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Byte value for `key`, if present and a byte payload
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.values.get(key) {
            Some(InputValue::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    /// Flag value for `key`, if present and a flag
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(InputValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Wire form of the download source descriptor
#[derive(Serialize, Deserialize)]
struct SourcePayload {
    version: u32,
    #[serde(flatten)]
    item: FileItem,
}

/// Encode a source descriptor for the [`DOWNLOAD_SOURCE`] input key
pub fn encode_source(item: &FileItem) -> Result<Vec<u8>> {
    let payload = SourcePayload {
        version: SOURCE_PAYLOAD_VERSION,
        item: item.clone(),
    };
    Ok(serde_json::to_vec(&payload)?)
}

/// Decode a [`DOWNLOAD_SOURCE`] payload
///
/// Payloads with a version other than [`SOURCE_PAYLOAD_VERSION`] are refused
/// rather than guessed at.
pub fn decode_source(bytes: &[u8]) -> Result<FileItem> {
    #[derive(Deserialize)]
    struct Header {
        version: Option<u32>,
    }

    let header: Header = serde_json::from_slice(bytes)
        .map_err(|e| Error::InvalidRequest(format!("source payload is not valid JSON: {e}")))?;
    match header.version {
        Some(SOURCE_PAYLOAD_VERSION) => {}
        Some(other) => {
            return Err(Error::InvalidRequest(format!(
                "unsupported source payload version {other}"
            )));
        }
        None => {
            return Err(Error::InvalidRequest(
                "source payload has no version field".into(),
            ));
        }
    }

    let payload: SourcePayload = serde_json::from_slice(bytes)
        .map_err(|e| Error::InvalidRequest(format!("malformed source payload: {e}")))?;
    Ok(payload.item)
}

impl RunRequest {
    /// Operation kind named by the input, without decoding the rest
    pub fn kind_from_input(input: &InputData) -> Result<OperationKind> {
        let raw = input
            .get_string(EPHEMERAL_TYPE)
            .ok_or_else(|| Error::InvalidRequest(format!("missing {EPHEMERAL_TYPE}")))?;
        raw.parse().map_err(Error::InvalidRequest)
    }

    /// Decode a full request from host input
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] when the kind is missing or unknown, or a
    ///   download lacks its source payload or target path
    /// - [`Error::NotImplemented`] for upload, move and delete
    pub fn from_input(input: &InputData) -> Result<Self> {
        let kind = Self::kind_from_input(input)?;

        let remote = RemoteItem::new(
            input.get_string(REMOTE_ID).unwrap_or_default(),
            input.get_string(REMOTE_TYPE).unwrap_or_default(),
        );

        let operation = match kind {
            OperationKind::Download => {
                let source = input
                    .get_bytes(DOWNLOAD_SOURCE)
                    .ok_or_else(|| Error::InvalidRequest(format!("missing {DOWNLOAD_SOURCE}")))?;
                let target = input
                    .get_string(DOWNLOAD_TARGETPATH)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidRequest(format!("missing {DOWNLOAD_TARGETPATH}"))
                    })?;
                Operation::Download {
                    source: decode_source(source)?,
                    target: PathBuf::from(target),
                }
            }
            OperationKind::Upload | OperationKind::Move | OperationKind::Delete => {
                return Err(Error::NotImplemented(kind));
            }
        };

        Ok(RunRequest {
            remote,
            operation,
            silent: input.get_bool(SILENT_RUN).unwrap_or(false),
        })
    }
}

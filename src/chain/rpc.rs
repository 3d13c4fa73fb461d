//! Ledger Read/Write Primitives
//!
//! The chain is consumed through two narrow traits: [`LedgerReader`] for the
//! query primitives and [`LedgerWriter`] for signed submission. The writer
//! is owned by the wallet layer outside this crate; the core only consumes
//! the digest it returns. [`JsonRpcLedger`] implements the reader over HTTP
//! JSON-RPC; tests substitute scripted implementations.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Errors produced by ledger access and intent submission.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Network/transport failure talking to the RPC endpoint.
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint returned a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed rpc response: {0}")]
    Malformed(String),

    /// An intent was submitted without a connected account.
    #[error("no account connected")]
    NoAccount,

    /// The wallet rejected or failed the submission.
    #[error("transaction submission failed: {0}")]
    SubmitFailed(String),
}

/// Scope filter for event queries: one package + module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventFilter {
    /// Package id
    pub package: String,
    /// Module name
    pub module: String,
}

/// Opaque resume position within the event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCursor {
    /// Transaction digest component
    pub tx_digest: String,
    /// Event sequence component
    pub event_seq: String,
}

/// Identifier of one emitted event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventId {
    /// Emitting transaction digest
    pub tx_digest: String,
    /// Sequence within the transaction
    pub event_seq: String,
}

/// An undecoded event as returned by the ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Event identifier
    pub id: RawEventId,
    /// Fully qualified event type (`package::module::Name`)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Decoded Move payload
    #[serde(default)]
    pub parsed_json: Value,
    /// Emission timestamp in ms (stringified on the wire)
    #[serde(default)]
    pub timestamp_ms: Option<String>,
}

/// One page of an event query.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    /// Events in ascending cursor order
    pub data: Vec<RawEvent>,
    /// Continuation token for the next query
    #[serde(default)]
    pub next_cursor: Option<EventCursor>,
    /// Whether more events are already available
    #[serde(default)]
    pub has_next_page: bool,
}

/// Execution status of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Not yet finalized (or not yet visible to the fullnode)
    Pending,
    /// Executed successfully
    Success,
    /// Executed and failed
    Failure,
}

/// A move call to submit through the wallet capability.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveCall {
    /// Package id
    pub package: String,
    /// Module name
    pub module: String,
    /// Function name
    pub function: String,
    /// Call arguments in wire form
    pub args: Vec<Value>,
}

impl MoveCall {
    /// `package::module::function` target string.
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}

/// Ledger read primitives.
pub trait LedgerReader: Send + Sync {
    /// Query domain events scoped to `filter`, after `cursor`, at most
    /// `limit`, in ascending order when `ascending`.
    fn query_events(
        &self,
        filter: &EventFilter,
        cursor: Option<&EventCursor>,
        limit: usize,
        ascending: bool,
    ) -> impl Future<Output = Result<EventPage, ChainError>> + Send;

    /// Fetch an object's content fields.
    fn get_object(&self, id: &str) -> impl Future<Output = Result<Value, ChainError>> + Send;

    /// Fetch a transaction's execution status.
    fn transaction_status(
        &self,
        digest: &str,
    ) -> impl Future<Output = Result<TxStatus, ChainError>> + Send;

    /// List object ids of recently created sessions.
    fn query_created_sessions(
        &self,
        filter: &EventFilter,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, ChainError>> + Send;
}

/// Ledger write primitive, owned by the wallet collaborator. The core only
/// consumes the returned digest.
pub trait LedgerWriter: Send + Sync {
    /// Sign and submit a move call, returning the transaction digest.
    fn submit(&self, call: &MoveCall) -> impl Future<Output = Result<String, ChainError>> + Send;
}

/// Writer used when no wallet is connected; every submission fails with
/// [`ChainError::NoAccount`].
pub struct NullWriter;

impl LedgerWriter for NullWriter {
    fn submit(&self, _call: &MoveCall) -> impl Future<Output = Result<String, ChainError>> + Send {
        async move { Err(ChainError::NoAccount) }
    }
}

/// [`LedgerReader`] over HTTP JSON-RPC.
pub struct JsonRpcLedger {
    http: reqwest::Client,
    url: String,
}

impl JsonRpcLedger {
    /// Create a client for the given RPC endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(method, "rpc call");
        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.get("error") {
            return Err(ChainError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::Malformed("missing result field".to_string()))
    }
}

impl LedgerReader for JsonRpcLedger {
    fn query_events(
        &self,
        filter: &EventFilter,
        cursor: Option<&EventCursor>,
        limit: usize,
        ascending: bool,
    ) -> impl Future<Output = Result<EventPage, ChainError>> + Send {
        let query = json!({
            "MoveModule": {
                "package": filter.package,
                "module": filter.module,
            }
        });
        let cursor = cursor
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
            .unwrap_or(Value::Null);
        async move {
            let result = self
                .call(
                    "suix_queryEvents",
                    json!([query, cursor, limit, !ascending]),
                )
                .await?;
            serde_json::from_value(result).map_err(|e| ChainError::Malformed(e.to_string()))
        }
    }

    fn get_object(&self, id: &str) -> impl Future<Output = Result<Value, ChainError>> + Send {
        let id = id.to_string();
        async move {
            let result = self
                .call("sui_getObject", json!([id, { "showContent": true }]))
                .await?;
            result
                .pointer("/data/content/fields")
                .cloned()
                .ok_or_else(|| ChainError::Malformed(format!("object {id} has no content fields")))
        }
    }

    fn transaction_status(
        &self,
        digest: &str,
    ) -> impl Future<Output = Result<TxStatus, ChainError>> + Send {
        let digest = digest.to_string();
        async move {
            let result = self
                .call(
                    "sui_getTransactionBlock",
                    json!([digest, { "showEffects": true }]),
                )
                .await?;
            let status = result
                .pointer("/effects/status/status")
                .and_then(Value::as_str);
            Ok(match status {
                Some("success") => TxStatus::Success,
                Some("failure") => TxStatus::Failure,
                _ => TxStatus::Pending,
            })
        }
    }

    fn query_created_sessions(
        &self,
        filter: &EventFilter,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, ChainError>> + Send {
        let tx_filter = json!({
            "filter": {
                "MoveFunction": {
                    "package": filter.package,
                    "module": filter.module,
                    "function": "create_game",
                }
            }
        });
        let session_type = format!("{}::{}::Game", filter.package, filter.module);
        async move {
            let result = self
                .call(
                    "suix_queryTransactionBlocks",
                    json!([tx_filter, Value::Null, limit, true]),
                )
                .await?;
            let digests: Vec<String> = result
                .pointer("/data")
                .and_then(Value::as_array)
                .map(|txs| {
                    txs.iter()
                        .filter_map(|tx| tx.get("digest").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            // Resolve each creation transaction to the session object it made.
            let mut ids = Vec::new();
            for digest in digests {
                let tx = self
                    .call(
                        "sui_getTransactionBlock",
                        json!([digest, { "showObjectChanges": true }]),
                    )
                    .await?;
                if let Some(changes) = tx.pointer("/objectChanges").and_then(Value::as_array) {
                    for change in changes {
                        let created = change.get("type").and_then(Value::as_str) == Some("created");
                        let matches_type = change
                            .get("objectType")
                            .and_then(Value::as_str)
                            .is_some_and(|t| t == session_type);
                        if created && matches_type {
                            if let Some(id) = change.get("objectId").and_then(Value::as_str) {
                                ids.push(id.to_string());
                            }
                        }
                    }
                }
            }
            Ok(ids)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_page_deserialization() {
        let page: EventPage = serde_json::from_value(json!({
            "data": [{
                "id": { "txDigest": "AbC123", "eventSeq": "0" },
                "type": "0xdead::game::PlayerMoved",
                "parsedJson": { "game_id": "0x1", "player_id": "0x2", "x": "3", "y": "0", "z": "4" },
                "timestampMs": "1700000000000"
            }],
            "nextCursor": { "txDigest": "AbC123", "eventSeq": "0" },
            "hasNextPage": false
        }))
        .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].event_type, "0xdead::game::PlayerMoved");
        assert_eq!(page.next_cursor.as_ref().unwrap().tx_digest, "AbC123");
    }

    #[test]
    fn test_move_call_target() {
        let call = MoveCall {
            package: "0xdead".into(),
            module: "game".into(),
            function: "join_game".into(),
            args: vec![],
        };
        assert_eq!(call.target(), "0xdead::game::join_game");
    }
}

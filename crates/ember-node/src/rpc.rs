//! JSON-RPC server for the Ember board node.
//!
//! Uses jsonrpsee 0.24 to expose submission, ranked queries, refund
//! withdrawal, and an event subscription. Ids and senders travel as
//! `0x`-prefixed hex; amounts travel as decimal strings since they exceed
//! the range JSON numbers carry safely.

use std::sync::Arc;

use jsonrpsee::core::{async_trait, SubscriptionResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::{PendingSubscriptionSink, SubscriptionMessage};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use ember_board::{Admission, BoardEvent, RankedEntry};
use ember_core::error::{EmberError, RefundError, SubmitError};
use ember_core::types::{Amount, MessageId, Sender, Submission};

use crate::node::{BoardInfo, Node};

// --- Error codes ---

pub const ERR_INVALID_CONTENT: i32 = -32001;
pub const ERR_DUPLICATE_ID: i32 = -32002;
pub const ERR_BID_TOO_LOW: i32 = -32003;
pub const ERR_NOTHING_OWED: i32 = -32004;
pub const ERR_NOT_FOUND: i32 = -5;
pub const ERR_INVALID_PARAMS: i32 = -22;
pub const ERR_INTERNAL: i32 = -1;

/// JSON representation of a ranked entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryJson {
    /// 1-based position on the board.
    pub rank: usize,
    pub id: String,
    pub content: String,
    pub sender: String,
    /// Bid at submission, decimal.
    pub raw_bid: String,
    /// Bid after decay at query time, decimal.
    pub effective_value: String,
    /// Admission time (Unix seconds).
    pub submitted_at: u64,
}

impl From<&RankedEntry> for EntryJson {
    fn from(ranked: &RankedEntry) -> Self {
        Self {
            rank: ranked.rank,
            id: ranked.entry.id.to_string(),
            content: ranked.entry.content.clone(),
            sender: ranked.entry.sender.to_string(),
            raw_bid: ranked.entry.raw_bid.to_string(),
            effective_value: ranked.effective_value.to_string(),
            submitted_at: ranked.entry.submitted_at,
        }
    }
}

/// JSON representation of an evicted entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvictedJson {
    pub id: String,
    pub sender: String,
    /// Refund credited for the eviction, decimal.
    pub refund: String,
}

/// JSON result of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitJson {
    pub id: String,
    pub rank: usize,
    pub submitted_at: u64,
    pub evicted: Option<EvictedJson>,
}

impl From<&Admission> for SubmitJson {
    fn from(admission: &Admission) -> Self {
        Self {
            id: admission.entry.id.to_string(),
            rank: admission.rank,
            submitted_at: admission.entry.submitted_at,
            evicted: admission.evicted.as_ref().map(|victim| EvictedJson {
                id: victim.id.to_string(),
                sender: victim.sender.to_string(),
                refund: victim.raw_bid.to_string(),
            }),
        }
    }
}

/// JSON representation of board info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardInfoJson {
    pub count: usize,
    pub capacity: usize,
    /// Bid a submission must strictly exceed, decimal.
    pub minimum_bid: String,
    pub half_life_secs: u64,
    /// Node time (Unix seconds).
    pub now: u64,
    /// Sum of all withdrawable refunds, decimal.
    pub total_refunds_owed: String,
}

impl From<&BoardInfo> for BoardInfoJson {
    fn from(info: &BoardInfo) -> Self {
        Self {
            count: info.count,
            capacity: info.capacity,
            minimum_bid: info.minimum_bid.to_string(),
            half_life_secs: info.half_life_secs,
            now: info.now,
            total_refunds_owed: info.total_refunds_owed.to_string(),
        }
    }
}

/// JSON representation of a board event, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventJson {
    Admitted {
        id: String,
        sender: String,
        raw_bid: String,
        submitted_at: u64,
        rank: usize,
    },
    Evicted {
        id: String,
        sender: String,
        refund: String,
    },
    RefundWithdrawn {
        sender: String,
        amount: String,
    },
}

impl From<&BoardEvent> for EventJson {
    fn from(event: &BoardEvent) -> Self {
        match event {
            BoardEvent::Admitted {
                id,
                sender,
                raw_bid,
                submitted_at,
                rank,
            } => Self::Admitted {
                id: id.to_string(),
                sender: sender.to_string(),
                raw_bid: raw_bid.to_string(),
                submitted_at: *submitted_at,
                rank: *rank,
            },
            BoardEvent::Evicted { id, sender, refund } => Self::Evicted {
                id: id.to_string(),
                sender: sender.to_string(),
                refund: refund.to_string(),
            },
            BoardEvent::RefundWithdrawn { sender, amount } => Self::RefundWithdrawn {
                sender: sender.to_string(),
                amount: amount.to_string(),
            },
        }
    }
}

/// Parse a hex message id, with or without `0x`.
pub fn parse_id(s: &str) -> Result<MessageId, ErrorObjectOwned> {
    s.parse()
        .map_err(|e| rpc_error(ERR_INVALID_PARAMS, &format!("invalid id: {e}")))
}

/// Parse a hex sender address, with or without `0x`.
pub fn parse_sender(s: &str) -> Result<Sender, ErrorObjectOwned> {
    s.parse()
        .map_err(|e| rpc_error(ERR_INVALID_PARAMS, &format!("invalid sender: {e}")))
}

/// Parse a decimal amount.
pub fn parse_amount(s: &str) -> Result<Amount, ErrorObjectOwned> {
    s.trim()
        .parse()
        .map_err(|_| rpc_error(ERR_INVALID_PARAMS, "amount must be a non-negative decimal integer"))
}

/// Create a JSON-RPC error.
fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Map a node error to its JSON-RPC error code.
pub fn board_error(err: &EmberError) -> ErrorObjectOwned {
    let code = match err {
        EmberError::Submit(SubmitError::InvalidContent(_)) => ERR_INVALID_CONTENT,
        EmberError::Submit(SubmitError::DuplicateId(_)) => ERR_DUPLICATE_ID,
        EmberError::Submit(SubmitError::BidTooLow { .. }) => ERR_BID_TOO_LOW,
        EmberError::Refund(RefundError::NothingOwed(_)) => ERR_NOTHING_OWED,
        _ => ERR_INTERNAL,
    };
    rpc_error(code, &err.to_string())
}

/// The Ember JSON-RPC interface.
#[rpc(server)]
pub trait EmberRpc {
    /// Submits an entry with its bid. Amounts are decimal strings.
    #[method(name = "submit")]
    async fn submit(
        &self,
        content: String,
        id: String,
        sender: String,
        bid: String,
    ) -> Result<SubmitJson, ErrorObjectOwned>;

    /// Returns all current entries, best first.
    #[method(name = "listtop")]
    async fn list_top(&self) -> Result<Vec<EntryJson>, ErrorObjectOwned>;

    /// Returns the number of current entries.
    #[method(name = "getcount")]
    async fn get_count(&self) -> Result<usize, ErrorObjectOwned>;

    /// Returns the bid a submission must strictly exceed right now.
    #[method(name = "getminimumbid")]
    async fn get_minimum_bid(&self) -> Result<String, ErrorObjectOwned>;

    /// Returns one current entry by id.
    #[method(name = "getentry")]
    async fn get_entry(&self, id: String) -> Result<EntryJson, ErrorObjectOwned>;

    /// Returns the refund balance owed to a sender.
    #[method(name = "getpendingrefund")]
    async fn get_pending_refund(&self, sender: String) -> Result<String, ErrorObjectOwned>;

    /// Withdraws everything owed to a sender.
    #[method(name = "withdraw")]
    async fn withdraw(&self, sender: String) -> Result<String, ErrorObjectOwned>;

    /// Returns aggregate board figures.
    #[method(name = "getinfo")]
    async fn get_info(&self) -> Result<BoardInfoJson, ErrorObjectOwned>;

    /// Streams board events as they are applied.
    #[subscription(name = "subscribe_events" => "board_event", unsubscribe = "unsubscribe_events", item = EventJson)]
    async fn subscribe_events(&self) -> SubscriptionResult;
}

/// Implementation of the Ember JSON-RPC server.
pub struct RpcServerImpl {
    node: Arc<Node>,
}

impl RpcServerImpl {
    /// Create a new RPC server implementation wrapping the given node.
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

#[async_trait]
impl EmberRpcServer for RpcServerImpl {
    async fn submit(
        &self,
        content: String,
        id: String,
        sender: String,
        bid: String,
    ) -> Result<SubmitJson, ErrorObjectOwned> {
        let submission = Submission::new(content, parse_id(&id)?, parse_sender(&sender)?, parse_amount(&bid)?);
        let admission = self
            .node
            .submit(&submission)
            .map_err(|e| board_error(&e))?;
        Ok(SubmitJson::from(&admission))
    }

    async fn list_top(&self) -> Result<Vec<EntryJson>, ErrorObjectOwned> {
        Ok(self.node.list_top().iter().map(EntryJson::from).collect())
    }

    async fn get_count(&self) -> Result<usize, ErrorObjectOwned> {
        Ok(self.node.count())
    }

    async fn get_minimum_bid(&self) -> Result<String, ErrorObjectOwned> {
        Ok(self.node.minimum_qualifying_bid().to_string())
    }

    async fn get_entry(&self, id: String) -> Result<EntryJson, ErrorObjectOwned> {
        let id = parse_id(&id)?;
        let ranked = self
            .node
            .get_entry(&id)
            .ok_or_else(|| rpc_error(ERR_NOT_FOUND, "entry not found"))?;
        Ok(EntryJson::from(&ranked))
    }

    async fn get_pending_refund(&self, sender: String) -> Result<String, ErrorObjectOwned> {
        let sender = parse_sender(&sender)?;
        Ok(self.node.pending_refund(&sender).to_string())
    }

    async fn withdraw(&self, sender: String) -> Result<String, ErrorObjectOwned> {
        let sender = parse_sender(&sender)?;
        let amount = self
            .node
            .withdraw(&sender)
            .map_err(|e| board_error(&e))?;
        Ok(amount.to_string())
    }

    async fn get_info(&self) -> Result<BoardInfoJson, ErrorObjectOwned> {
        Ok(BoardInfoJson::from(&self.node.info()))
    }

    async fn subscribe_events(&self, pending: PendingSubscriptionSink) -> SubscriptionResult {
        let mut rx = self.node.subscribe();
        let sink = pending.accept().await?;

        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let msg = match SubscriptionMessage::from_json(&EventJson::from(&event)) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("failed to encode event: {e}");
                        continue;
                    }
                };
                if sink.send(msg).await.is_err() {
                    debug!("event subscriber disconnected");
                    break;
                }
            }
        });

        Ok(())
    }
}

/// Start the JSON-RPC server on the given address.
///
/// Returns a [`ServerHandle`] that can be used to stop the server.
pub async fn start_rpc_server(addr: &str, node: Arc<Node>) -> Result<ServerHandle, EmberError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| EmberError::Storage(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(node);
    let handle = server.start(rpc_impl.into_rpc());

    Ok(handle)
}

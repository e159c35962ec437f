//! Payment gateway trait, answer classification and a scripted gateway.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, OrderId};
use serde::{Deserialize, Serialize};

use crate::{PaymentError, Result};

/// Query interface call succeeded.
pub const CODE_SUCCESS: &str = "10000";
/// The gateway has not processed the trade yet.
pub const CODE_NOT_PROCESSED: &str = "40004";
/// Money has been transferred.
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";
/// Trade created, buyer has not paid yet.
pub const WAIT_BUYER_PAY: &str = "WAIT_BUYER_PAY";

/// Answer to a trade query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayQuery {
    pub code: String,
    pub trade_status: Option<String>,
    /// Gateway transaction reference, present once a trade exists.
    pub trade_no: Option<String>,
}

impl GatewayQuery {
    /// A completed payment.
    pub fn success(trade_no: impl Into<String>) -> Self {
        Self {
            code: CODE_SUCCESS.to_string(),
            trade_status: Some(TRADE_SUCCESS.to_string()),
            trade_no: Some(trade_no.into()),
        }
    }

    /// A trade waiting for the buyer.
    pub fn wait_buyer_pay() -> Self {
        Self {
            code: CODE_SUCCESS.to_string(),
            trade_status: Some(WAIT_BUYER_PAY.to_string()),
            trade_no: None,
        }
    }

    /// A trade the gateway does not know about yet.
    pub fn not_processed() -> Self {
        Self {
            code: CODE_NOT_PROCESSED.to_string(),
            trade_status: None,
            trade_no: None,
        }
    }

    /// Any other answer.
    pub fn failure(code: impl Into<String>, trade_status: Option<&str>) -> Self {
        Self {
            code: code.into(),
            trade_status: trade_status.map(String::from),
            trade_no: None,
        }
    }

    /// Sorts the answer into paid, pending or failed.
    pub fn verdict(&self) -> GatewayVerdict {
        let status = self.trade_status.as_deref();
        match (self.code.as_str(), status) {
            (CODE_SUCCESS, Some(TRADE_SUCCESS)) => match self.trade_no.as_deref() {
                Some(trade_no) if !trade_no.trim().is_empty() => GatewayVerdict::Paid {
                    trade_no: trade_no.to_string(),
                },
                _ => GatewayVerdict::Failed,
            },
            (CODE_NOT_PROCESSED, _) | (CODE_SUCCESS, Some(WAIT_BUYER_PAY)) => {
                GatewayVerdict::Pending
            }
            _ => GatewayVerdict::Failed,
        }
    }
}

/// Classification of a gateway answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayVerdict {
    /// The charge completed.
    Paid { trade_no: String },
    /// Ask again later.
    Pending,
    /// Final failure.
    Failed,
}

impl GatewayVerdict {
    /// Returns the verdict name used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayVerdict::Paid { .. } => "paid",
            GatewayVerdict::Pending => "pending",
            GatewayVerdict::Failed => "failed",
        }
    }
}

/// What the gateway needs to render its payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePayRequest {
    /// The storefront's own order id, used later to query the trade.
    pub order_id: OrderId,
    pub total_amount: Money,
    pub subject: String,
}

/// Third-party payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Queries the trade created for `order_id`.
    async fn query(&self, order_id: &OrderId) -> Result<GatewayQuery>;

    /// Returns the URL the buyer is redirected to for paying.
    async fn page_pay(&self, request: &PagePayRequest) -> Result<String>;
}

#[derive(Debug)]
struct ScriptedGatewayState {
    base_url: String,
    answers: VecDeque<GatewayQuery>,
    fallback: GatewayQuery,
    queries: usize,
    page_requests: Vec<PagePayRequest>,
    fail_on_query: bool,
    hang_on_query: bool,
}

impl Default for ScriptedGatewayState {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.invalid/pay".to_string(),
            answers: VecDeque::new(),
            fallback: GatewayQuery::not_processed(),
            queries: 0,
            page_requests: Vec::new(),
            fail_on_query: false,
            hang_on_query: false,
        }
    }
}

/// Gateway that plays back scripted answers, for tests and local runs.
///
/// Queued answers are returned in order; once the queue is empty every
/// query gets the fallback answer (not processed, unless changed).
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<RwLock<ScriptedGatewayState>>,
}

impl ScriptedGateway {
    /// Creates a gateway that answers "not processed" to every query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an answer.
    pub fn push_answer(&self, answer: GatewayQuery) {
        self.state.write().unwrap().answers.push_back(answer);
    }

    /// Sets the answer given once the queue is empty.
    pub fn set_fallback(&self, answer: GatewayQuery) {
        self.state.write().unwrap().fallback = answer;
    }

    /// Configures every query to fail as if the gateway were unreachable.
    pub fn set_fail_on_query(&self, fail: bool) {
        self.state.write().unwrap().fail_on_query = fail;
    }

    /// Configures every query to never answer.
    pub fn set_hang_on_query(&self, hang: bool) {
        self.state.write().unwrap().hang_on_query = hang;
    }

    /// Returns the number of queries received.
    pub fn query_count(&self) -> usize {
        self.state.read().unwrap().queries
    }

    /// Returns every page-pay request received.
    pub fn page_requests(&self) -> Vec<PagePayRequest> {
        self.state.read().unwrap().page_requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn query(&self, _order_id: &OrderId) -> Result<GatewayQuery> {
        let hang = {
            let mut state = self.state.write().unwrap();
            state.queries += 1;
            if state.fail_on_query {
                return Err(PaymentError::Gateway("connection refused".to_string()));
            }
            state.hang_on_query
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.write().unwrap();
        let answer = match state.answers.pop_front() {
            Some(answer) => answer,
            None => state.fallback.clone(),
        };
        Ok(answer)
    }

    async fn page_pay(&self, request: &PagePayRequest) -> Result<String> {
        let mut state = self.state.write().unwrap();
        state.page_requests.push(request.clone());
        Ok(format!(
            "{}?out_trade_no={}&total_amount={}",
            state.base_url, request.order_id, request.total_amount
        ))
    }
}

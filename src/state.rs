use crate::config::AppConfig;
use crate::desk::clock::PriceStep;
use crate::desk::refresh::PositionView;
use crate::desk::registry::{AddContractForm, Contract};
use crate::desk::Desk;
use crate::errors::DeskResult;
use crate::models::OptionKind;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

// ── Messages INTO the desk engine (bounded channel) ──

#[derive(Debug)]
pub enum DeskEvent {
    Step {
        percent_change: f64,
        reply: oneshot::Sender<DeskResult<PriceStep>>,
    },
    AddContract {
        form: AddContractForm,
        reply: oneshot::Sender<DeskResult<Contract>>,
    },
    RemoveContract {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    Reset {
        reply: oneshot::Sender<DeskResult<()>>,
    },
    /// Result of a spawned commentary request. Tagged with the desk generation
    /// it was requested under so results from before a reset are dropped.
    CommentaryReady {
        generation: u64,
        day: u32,
        text: String,
        failed: bool,
    },
    Shutdown,
}

// ── Messages OUT of the engine ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "price_step")]
    PriceStep {
        day: u32,
        price: f64,
        percent_change: f64,
        date: String,
    },

    #[serde(rename = "valuations")]
    Valuations {
        day: u32,
        spot: f64,
        positions: Vec<PositionView>,
    },

    #[serde(rename = "contract_added")]
    ContractAdded {
        id: String,
        strike: f64,
        kind: OptionKind,
        expiry_day: u32,
        inception_price: f64,
    },

    #[serde(rename = "contract_removed")]
    ContractRemoved { id: String },

    #[serde(rename = "commentary")]
    Commentary {
        day: u32,
        text: String,
        pending: bool,
    },

    #[serde(rename = "reset")]
    Reset { spot: f64 },
}

// ── Commentary display state ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct CommentaryState {
    pub text: String,
    pub pending: bool,
    /// Day the current text was produced for.
    pub day: u32,
    /// Day of the newest request sent out; pending until a result for it lands.
    pub requested_day: u32,
}

impl CommentaryState {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            pending: false,
            day: 0,
            requested_day: 0,
        }
    }
}

// ── Desk snapshot for the dashboard (sent via watch channel) ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeskSnapshot {
    pub symbol: String,
    pub model: &'static str,
    pub spot_price: f64,
    pub elapsed_days: u32,
    pub generation: u64,
    pub price_history: Vec<PriceStep>,
    pub positions: Vec<PositionView>,
    pub commentary: CommentaryState,
}

impl DeskSnapshot {
    pub fn capture(symbol: &str, desk: &Desk, commentary: &CommentaryState) -> Self {
        Self {
            symbol: symbol.to_string(),
            model: desk.model_name(),
            spot_price: desk.sim().spot_price(),
            elapsed_days: desk.sim().elapsed_days(),
            generation: desk.generation(),
            price_history: desk.sim().price_history().to_vec(),
            positions: desk.positions(),
            commentary: commentary.clone(),
        }
    }

    /// Placeholder published before the engine task has started.
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            model: "",
            spot_price: 0.0,
            elapsed_days: 0,
            generation: 0,
            price_history: Vec::new(),
            positions: Vec::new(),
            commentary: CommentaryState::new(""),
        }
    }
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub steps_processed: AtomicU64,
    pub refreshes: AtomicU64,
    pub contracts_added: AtomicU64,
    pub contracts_removed: AtomicU64,
    pub requests_rejected: AtomicU64,
    pub commentary_requested: AtomicU64,
    pub commentary_failed: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            steps_processed: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            contracts_added: AtomicU64::new(0),
            contracts_removed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            commentary_requested: AtomicU64::new(0),
            commentary_failed: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use portable_atomic::Ordering::Relaxed;
        serde_json::json!({
            "steps_processed": self.steps_processed.load(Relaxed),
            "refreshes": self.refreshes.load(Relaxed),
            "contracts_added": self.contracts_added.load(Relaxed),
            "contracts_removed": self.contracts_removed.load(Relaxed),
            "requests_rejected": self.requests_rejected.load(Relaxed),
            "commentary_requested": self.commentary_requested.load(Relaxed),
            "commentary_failed": self.commentary_failed.load(Relaxed),
            "ws_messages_sent": self.ws_messages_sent.load(Relaxed),
        })
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,

    // Engine -> Dashboard: latest snapshot (watch = single producer, multi consumer)
    pub snapshot_tx: watch::Sender<DeskSnapshot>,
    pub snapshot_rx: watch::Receiver<DeskSnapshot>,

    // Engine -> Dashboard: event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    // Routes/commentary -> Engine: bounded event channel
    pub engine_tx: mpsc::Sender<DeskEvent>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, engine_tx: mpsc::Sender<DeskEvent>) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(1024);
        let (snapshot_tx, snapshot_rx) = watch::channel(DeskSnapshot::empty(&config.symbol));

        Arc::new(Self {
            config,
            snapshot_tx,
            snapshot_rx,
            ws_tx,
            engine_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }
}

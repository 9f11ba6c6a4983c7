//! Swap orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! amount edit → orchestrator.rs (debounce, generation tag)
//!     → ChainClient::amounts_out → quote.rs (impact, min out)
//!     → ChainClient::allowance   → approval decision
//!     → SwapForm (types.rs)      → readiness / phase for the UI
//! SessionEvent → orchestrator.rs (new epoch, reset, reload)
//! ```

pub mod orchestrator;
pub mod quote;
pub mod types;

pub use orchestrator::SwapOrchestrator;
pub use types::{
    ActionState, ApprovalDecision, ApprovalState, QuoteResult, SwapBlocker, SwapExecution,
    SwapForm, SwapPhase, MAX_SLIPPAGE_BPS,
};

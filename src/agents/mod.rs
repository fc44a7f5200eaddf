//! Agent System
//!
//! The two model-backed features of the service:
//!
//! - **Chat Agent**: bounded tool-calling loop over the patient dataset
//! - **Insight Agent**: one-shot summary of a single patient's biomarkers
//!
//! ## Chat loop
//!
//! ```text
//! transcript ──► model ──► tool calls? ──no──► answer
//!                  ▲            │
//!                  │           yes
//!                  │            ▼
//!                  └── tool results (max 5 rounds)
//! ```

pub mod chat;
pub mod insights;

pub use chat::{ChatAgent, ChatOutcome, StopReason, MAX_TOOL_ITERATIONS};
pub use insights::InsightAgent;

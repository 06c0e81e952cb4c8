//! ZAP integration - remote-polled scanning
//!
//! ZAP runs spider and active scans asynchronously behind a JSON API.
//! This crate provides:
//! - `PollDriver`: generic bounded start → poll → fetch state machine
//! - `ZapClient`: thin reqwest client over the ZAP endpoints
//! - `ZapAdapter`: `ToolAdapter` for `zap-spider` / `zap-active`

mod adapter;
pub mod client;
pub mod error;
pub mod poll;

pub use adapter::{ZapAdapter, ZapMode};
pub use client::{ZapClient, DEFAULT_ZAP_API};
pub use error::ZapError;
pub use poll::{PollConfig, PollDriver, PollState, RemoteScan};

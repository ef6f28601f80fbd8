//! # Exa Scout
//!
//! A conversational search front end for the Exa API.
//!
//! Exa Scout accepts queries in four modes (web search, direct answer, code
//! assistance, and multi-step research), forwards each to the matching Exa
//! endpoint, and returns normalized records to a browser front end over HTTP
//! or prints them in the terminal.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐
//! │   HTTP   │   │   CLI    │
//! │ (/api/*) │   │ (scout)  │
//! └────┬─────┘   └────┬─────┘
//!      │              │ Session (message log)
//!      └──────┬───────┘
//!             ▼
//!      ┌─────────────┐   ┌──────────────┐
//!      │ Mode        │──▶│ Context      │  code mode history
//!      │ services    │   ├──────────────┤
//!      │ (Scout)     │──▶│ Research     │  create + poll loop
//!      └──────┬──────┘   └──────┬───────┘
//!             ▼                 ▼
//!      ┌──────────────────────────────┐
//!      │ ExaApi (reqwest) + shapers   │
//!      └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export EXA_API_KEY=...
//! scout search "rust async runtimes"
//! scout answer "what is the capital of australia"
//! scout research "summarize recent work on sparse attention"
//! scout chat --mode code         # interactive session
//! scout serve                    # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Requests, records, and Exa payloads |
//! | [`error`] | Error taxonomy and HTTP status mapping |
//! | [`client`] | Exa API trait and HTTP client |
//! | [`context`] | Conversation context for code mode |
//! | [`research`] | Research task polling |
//! | [`shape`] | Payload normalization |
//! | [`service`] | Per-mode operations |
//! | [`session`] | Client-side message log |
//! | [`present`] | Terminal rendering |
//! | [`server`] | HTTP server |

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod present;
pub mod research;
pub mod server;
pub mod service;
pub mod session;
pub mod shape;

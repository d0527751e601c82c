//! # API Module
//!
//! HTTP handlers for the server's REST mode. The JSON-RPC `/api/rpc`
//! endpoint (wired in `main.rs`) exposes the full tool surface; the routes
//! here are thin conveniences over the same chain services.
//!
//! ## Available Endpoints
//! - `GET /api/health` - Liveness probe
//! - `GET /api/networks` - Supported networks
//! - `GET /api/balance/:network/:address` - Native balance
//! - `POST /api/rpc` - JSON-RPC tool calls

pub mod balance;
pub mod health;
pub mod networks;

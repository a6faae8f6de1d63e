//! Authoritative game server for team-based first-person arena combat.
//!
//! Clients send intents over WebSocket: movement axes, trigger and reload
//! edges, weapon switches. Each arena task simulates them at a fixed tick
//! rate, resolves hit-scan shots and damage server-side, and broadcasts
//! snapshots and combat events back to every connected player.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod session;
pub mod util;
pub mod ws;

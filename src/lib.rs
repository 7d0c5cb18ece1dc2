//! Roomhub - Real-time room broadcast hub
//!
//! Serves live collaboration rooms (planning poker, retrospectives, story
//! boards and team check-ins) over WebSockets. Each connection is screened,
//! admitted into a per-room group, and every state change one member makes
//! is fanned out to the rest of the room.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

//! Client access layer for the HouseHelper API: request building, session
//! persistence and the third-party login handshakes that produce a session.

pub mod auth;
pub mod config;
pub mod http;
pub mod services;

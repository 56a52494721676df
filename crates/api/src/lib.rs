//! Clementine shop API library.
//!
//! Exposes the checkout workflow, review gate, catalog, cart, and address
//! book as a library so the HTTP surface can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

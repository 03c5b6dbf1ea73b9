// src/lib.rs

//! Hacker News top stories fetcher.
//!
//! Periodically lists the Hacker News top stories, stores the ones not seen
//! before in Postgres and announces each new story on NATS. A small HTTP API
//! serves brand statistics over the stored data.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

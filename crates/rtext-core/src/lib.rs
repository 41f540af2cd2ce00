//! Core domain + application logic for the Russian text assistant bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and YandexGPT live
//! behind ports (traits) implemented in adapter crates.

pub mod assistant;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod messaging;
pub mod pending;
pub mod replies;
pub mod text;

pub use errors::{Error, Result};

//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the gated player core:
//! - Logging and tracing setup
//! - Shared host configuration (`CoreConfig`)
//! - Typed event bus for playback and gate notifications
//!
//! ## Overview
//!
//! The playback crate depends on this crate for its ambient concerns. Hosts
//! call [`logging::init_logging`] once, build a [`config::CoreConfig`] with
//! their bridge implementations, and subscribe to the controller's
//! [`events::EventBus`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

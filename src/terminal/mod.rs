//! Terminal module - embedded terminal emulation
//!
//! This module provides:
//! - `LumTermConfig`: Configuration for wezterm-based terminal emulation
//! - `Session`: Terminal session wrapping wezterm's Terminal

mod config;
mod session;

pub use config::LumTermConfig;
pub use session::Session;

//! # tablink-pad: TabLink pad client
//!
//! Runs on the **tablet**. Connects to `tablink-host` over UDP,
//! submits stylus samples through the session engine, and receives
//! mirrored screen frames for the (external) renderer.

pub mod config;
pub mod state;
pub mod stroke;

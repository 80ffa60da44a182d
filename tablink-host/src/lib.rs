//! # tablink-host: TabLink host service
//!
//! Runs on the **host** machine. Answers pad handshakes and heartbeats,
//! collects the stylus samples a pad sends, and can stream a
//! synthetic screen to the pad as XOR-delta frames.
//!
//! Pointer injection into the local desktop is left to the embedding
//! application; this service logs what it receives.

pub mod config;
pub mod service;

//! SatHub ground station client.
//!
//! Wires the pass ingestion pipeline to the SatHub API, keeps the station's
//! health status fresh, and listens on the station control channel for
//! settings changes and restart requests.

pub mod cli;
pub mod control;
pub mod runtime;

//! Sensor data ingestion.
//!
//! Submodules:
//! - `reading`: best-effort decoding of device payloads posted to `/ingest`.

pub mod reading;

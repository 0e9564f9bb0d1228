//! OCR Bridge Library
//!
//! HTTP bridge in front of an external OCR engine. The main server binary
//! is in main.rs.
//!
//! # Modules
//!
//! - `ocr`: Input dispatch, engine adapter and result aggregation
//! - `routes`: `/health` and `/ocr` endpoints
//! - `config`: Environment-driven configuration

pub mod config;
pub mod ocr;
pub mod routes;
pub mod state;

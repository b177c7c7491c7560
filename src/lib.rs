//! Library crate for portsweep exposing the scan engine and its data model.
pub mod config;
pub mod error;
pub mod ports;
pub mod probe;
pub mod scanner;
pub mod services;
pub mod types;

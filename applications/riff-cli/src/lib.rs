//! Riff Player - Offline Renderer
//!
//! Platform glue for running the playback engine outside a browser: a JSON
//! catalog standing in for the remote document store, a WAV file decoder
//! standing in for the platform decoder, and layered configuration.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod decoder;

pub use catalog::CatalogStore;
pub use config::CliConfig;
pub use decoder::WavDecoder;

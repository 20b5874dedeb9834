//! Helpers shared between drivers.

pub mod tls;

pub use tls::{SslMode, TlsBuilder};

//! Networking for the test console.
//!
//! - **connection**: TCP stream wrapper with a timeout-bounded connect
//! - **session**: connect-to-disconnect lifecycle combining the
//!   connection with the background receiver thread
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Connection (duplex TCP byte stream)
//! └── receiver thread (prints incoming data)
//! ```

pub mod connection;
pub mod session;

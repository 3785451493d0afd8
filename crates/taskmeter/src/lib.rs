//! Top-level facade crate for taskmeter.
//!
//! Re-exports the metrics engine and the server library so users can depend on a single crate.

pub mod core {
    pub use taskmeter_core::*;
}

pub mod server {
    pub use taskmeter_server::*;
}

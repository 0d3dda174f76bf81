//! Shared building blocks for the rt-stt workspace.
//!
//! Holds the pieces every other crate needs but that carry no knowledge of the
//! daemon protocol itself:
//!
//! - [`ErrorLocation`]: source position attached to every error variant
//!
//! ## Layering
//!
//! - **common** (this crate): leaf utilities
//! - **stt-client**: IPC client engine talking to the speech-to-text daemon
//! - **rt-stt**: command-line front end wiring everything together

pub mod error_location;

pub use error_location::ErrorLocation;

//! # REST Contracts Test
//!
//! Transports for testing code built on REST contracts.
//!
//! - [`InProcessTransport`] runs client calls against an [`ApiRouter`]
//!   with no network, exercising both adapters end to end.
//! - [`RecordingTransport`] answers from canned responses and records what
//!   the client sent, for testing client code alone.
//!
//! [`ApiRouter`]: rest_contracts_server::ApiRouter

#![doc(html_root_url = "https://docs.rs/rest-contracts-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod in_process;
mod recording;

pub use in_process::{InProcessTransport, IN_PROCESS_BASE_URL};
pub use recording::RecordingTransport;

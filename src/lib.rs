#![warn(clippy::pedantic)]
// Noisy doc/signature lints: would require annotating every pub function
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Relay/transport types carry their module name (relay::RelayOutcome, stream::StreamEvent)
#![allow(clippy::module_name_repetitions)]

pub mod access;
pub mod agent;
pub mod bus;
pub mod channels;
pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod relay;
pub mod stream;
pub(crate) mod utils;

pub use errors::BridgeError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

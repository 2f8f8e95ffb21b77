//! Simulates the participants of a hyper.video session switching between the standard and the network compatibility
//! configuration. Every participant is a client with its own mode controller and storage, connected through an
//! in-process conference.

#[macro_use]
extern crate tracing;

mod logging;
pub mod simulation;

pub use compat_mode_config::{
    Args,
    Config,
};
pub use logging::{
    init_errors,
    init_logging,
};
pub use simulation::{
    ClientSummary,
    Simulation,
    Summary,
};

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

pub mod classifier;
pub mod decision;
pub mod filter;
pub mod interceptor;
pub mod prober;
pub mod provision;
pub mod request;

pub use crate::decision::{Decision, RejectKind};
pub use crate::interceptor::{Guard, GuardPolicy};
pub use crate::prober::{DirectoryProber, LdapProber, ProbeResult};
pub use crate::provision::{CommandProvisioner, Provisioner, ProvisioningOutcome};
pub use crate::request::{Control, Operation, WriteRequest};

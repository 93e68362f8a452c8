#![doc = include_str!("../README.md")]

extern crate self as booker;

pub mod booking;
pub mod check;
pub mod cli;
pub(crate) mod executor;
pub mod plan;
pub mod registry;
pub mod report;
pub mod run;
pub mod scenario;
#[doc(hidden)]
pub mod transaction;

pub use booker_core as core;
pub use booker_macros::transaction;
pub use scenario::Scenario;
pub use transaction::current_vu;

pub mod prelude {
    pub use crate::booking::{ApiResponse, BookingContext, Exec, TransportError};
    pub use crate::check::check;
    pub use crate::registry::Registry;
    pub use crate::scenario::{ConfigurableScenario, Scenario};
    pub use booker_core::{RunStatistics, Stage, Summary};
    pub use booker_macros::transaction;
}

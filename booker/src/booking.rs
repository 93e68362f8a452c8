//! The restful-booker scenario: typed API calls, fake payloads and the pending bookings shared
//! between VUs.
mod api;
mod client;
mod context;
mod payload;
mod pending;
#[cfg(test)]
pub(crate) mod testing;

pub use api::*;
pub use client::*;
pub use context::*;
pub use payload::*;
pub use pending::*;

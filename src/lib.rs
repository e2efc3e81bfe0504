//! Transit arrivals board data model.
//!
//! The board shows three stops fetched from an upstream JSON endpoint. This
//! crate owns the payload shape (`ArrivalPayload` and friends), the lenient
//! upstream decoding rules, and (behind the `client` feature) the blocking
//! upstream fetch collaborator. Layout and rasterization live in
//! `busboard-render` and `busboard-embedded-graphics`.

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod payload;
#[cfg(feature = "client")]
pub mod upstream;

pub use payload::{
    Arrival, ArrivalPayload, Eta, Route, Stop, StopCodes, StopSlot, ARRIVAL_SLOTS,
    PLACEHOLDER_GLYPH,
};
#[cfg(feature = "client")]
pub use upstream::{ProbeReport, UpstreamClient, UpstreamError};

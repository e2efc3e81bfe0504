//! Backend-agnostic layout planning for the busboard display.
//!
//! The planner turns an [`busboard::ArrivalPayload`] into a [`BoardPlan`]: an
//! absolute position for every text element on a fixed-size canvas, computed
//! without drawing anything. The auto-fit controller re-runs the measurement
//! pass with progressively smaller [`FontSizes`] until the plan fits the
//! canvas or the iteration budget runs out; an overflowing plan is still a
//! valid plan. Rasterization lives in `busboard-embedded-graphics`.

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

mod render_ir;
mod render_layout;

pub use render_ir::{
    AutoFitConfig, BlockLayout, BoardGeometry, BoardPlan, FitSummary, FontSizes, TextCommand,
    TextRole,
};
pub use render_layout::{
    block_title, fit_sizes, measure_block, plan_board, plan_fitted, wrap_text, HeuristicMetrics,
    TextMetrics,
};

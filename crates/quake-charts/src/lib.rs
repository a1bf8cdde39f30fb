//! Text rendering for quake-report.
//!
//! Turns distributions, statistics and event lists into fixed-width text
//! blocks for terminal output.

pub mod charts;

pub use charts::{
    render_bar_chart, render_event_table, render_pie_chart, render_stats_table, render_table,
};

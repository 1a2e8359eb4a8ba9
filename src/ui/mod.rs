//! Terminal output helpers for the `relstore` binary
//!
//! The renderers take a [`Theme`] and return text so the CLI decides where it
//! goes; `banner`/`done`/`caution` print straight away with the global theme.

pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, caution, children_list, done, ingest_report, node_card, stats_block};
pub use theme::{theme, Theme};

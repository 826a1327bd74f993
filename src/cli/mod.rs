//! Terminal-side helpers for the `prolens` binary.

pub mod console;
pub mod table;

pub use console::ConsoleFrontend;
pub use table::{print_table, render_table};

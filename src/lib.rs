//! Core library for the shelfsheet command line application.
//!
//! A run reads a list of books from a workbook, looks each one up in the
//! Aladin catalog and in a school library's Read365 search, and writes the
//! merged results to a formatted workbook. Lookup clients live in
//! [`catalog`] and [`ownership`], the bounded fan-out in [`enrich`], sizing
//! and highlighting rules in [`layout`], spreadsheet IO under [`io`], and the
//! end-to-end flow in [`pipeline`].

pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod io;
pub mod layout;
pub mod model;
pub mod ownership;
pub mod pipeline;

pub use error::{LookupError, Result, ToolError};

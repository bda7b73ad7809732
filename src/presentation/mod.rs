//! Askama views rendered by the HTTP boundary.

pub mod views;

//! Normalize photos of handwritten whiteboard math and turn them into LaTeX.
//!
//! [`preprocessing`] holds the image pipeline; [`recognizer`] and
//! [`recognizers`] wrap the recognition engines; [`server`] exposes both
//! over HTTP.

pub mod config;
pub mod error;
pub mod preprocessing;
pub mod recognizer;
pub mod recognizers;
pub mod server;

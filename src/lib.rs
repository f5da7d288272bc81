#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod commands;
pub mod descriptor;
pub mod error;
pub mod grid;
pub mod matcher;
pub mod paths;
pub mod profile;
pub mod progress;
pub mod prompt;
pub mod render;
pub mod resolve;
pub mod units;
pub mod validators;

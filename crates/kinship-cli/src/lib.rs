//! Command-line front end for the related-items engine

pub mod cli;
pub mod commands;
pub mod output;

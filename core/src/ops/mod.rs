//! Operations performed on detected files

pub mod relocate;

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod io;
pub mod state;

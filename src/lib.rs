pub mod config;
pub mod domain;
pub mod drs;
pub mod error;
pub mod fixer;
pub mod fs_util;
pub mod header;
pub mod output;
pub mod relocate;
pub mod store;
pub mod toolkit;

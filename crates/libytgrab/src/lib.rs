//! Library of "ytgrab", contains all the logic needed for the binary

#![allow(clippy::needless_return)]
#![allow(special_module_name)] // because of module "main", dont have a better name for that
#![warn(clippy::implicit_return)]
// #![deny(missing_docs)]

#[macro_use]
extern crate log;

pub mod data;
pub mod error;
pub mod main;
pub mod spawn;
pub mod utils;
pub use error::Error;

pub use chrono;

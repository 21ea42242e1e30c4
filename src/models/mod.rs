//! Defines the data structures and models used throughout the application.
//!
//! `city` holds the produced data model handed to the presentation layer;
//! `open_meteo` mirrors the provider's JSON payloads.

mod city;
mod open_meteo;

pub use city::*;
pub use open_meteo::*;

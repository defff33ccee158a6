//! Domain types shared by the pipeline, renderer and server.

pub mod bar;

pub use bar::{Bar, PriceSeries};

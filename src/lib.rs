// src/lib.rs
//
// Crystal structure series -> sphere images -> movie.

pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod movie;
pub mod pipeline;
pub mod rendering;
pub mod rotation;
pub mod synth;
pub mod utils;

pub use error::{CifMovieError, Result};

//! Garbage category recognition served over HTTP.
//!
//! The fine-tuned network is consumed as an opaque ONNX artifact; this crate
//! owns everything around it: the class index file, image preprocessing and
//! the `/predict` endpoint.

pub mod class_index;
pub mod classifier;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod preprocess;

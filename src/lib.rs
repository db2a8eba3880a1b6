//! Local web studio for generating images with the fal FLUX models.
//!
//! A prompt (optionally with a reference image) is sent to fal, the results
//! are downloaded into month partitions on disk, and a recency-ordered
//! history feeds the gallery of the web form.

pub mod error;
pub mod fal;
pub mod history;
pub mod image;
pub mod logbook;
pub mod models;
pub mod prompts;
pub mod storage;
pub mod store;
pub mod studio;
pub mod web;

pub use error::{Error, Result};

//! Remote source access: authenticated fetches, wire shapes, normalization.

mod client;
mod error;
pub mod normalize;
mod raw;

pub use client::{RemoteClient, RemoteSource};
pub use error::ApiError;

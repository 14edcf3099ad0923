//! Estate Kit Core — domain models, repository traits, and shared
//! collaborator interfaces (cipher, metrics).

pub mod crypto;
pub mod error;
pub mod metrics;
pub mod models;
pub mod repository;

pub use error::{EstateKitError, EstateKitResult};

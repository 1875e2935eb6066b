use error::HopError;

pub mod constants;
pub mod database;
pub mod environment;
pub mod error;
pub mod package;
pub mod patch;
pub mod release;
pub mod vcs;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

pub type HopResult<T> = std::result::Result<T, HopError>;

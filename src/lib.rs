pub mod clock;
pub mod config;
pub mod data;
pub mod internal_error;
pub mod reset;
pub mod settings;
pub mod storage;
pub mod todo;
pub mod transfer;

pub use internal_error::{InternalError, InternalResult};

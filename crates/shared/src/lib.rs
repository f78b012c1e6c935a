//! Wire types shared between the dispatcher, the store and the CLI.

pub mod domain;
pub mod error;
pub mod protocol;

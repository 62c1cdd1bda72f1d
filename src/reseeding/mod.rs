//! Root generator rekeying.
//!
//! This module provides the generator the pools feed and the one-time
//! bootstrap that gives it its first key.

mod bootstrap;
mod csprng;

pub use csprng::{ChaChaRoot, RootGenerator};

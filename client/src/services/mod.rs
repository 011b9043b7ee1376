//! # Services Module
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `InstructionBuilder` | Program instructions and unsigned transactions |

pub mod transaction_builder;

pub use transaction_builder::{BuilderError, InstructionBuilder};

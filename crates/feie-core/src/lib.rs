// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feie — Core types, request recipes and error definitions shared across all
// crates.

pub mod config;
pub mod error;
pub mod fields;
pub mod recipe;
pub mod types;

pub use config::ClientConfig;
pub use error::{ErrorClass, FeieError};
pub use fields::Operation;
pub use recipe::{FormFields, OperationRequest};
pub use types::*;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feie Client — async transport for the Feie cloud printer gateway. Ties the
// request recipes from `feie-core` to the signing and verification in
// `feie-security` and sends one multipart POST per operation.

pub mod client;
pub mod logging;

pub use client::FeieClient;
pub use logging::{LOG_FILE_NAME, init_tracing};

pub use feie_core::*;
pub use feie_security::{CALLBACK_ACK, parse_callback_form};

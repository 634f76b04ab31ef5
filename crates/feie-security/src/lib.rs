// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! feie-security — the two authentication paths of the Feie gateway.
//!
//! Outbound: every request carries `sig = sha1_hex(user + ukey + stime)`,
//! computed fresh per call by [`SignedEnvelope::seal`].
//!
//! Inbound: print-result callbacks carry an RSA-SHA256 signature over
//! `orderId=..&status=..&stime=..`, checked by [`CallbackVerifier`].

pub mod callback;
pub mod signature;

pub use callback::{CALLBACK_ACK, CallbackVerifier, canonical_string, parse_callback_form};
pub use signature::{SignedEnvelope, request_signature};

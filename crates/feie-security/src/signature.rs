// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request signing: SHA-1 over `user + ukey + stime` and the signed field
// envelope sent to the gateway.

use chrono::Utc;
use feie_core::error::Result;
use feie_core::fields::{APINAME_FIELD, SIG_FIELD, STIME_FIELD, USER_FIELD};
use feie_core::{Credentials, FormFields, Operation};
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

/// Compute the gateway signature and return it as a 40-character lowercase
/// hex string.
///
/// The three inputs are concatenated without separators, in this order. The
/// gateway computes the same digest independently, so byte order and case
/// matter.
pub fn request_signature(user: &str, ukey: &str, stime: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(user.as_bytes());
    hasher.update(ukey.as_bytes());
    hasher.update(stime.as_bytes());
    hex::encode(hasher.finalize())
}

/// A fully signed request body for one gateway call.
///
/// Built fresh for every call and consumed when the form is encoded; the
/// timestamp and signature are never reused.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub user: String,
    /// Unix seconds at signing time.
    pub stime: i64,
    pub sig: String,
    pub operation: Operation,
    pub fields: FormFields,
}

impl SignedEnvelope {
    /// Sign `fields` for `operation` at the current time.
    pub fn seal_now(
        operation: Operation,
        fields: FormFields,
        credentials: &Credentials,
    ) -> Result<Self> {
        Self::seal(operation, fields, credentials, Utc::now().timestamp())
    }

    /// Sign `fields` for `operation` with an explicit timestamp.
    #[instrument(skip_all, fields(operation = %operation, user = %credentials.user, stime = stime))]
    pub fn seal(
        operation: Operation,
        fields: FormFields,
        credentials: &Credentials,
        stime: i64,
    ) -> Result<Self> {
        credentials.validate()?;

        let sig = request_signature(&credentials.user, &credentials.ukey, &stime.to_string());
        debug!(field_count = fields.len(), stime, "request envelope sealed");

        Ok(Self {
            user: credentials.user.clone(),
            stime,
            sig,
            operation,
            fields,
        })
    }

    /// Flatten into the form sent on the wire. `user`, `stime`, `sig` and
    /// `apiname` replace any caller-supplied value under the same key.
    pub fn into_form_fields(self) -> FormFields {
        let mut fields = self.fields;
        fields.insert(USER_FIELD.to_owned(), self.user);
        fields.insert(STIME_FIELD.to_owned(), self.stime.to_string());
        fields.insert(SIG_FIELD.to_owned(), self.sig);
        fields.insert(APINAME_FIELD.to_owned(), self.operation.api_name().to_owned());
        fields
    }
}

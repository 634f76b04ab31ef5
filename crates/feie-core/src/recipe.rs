// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-operation field recipes: turn a typed request into the flat form-field
// map sent to the gateway.
//
// Optional fields follow conditional-inclusion rules. The gateway treats key
// presence as significant, so an optional key is either inserted with a
// meaningful value or omitted, never sent empty.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::error::{FeieError, Result};
use crate::fields::*;
use crate::types::*;

/// Operation-specific form fields, ordered by key.
pub type FormFields = BTreeMap<String, String>;

/// A typed request for one gateway operation.
pub trait OperationRequest {
    /// Shape of the envelope's `data` on success.
    type Data: DeserializeOwned;

    /// The gateway operation this request invokes.
    fn operation(&self) -> Operation;

    /// Per-call account override.
    fn user(&self) -> Option<&str>;

    /// Operation fields, universal fields excluded. `now` is the current
    /// Unix time in seconds, used by time-relative rules.
    fn form_fields(&self, now: i64) -> Result<FormFields>;
}

// ---------------------------------------------------------------------------
// Conditional-inclusion rules
// ---------------------------------------------------------------------------

fn put(fields: &mut FormFields, key: &str, value: impl Into<String>) {
    fields.insert(key.to_owned(), value.into());
}

/// `expired` only when strictly in the future.
fn put_expired(fields: &mut FormFields, expired: Option<i64>, now: i64) {
    if let Some(expired) = expired.filter(|&at| at > now) {
        put(fields, EXPIRED_FIELD, expired.to_string());
    }
}

/// `times` only above the gateway default of one copy.
fn put_times(fields: &mut FormFields, times: u32) {
    if times > 1 {
        put(fields, TIMES_FIELD, times.to_string());
    }
}

/// `key` only when non-blank after trimming. `trim_value` sends the trimmed
/// text rather than the original.
fn put_non_blank(fields: &mut FormFields, key: &str, value: Option<&str>, trim_value: bool) {
    if let Some(value) = value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            put(fields, key, if trim_value { trimmed } else { value });
        }
    }
}

fn require_non_blank(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FeieError::InvalidRequest(format!("{name} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

impl OperationRequest for PrinterAddRequest {
    type Data = PrinterListResult;

    fn operation(&self) -> Operation {
        Operation::PrinterAddList
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        if self.printers.is_empty() {
            return Err(FeieError::InvalidRequest("no printers to add".into()));
        }
        if self.printers.len() > MAX_PRINTERS_PER_ADD {
            return Err(FeieError::InvalidRequest(format!(
                "{} printers given, at most {MAX_PRINTERS_PER_ADD} per call",
                self.printers.len()
            )));
        }
        for entry in &self.printers {
            require_non_blank("printer sn", &entry.sn)?;
            require_non_blank("printer key", &entry.key)?;
        }

        let mut fields = FormFields::new();
        put(&mut fields, PRINTER_CONTENT_FIELD, self.printer_content());
        Ok(fields)
    }
}

impl OperationRequest for PrinterDelRequest {
    type Data = PrinterListResult;

    fn operation(&self) -> Operation {
        Operation::PrinterDelList
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        let sn_list = self.sn_list();
        if sn_list.is_empty() {
            return Err(FeieError::InvalidRequest("no printers to delete".into()));
        }

        let mut fields = FormFields::new();
        put(&mut fields, SNLIST_FIELD, sn_list);
        Ok(fields)
    }
}

impl OperationRequest for PrintMsgRequest {
    /// Order id.
    type Data = String;

    fn operation(&self) -> Operation {
        Operation::PrintMsg
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, SN_FIELD, self.sn.as_str());
        put(&mut fields, CONTENT_FIELD, self.content.as_str());
        put_expired(&mut fields, self.expired, now);
        put_times(&mut fields, self.times);
        put_non_blank(&mut fields, BACKURL_FIELD, self.back_url.as_deref(), false);
        Ok(fields)
    }
}

impl OperationRequest for PrintLabelMsgRequest {
    /// Order id.
    type Data = String;

    fn operation(&self) -> Operation {
        Operation::PrintLabelMsg
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, SN_FIELD, self.sn.as_str());
        put(&mut fields, CONTENT_FIELD, self.content.as_str());
        put_expired(&mut fields, self.expired, now);
        put_times(&mut fields, self.times);
        put_non_blank(&mut fields, BACKURL_FIELD, self.back_url.as_deref(), false);
        if let Some(img) = self.img.as_deref().filter(|img| !img.is_empty()) {
            put(&mut fields, IMG_FIELD, img);
        }
        Ok(fields)
    }
}

impl OperationRequest for PrinterEditRequest {
    type Data = bool;

    fn operation(&self) -> Operation {
        Operation::PrinterEdit
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, SN_FIELD, self.sn.as_str());
        put(&mut fields, NAME_FIELD, self.name.as_str());
        put_non_blank(&mut fields, PHONENUM_FIELD, self.phone_num.as_deref(), true);
        Ok(fields)
    }
}

impl OperationRequest for DelPrinterSqsRequest {
    type Data = bool;

    fn operation(&self) -> Operation {
        Operation::DelPrinterSqs
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, SN_FIELD, self.sn.as_str());
        Ok(fields)
    }
}

impl OperationRequest for QueryOrderStateRequest {
    /// `true` once printed.
    type Data = bool;

    fn operation(&self) -> Operation {
        Operation::QueryOrderState
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, ORDERID_FIELD, self.order_id.as_str());
        Ok(fields)
    }
}

impl OperationRequest for QueryOrderInfoByDateRequest {
    type Data = OrderCounts;

    fn operation(&self) -> Operation {
        Operation::QueryOrderInfoByDate
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, SN_FIELD, self.sn.as_str());
        put(&mut fields, DATE_FIELD, self.date.format("%Y-%m-%d").to_string());
        Ok(fields)
    }
}

impl OperationRequest for QueryPrinterStatusRequest {
    type Data = PrinterStatus;

    fn operation(&self) -> Operation {
        Operation::QueryPrinterStatus
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn form_fields(&self, _now: i64) -> Result<FormFields> {
        let mut fields = FormFields::new();
        put(&mut fields, SN_FIELD, self.sn.as_str());
        Ok(fields)
    }
}

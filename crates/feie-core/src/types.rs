// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Feie printer client: account credentials, the
// typed request of every gateway operation, the response envelope, and the
// asynchronous callback records.

use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FeieError, Result};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Account identifier and shared secret (`UKEY`) issued by the vendor
/// console.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub ukey: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, ukey: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ukey: ukey.into(),
        }
    }

    /// Both fields must be non-blank before any signed call.
    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() || self.ukey.trim().is_empty() {
            return Err(FeieError::MissingCredentials);
        }
        Ok(())
    }

    /// Same key, different account identifier (per-request user override).
    pub fn with_user(&self, user: &str) -> Self {
        Self {
            user: user.to_owned(),
            ukey: self.ukey.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("ukey", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Maximum number of printers accepted by one printer-add-list call.
pub const MAX_PRINTERS_PER_ADD: usize = 100;

/// One line of the `printerContent` block:
/// `sn#key#remark#phone`, remark and phone optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterEntry {
    /// Printer serial number (printed on the device label).
    pub sn: String,
    /// Printer identification key (printed next to the serial number).
    pub key: String,
    pub remark: Option<String>,
    /// SIM card number for printers with a data plan.
    pub phone_num: Option<String>,
}

impl PrinterEntry {
    pub fn new(sn: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            key: key.into(),
            remark: None,
            phone_num: None,
        }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    pub fn with_phone_num(mut self, phone_num: impl Into<String>) -> Self {
        self.phone_num = Some(phone_num.into());
        self
    }

    /// Render the `#`-separated record. Trailing empty optional columns are
    /// dropped; an empty remark is kept as a placeholder when a phone number
    /// follows it.
    pub fn to_record(&self) -> String {
        let mut record = format!("{}#{}", self.sn.trim(), self.key.trim());
        let remark = self.remark.as_deref().map(str::trim).unwrap_or_default();
        let phone = self.phone_num.as_deref().map(str::trim).unwrap_or_default();
        if !remark.is_empty() || !phone.is_empty() {
            record.push('#');
            record.push_str(remark);
        }
        if !phone.is_empty() {
            record.push('#');
            record.push_str(phone);
        }
        record
    }
}

/// Register printers with the account (printer-add-list).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterAddRequest {
    /// Per-call account override.
    pub user: Option<String>,
    pub printers: Vec<PrinterEntry>,
}

impl PrinterAddRequest {
    pub fn new(printers: Vec<PrinterEntry>) -> Self {
        Self {
            user: None,
            printers,
        }
    }

    /// Newline-delimited `printerContent` block.
    pub fn printer_content(&self) -> String {
        self.printers
            .iter()
            .map(PrinterEntry::to_record)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Delete printers from the account (printer-del-list).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterDelRequest {
    pub user: Option<String>,
    pub sns: Vec<String>,
}

impl PrinterDelRequest {
    pub fn new<I, S>(sns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: None,
            sns: sns.into_iter().map(Into::into).collect(),
        }
    }

    /// Hyphen-joined `snlist` value.
    pub fn sn_list(&self) -> String {
        self.sns
            .iter()
            .map(|sn| sn.trim())
            .filter(|sn| !sn.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Submit a receipt print job (print-message).
///
/// `content` uses the vendor's receipt markup (`<CB>`, `<BR>`, `<QR>`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintMsgRequest {
    pub user: Option<String>,
    pub sn: String,
    pub content: String,
    /// Unix seconds after which the job is dropped if not yet printed.
    pub expired: Option<i64>,
    /// Number of copies; the gateway prints one when the field is absent.
    pub times: u32,
    /// URL receiving the asynchronous print result.
    pub back_url: Option<String>,
}

impl PrintMsgRequest {
    pub fn new(sn: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_expired(mut self, expired: i64) -> Self {
        self.expired = Some(expired);
        self
    }

    pub fn with_times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    pub fn with_back_url(mut self, back_url: impl Into<String>) -> Self {
        self.back_url = Some(back_url.into());
        self
    }
}

/// Submit a label print job (print-label-message). Label printers only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintLabelMsgRequest {
    pub user: Option<String>,
    pub sn: String,
    pub content: String,
    pub expired: Option<i64>,
    pub times: u32,
    pub back_url: Option<String>,
    /// Base64-encoded image referenced by the label markup.
    pub img: Option<String>,
}

impl PrintLabelMsgRequest {
    pub fn new(sn: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_expired(mut self, expired: i64) -> Self {
        self.expired = Some(expired);
        self
    }

    pub fn with_times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    pub fn with_back_url(mut self, back_url: impl Into<String>) -> Self {
        self.back_url = Some(back_url.into());
        self
    }

    pub fn with_img(mut self, img: impl Into<String>) -> Self {
        self.img = Some(img.into());
        self
    }
}

/// Change a printer's remark name and SIM card number (printer-edit).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterEditRequest {
    pub user: Option<String>,
    pub sn: String,
    pub name: String,
    pub phone_num: Option<String>,
}

impl PrinterEditRequest {
    pub fn new(sn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_phone_num(mut self, phone_num: impl Into<String>) -> Self {
        self.phone_num = Some(phone_num.into());
        self
    }
}

/// Clear a printer's pending queue (delete-printer-queue).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelPrinterSqsRequest {
    pub user: Option<String>,
    pub sn: String,
}

impl DelPrinterSqsRequest {
    pub fn new(sn: impl Into<String>) -> Self {
        Self {
            user: None,
            sn: sn.into(),
        }
    }
}

/// Ask whether an order has been printed (query-order-state).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOrderStateRequest {
    pub user: Option<String>,
    /// Order id returned by print-message / print-label-message.
    pub order_id: String,
}

impl QueryOrderStateRequest {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            user: None,
            order_id: order_id.into(),
        }
    }
}

/// Daily order counts for one printer (query-order-info-by-date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOrderInfoByDateRequest {
    pub user: Option<String>,
    pub sn: String,
    pub date: NaiveDate,
}

impl QueryOrderInfoByDateRequest {
    pub fn new(sn: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user: None,
            sn: sn.into(),
            date,
        }
    }
}

/// Online / health state of one printer (query-printer-status).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPrinterStatusRequest {
    pub user: Option<String>,
    pub sn: String,
}

impl QueryPrinterStatusRequest {
    pub fn new(sn: impl Into<String>) -> Self {
        Self {
            user: None,
            sn: sn.into(),
        }
    }
}

macro_rules! per_call_user {
    ($($request:ty),+ $(,)?) => {$(
        impl $request {
            /// Sign this call as `user` instead of the client's account.
            pub fn with_user(mut self, user: impl Into<String>) -> Self {
                self.user = Some(user.into());
                self
            }
        }
    )+};
}

per_call_user!(
    PrinterAddRequest,
    PrinterDelRequest,
    PrintMsgRequest,
    PrintLabelMsgRequest,
    PrinterEditRequest,
    DelPrinterSqsRequest,
    QueryOrderStateRequest,
    QueryOrderInfoByDateRequest,
    QueryPrinterStatusRequest,
);

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Envelope shared by every gateway response.
///
/// Success: `{"msg":"ok","ret":0,"data":...,"serverExecutedTime":6}`.
/// Failure: non-zero `ret`, human readable `msg`, `data` null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ret: i32,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
    /// Gateway-side execution time in milliseconds.
    #[serde(rename = "serverExecutedTime", default)]
    pub server_executed_time: i64,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.ret == 0
    }

    /// Unwrap `data`, turning a non-zero `ret` or a missing payload into
    /// [`FeieError::Vendor`].
    pub fn into_data(self) -> Result<T> {
        if self.ret != 0 {
            return Err(FeieError::Vendor {
                ret: self.ret,
                msg: self.msg,
            });
        }
        self.data.ok_or(FeieError::Vendor {
            ret: self.ret,
            msg: format!("response carried no data ({})", self.msg),
        })
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Decode a raw gateway body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Err(FeieError::EmptyResponse);
        }
        Ok(serde_json::from_slice(body)?)
    }
}

/// `data` of printer-add-list and printer-del-list: accepted and rejected
/// records, rejected ones suffixed with the vendor's reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterListResult {
    #[serde(default)]
    pub ok: Vec<String>,
    #[serde(default)]
    pub no: Vec<String>,
}

/// `data` of query-order-info-by-date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCounts {
    /// Orders already printed that day.
    pub print: i64,
    /// Orders still waiting to print.
    pub waiting: i64,
}

/// `data` of query-printer-status.
///
/// The gateway answers with one of three fixed sentences; anything else is
/// kept verbatim in [`PrinterStatus::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrinterStatus {
    /// No contact with the gateway for more than two minutes.
    Offline,
    OnlineNormal,
    /// Online but reporting a fault, usually out of paper.
    OnlineAbnormal,
    Unknown(String),
}

impl PrinterStatus {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.contains("离线") {
            Self::Offline
        } else if raw.contains("不正常") {
            Self::OnlineAbnormal
        } else if raw.contains("正常") {
            Self::OnlineNormal
        } else {
            Self::Unknown(raw.to_owned())
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::OnlineNormal | Self::OnlineAbnormal)
    }

    /// The sentence the gateway uses for this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Offline => "离线。",
            Self::OnlineNormal => "在线，工作状态正常。",
            Self::OnlineAbnormal => "在线，工作状态不正常。",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for PrinterStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<PrinterStatus> for String {
    fn from(status: PrinterStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Asynchronous callback
// ---------------------------------------------------------------------------

/// Print result pushed by the vendor to the `backurl` given at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackNotification {
    #[serde(rename = "orderId")]
    pub order_id: String,
    /// Print status code (1 = printed).
    pub status: i32,
    /// Unix seconds of the status change.
    pub stime: i64,
    /// Base64 RSA-SHA256 signature over the canonical string.
    pub sign: String,
}

/// Outcome of checking a [`CallbackNotification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub order_id: String,
    pub status: i32,
    pub stime: i64,
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_key() {
        let creds = Credentials::new("demo@example.com", "s3cr3t");
        let shown = format!("{creds:?}");
        assert!(shown.contains("demo@example.com"));
        assert!(!shown.contains("s3cr3t"));
    }

    #[test]
    fn blank_credentials_rejected() {
        assert!(Credentials::new("user", "  ").validate().is_err());
        assert!(Credentials::new("", "key").validate().is_err());
        assert!(Credentials::new("user", "key").validate().is_ok());
    }

    #[test]
    fn printer_record_layout() {
        assert_eq!(PrinterEntry::new("sn1", "key1").to_record(), "sn1#key1");
        assert_eq!(
            PrinterEntry::new("sn1", "key1").with_remark("front desk").to_record(),
            "sn1#key1#front desk"
        );
        assert_eq!(
            PrinterEntry::new("sn1", "key1")
                .with_phone_num("13688889999")
                .to_record(),
            "sn1#key1##13688889999"
        );
    }

    #[test]
    fn printer_content_is_newline_delimited() {
        let req = PrinterAddRequest::new(vec![
            PrinterEntry::new("sn1", "key1").with_remark("r1").with_phone_num("p1"),
            PrinterEntry::new("sn2", "key2"),
        ]);
        assert_eq!(req.printer_content(), "sn1#key1#r1#p1\nsn2#key2");
    }

    #[test]
    fn sn_list_is_hyphen_joined() {
        let req = PrinterDelRequest::new(["sn1", " sn2 ", "", "sn3"]);
        assert_eq!(req.sn_list(), "sn1-sn2-sn3");
    }

    #[test]
    fn decode_success_envelope() {
        let body = br#"{"msg":"ok","ret":0,"data":"816501678_20160919184316_1419533539","serverExecutedTime":6}"#;
        let resp = ApiResponse::<String>::from_slice(body).expect("decode");
        assert!(resp.is_success());
        assert_eq!(resp.server_executed_time, 6);
        assert_eq!(
            resp.into_data().expect("data"),
            "816501678_20160919184316_1419533539"
        );
    }

    #[test]
    fn decode_error_envelope_with_null_data() {
        let body = r#"{"msg":"参数错误 : 该帐号未注册.","ret":-2,"data":null,"serverExecutedTime":37}"#;
        let resp = ApiResponse::<PrinterListResult>::from_slice(body.as_bytes()).expect("decode");
        assert!(!resp.is_success());
        assert!(resp.data.is_none());
        match resp.into_data() {
            Err(FeieError::Vendor { ret, msg }) => {
                assert_eq!(ret, -2);
                assert!(msg.contains("未注册"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn decode_printer_list_result() {
        let body = r#"{"msg":"ok","ret":0,"data":{"ok":["sn#key#remark#carnum","316500011#abcdefgh#快餐前台"],"no":["316500012#abcdefgh#快餐前台#13688889999  （错误：识别码不正确）"]},"serverExecutedTime":3}"#;
        let data = ApiResponse::<PrinterListResult>::from_slice(body.as_bytes())
            .expect("decode")
            .into_data()
            .expect("data");
        assert_eq!(data.ok.len(), 2);
        assert_eq!(data.no.len(), 1);
    }

    #[test]
    fn decode_order_counts_and_bool() {
        let body = br#"{"msg":"ok","ret":0,"data":{"print":6,"waiting":1},"serverExecutedTime":9}"#;
        let counts = ApiResponse::<OrderCounts>::from_slice(body)
            .expect("decode")
            .into_data()
            .expect("data");
        assert_eq!(counts, OrderCounts { print: 6, waiting: 1 });

        let body = br#"{"msg":"ok","ret":0,"data":true,"serverExecutedTime":2}"#;
        assert!(ApiResponse::<bool>::from_slice(body).unwrap().into_data().unwrap());
    }

    #[test]
    fn empty_body_is_not_decoded() {
        assert!(matches!(
            ApiResponse::<bool>::from_slice(b""),
            Err(FeieError::EmptyResponse)
        ));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        assert!(matches!(
            ApiResponse::<bool>::from_slice(b"<html>502</html>"),
            Err(FeieError::Decode(_))
        ));
    }

    #[test]
    fn printer_status_sentences() {
        assert_eq!(PrinterStatus::parse("离线。"), PrinterStatus::Offline);
        assert_eq!(
            PrinterStatus::parse("在线，工作状态正常。"),
            PrinterStatus::OnlineNormal
        );
        assert_eq!(
            PrinterStatus::parse("在线，工作状态不正常。"),
            PrinterStatus::OnlineAbnormal
        );
        assert_eq!(
            PrinterStatus::parse("maintenance"),
            PrinterStatus::Unknown("maintenance".into())
        );
        assert!(PrinterStatus::OnlineAbnormal.is_online());
        assert!(!PrinterStatus::Offline.is_online());
    }

    #[test]
    fn printer_status_decodes_from_envelope() {
        let body = r#"{"msg":"ok","ret":0,"data":"在线，工作状态不正常。","serverExecutedTime":4}"#;
        let status = ApiResponse::<PrinterStatus>::from_slice(body.as_bytes())
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(status, PrinterStatus::OnlineAbnormal);
    }

    #[test]
    fn callback_notification_uses_vendor_field_names() {
        let json = r#"{"orderId":"ABC123","status":1,"stime":1625194910,"sign":"c2ln"}"#;
        let n: CallbackNotification = serde_json::from_str(json).unwrap();
        assert_eq!(n.order_id, "ABC123");
        assert_eq!(n.status, 1);
        assert_eq!(n.stime, 1625194910);
    }
}

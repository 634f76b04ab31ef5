// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire-level names used by the Feie open API gateway: endpoint, user agent,
// form field keys, and the `apiname` of every supported operation.
//
// Vendor documentation: http://help.feieyun.com/document.php

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default gateway accepting every signed operation.
pub const DEFAULT_GATEWAY: &str = "https://api.feieyun.cn/Api/Open/";

/// User agent sent with every gateway request unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (lanren; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/87.0.4280.67 Safari/537.36";

// -- Universal fields (present on every request) --

pub const USER_FIELD: &str = "user";
pub const STIME_FIELD: &str = "stime";
pub const SIG_FIELD: &str = "sig";
pub const APINAME_FIELD: &str = "apiname";

// -- Operation fields --

pub const SN_FIELD: &str = "sn";
pub const CONTENT_FIELD: &str = "content";
pub const EXPIRED_FIELD: &str = "expired";
pub const TIMES_FIELD: &str = "times";
pub const BACKURL_FIELD: &str = "backurl";
pub const IMG_FIELD: &str = "img";
pub const PRINTER_CONTENT_FIELD: &str = "printerContent";
pub const SNLIST_FIELD: &str = "snlist";
pub const NAME_FIELD: &str = "name";
pub const PHONENUM_FIELD: &str = "phonenum";
pub const ORDERID_FIELD: &str = "orderid";
pub const DATE_FIELD: &str = "date";

// -- Callback fields (vendor → integrator) --

pub const CALLBACK_ORDER_ID_FIELD: &str = "orderId";
pub const CALLBACK_STATUS_FIELD: &str = "status";
pub const CALLBACK_STIME_FIELD: &str = "stime";
pub const CALLBACK_SIGN_FIELD: &str = "sign";

/// Every vendor operation this client can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Register up to 100 printers.
    PrinterAddList,
    /// Delete printers by serial number.
    PrinterDelList,
    /// Submit a receipt print job.
    PrintMsg,
    /// Submit a label print job.
    PrintLabelMsg,
    /// Edit printer name / SIM card number.
    PrinterEdit,
    /// Clear the printer's pending queue.
    DelPrinterSqs,
    /// Whether an order finished printing.
    QueryOrderState,
    /// Printed / waiting counts for one printer on one day.
    QueryOrderInfoByDate,
    /// Online / health state of a printer.
    QueryPrinterStatus,
}

impl Operation {
    /// The `apiname` value identifying this operation at the gateway.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::PrinterAddList => "Open_printerAddlist",
            Self::PrinterDelList => "Open_printerDelList",
            Self::PrintMsg => "Open_printMsg",
            Self::PrintLabelMsg => "Open_printLabelMsg",
            Self::PrinterEdit => "Open_printerEdit",
            Self::DelPrinterSqs => "Open_delPrinterSqs",
            Self::QueryOrderState => "Open_queryOrderState",
            Self::QueryOrderInfoByDate => "Open_queryOrderInfoByDate",
            Self::QueryPrinterStatus => "Open_queryPrinterStatus",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

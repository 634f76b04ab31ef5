// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async gateway client.
//
// Every operation goes through the same path:
//   typed request -> recipe fields -> signed envelope -> multipart POST
//   -> raw body -> typed `ApiResponse`.
//
// The client performs exactly one HTTP exchange per call. Retries, if any,
// belong to the caller (see `FeieError::class`).

use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use reqwest::multipart::Form;
use reqwest::{Client, Url};
use tracing::{debug, info, instrument, warn};

use feie_core::error::{FeieError, Result};
use feie_core::{
    ApiResponse, CallbackNotification, ClientConfig, Credentials, DelPrinterSqsRequest,
    FormFields, Operation, OperationRequest, OrderCounts, PrintLabelMsgRequest,
    PrintMsgRequest, PrinterAddRequest, PrinterDelRequest, PrinterEditRequest,
    PrinterListResult, PrinterStatus, QueryOrderInfoByDateRequest, QueryOrderStateRequest,
    QueryPrinterStatusRequest, VerificationResult,
};
use feie_security::{CallbackVerifier, SignedEnvelope, parse_callback_form};

/// Client for the Feie cloud printer gateway.
///
/// `Send + Sync`: share it behind an `Arc` across tasks. Credentials sit
/// behind a lock and are snapshotted at the start of each call, so a
/// concurrent [`set_user_key`](Self::set_user_key) or
/// [`reset`](Self::reset) never produces a mixed key pair.
pub struct FeieClient {
    http: Client,
    gateway: Url,
    /// Credentials supplied at construction; restored by `reset`.
    defaults: Credentials,
    credentials: RwLock<Credentials>,
    verifier: Option<CallbackVerifier>,
}

impl std::fmt::Debug for FeieClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeieClient")
            .field("gateway", &self.gateway.as_str())
            .field("credentials", &self.credentials())
            .field("callback_verification", &self.verifier.is_some())
            .finish()
    }
}

impl FeieClient {
    /// Build a client from `config`.
    ///
    /// Fails with [`FeieError::Config`] for an unusable gateway URL or a zero
    /// timeout and with [`FeieError::Key`] when a public key is configured but
    /// cannot be parsed. Credentials are not checked here; they may be supplied later
    /// through `set_user_key` or per-request overrides.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let gateway = Url::parse(config.gateway.trim())
            .map_err(|e| FeieError::Config(format!("gateway '{}': {e}", config.gateway)))?;
        if !matches!(gateway.scheme(), "http" | "https") {
            return Err(FeieError::Config(format!(
                "gateway '{gateway}' must use http or https"
            )));
        }

        if config.timeout().is_zero() {
            return Err(FeieError::Config("connect timeout must be non-zero".into()));
        }
        if config.request_timeout().is_some_and(|t| t.is_zero()) {
            return Err(FeieError::Config("request timeout must be non-zero".into()));
        }

        let verifier = match config.public_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(CallbackVerifier::from_public_key(key)?),
            _ => None,
        };

        let mut builder = Client::builder()
            .connect_timeout(config.timeout())
            .user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| FeieError::Config(format!("HTTP client: {e}")))?;

        let defaults = config.credentials();
        info!(
            gateway = %gateway,
            user = %defaults.user,
            callback_verification = verifier.is_some(),
            "feie client ready"
        );

        Ok(Self {
            http,
            gateway,
            credentials: RwLock::new(defaults.clone()),
            defaults,
            verifier,
        })
    }

    /// Shorthand for `FeieClient::new(ClientConfig::from_env())`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn gateway(&self) -> &Url {
        &self.gateway
    }

    /// Snapshot of the credentials the next call will sign with.
    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the shared secret. The account identifier is kept.
    pub fn set_user_key(&self, ukey: impl Into<String>) {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.ukey = ukey.into();
        debug!(user = %guard.user, "ukey replaced");
    }

    /// Replace both the account identifier and the shared secret atomically.
    pub fn set_credentials(&self, credentials: Credentials) {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(user = %credentials.user, "credentials replaced");
        *guard = credentials;
    }

    /// Restore the credentials given at construction. Blank construction
    /// values leave the current ones in place.
    pub fn reset(&self) {
        let mut guard = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.defaults.user.trim().is_empty() {
            guard.user = self.defaults.user.clone();
        }
        if !self.defaults.ukey.trim().is_empty() {
            guard.ukey = self.defaults.ukey.clone();
        }
        debug!(user = %guard.user, "credentials reset");
    }

    /// Credentials for one call: the current snapshot, with the account
    /// identifier swapped when the request overrides it.
    fn credentials_for(&self, user_override: Option<&str>) -> Credentials {
        let current = self.credentials();
        match user_override.map(str::trim) {
            Some(user) if !user.is_empty() => current.with_user(user),
            _ => current,
        }
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Sign `operation_fields` for `operation`, POST them, and return the raw body.
    ///
    /// A zero-length body is [`FeieError::EmptyResponse`]. A non-2xx status
    /// is logged but the body is still returned; the gateway reports
    /// failures inside the JSON envelope.
    #[instrument(skip(self, operation_fields), fields(gateway = %self.gateway))]
    pub async fn call_raw(
        &self,
        operation: Operation,
        operation_fields: FormFields,
        user_override: Option<&str>,
    ) -> Result<Vec<u8>> {
        let credentials = self.credentials_for(user_override);
        let envelope = SignedEnvelope::seal_now(operation, operation_fields, &credentials)?;
        let form = envelope
            .into_form_fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        debug!("sending gateway request");
        let response = self
            .http
            .post(self.gateway.clone())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "gateway answered with non-success status");
        }

        let body = response.bytes().await.map_err(transport_error)?;
        if body.is_empty() {
            warn!(status = status.as_u16(), "gateway returned an empty body");
            return Err(FeieError::EmptyResponse);
        }

        debug!(status = status.as_u16(), bytes = body.len(), "gateway response received");
        Ok(body.to_vec())
    }

    /// Run any typed request and decode the vendor envelope.
    ///
    /// Request validation happens before any network I/O. A non-zero `ret`
    /// is returned as-is; call [`ApiResponse::into_data`] to turn it into an
    /// error.
    #[instrument(skip_all, fields(operation = %request.operation()))]
    pub async fn execute<R: OperationRequest>(&self, request: &R) -> Result<ApiResponse<R::Data>> {
        let fields = request.form_fields(Utc::now().timestamp())?;
        let body = self
            .call_raw(request.operation(), fields, request.user())
            .await?;
        let response = ApiResponse::<R::Data>::from_slice(&body)?;

        if response.is_success() {
            debug!(
                server_ms = response.server_executed_time,
                "operation succeeded"
            );
        } else {
            warn!(ret = response.ret, msg = %response.msg, "vendor rejected operation");
        }
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Register up to 100 printers (`Open_printerAddlist`).
    pub async fn printer_add_list(
        &self,
        request: &PrinterAddRequest,
    ) -> Result<ApiResponse<PrinterListResult>> {
        self.execute(request).await
    }

    /// Remove printers by serial number (`Open_printerDelList`).
    pub async fn printer_del_list(
        &self,
        request: &PrinterDelRequest,
    ) -> Result<ApiResponse<PrinterListResult>> {
        self.execute(request).await
    }

    /// Submit a receipt print job (`Open_printMsg`). `data` is the order id.
    pub async fn print_msg(&self, request: &PrintMsgRequest) -> Result<ApiResponse<String>> {
        self.execute(request).await
    }

    /// Submit a label print job (`Open_printLabelMsg`). `data` is the order id.
    pub async fn print_label_msg(
        &self,
        request: &PrintLabelMsgRequest,
    ) -> Result<ApiResponse<String>> {
        self.execute(request).await
    }

    /// Rename a printer and update its SIM number (`Open_printerEdit`).
    pub async fn printer_edit(&self, request: &PrinterEditRequest) -> Result<ApiResponse<bool>> {
        self.execute(request).await
    }

    /// Clear a printer's pending queue (`Open_delPrinterSqs`).
    pub async fn del_printer_sqs(
        &self,
        request: &DelPrinterSqsRequest,
    ) -> Result<ApiResponse<bool>> {
        self.execute(request).await
    }

    /// Whether an order has been printed (`Open_queryOrderState`).
    pub async fn query_order_state(
        &self,
        request: &QueryOrderStateRequest,
    ) -> Result<ApiResponse<bool>> {
        self.execute(request).await
    }

    /// Printed and waiting order counts for one day (`Open_queryOrderInfoByDate`).
    pub async fn query_order_info_by_date(
        &self,
        request: &QueryOrderInfoByDateRequest,
    ) -> Result<ApiResponse<OrderCounts>> {
        self.execute(request).await
    }

    /// Online/paper state of one printer (`Open_queryPrinterStatus`).
    pub async fn query_printer_status(
        &self,
        request: &QueryPrinterStatusRequest,
    ) -> Result<ApiResponse<PrinterStatus>> {
        self.execute(request).await
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    /// Verify a print-result callback against the configured vendor key.
    ///
    /// A bad signature is `Ok` with `verified == false`; only a missing key
    /// is an error.
    pub fn verify_callback(&self, notification: &CallbackNotification) -> Result<VerificationResult> {
        let verifier = self.verifier.as_ref().ok_or_else(|| {
            FeieError::Key("no vendor public key configured for callback verification".into())
        })?;
        Ok(verifier.verify(notification))
    }

    /// Decode a form-encoded callback body and verify it.
    pub fn verify_callback_form(&self, body: &str) -> Result<VerificationResult> {
        let notification = parse_callback_form(body)?;
        self.verify_callback(&notification)
    }
}

fn transport_error(err: reqwest::Error) -> FeieError {
    if err.is_timeout() {
        FeieError::Transport(format!("timed out: {err}"))
    } else {
        FeieError::Transport(err.to_string())
    }
}

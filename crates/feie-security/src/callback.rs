// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Callback verification: RSA PKCS#1 v1.5 / SHA-256 signatures on the
// asynchronous print results pushed by the vendor.
//
// The vendor POSTs `orderId`, `status`, `stime` and `sign` as
// application/x-www-form-urlencoded to the `backurl` given at submission. The
// signed string is the non-empty fields except `sign`, sorted by key, joined
// as `key=value` with `&`. For this fixed field set that is always
// `orderId=..&status=..&stime=..`.
//
// The handler must answer `SUCCESS` within 5 seconds or the vendor redelivers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use feie_core::error::{FeieError, Result};
use feie_core::fields::{CALLBACK_ORDER_ID_FIELD, CALLBACK_STATUS_FIELD, CALLBACK_STIME_FIELD};
use feie_core::{CallbackNotification, VerificationResult};
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha2::Sha256;
use tracing::{debug, instrument, warn};

/// Body the callback handler must return once a notification is accepted.
pub const CALLBACK_ACK: &str = "SUCCESS";

/// The string the vendor signs for a notification.
pub fn canonical_string(order_id: &str, status: i32, stime: i64) -> String {
    format!(
        "{CALLBACK_ORDER_ID_FIELD}={order_id}&{CALLBACK_STATUS_FIELD}={status}&{CALLBACK_STIME_FIELD}={stime}"
    )
}

/// Decode an `application/x-www-form-urlencoded` callback body.
///
/// Form decoding turns an unescaped `+` into a space; base64 never contains
/// spaces, so they are mapped back in `sign`.
pub fn parse_callback_form(body: &str) -> Result<CallbackNotification> {
    let mut notification: CallbackNotification = serde_urlencoded::from_str(body)
        .map_err(|e| FeieError::InvalidCallback(e.to_string()))?;
    notification.sign = notification.sign.trim().replace(' ', "+");
    Ok(notification)
}

/// Verifies callback notifications against the vendor's RSA public key.
///
/// Parsing the key is the only fallible step. Verification itself never
/// errors: a bad or garbled signature is a negative result.
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    key: VerifyingKey<Sha256>,
}

impl CallbackVerifier {
    /// Load the vendor public key.
    ///
    /// Accepts PEM (`BEGIN PUBLIC KEY` or `BEGIN RSA PUBLIC KEY`) or the bare
    /// base64 DER body handed out by the vendor console (SPKI or PKCS#1).
    pub fn from_public_key(encoded: &str) -> Result<Self> {
        let public_key = parse_public_key(encoded)?;
        Ok(Self {
            key: VerifyingKey::<Sha256>::new(public_key),
        })
    }

    /// Check one notification and echo its fields back.
    #[instrument(skip_all, fields(order_id = %notification.order_id, status = notification.status))]
    pub fn verify(&self, notification: &CallbackNotification) -> VerificationResult {
        let message = canonical_string(
            &notification.order_id,
            notification.status,
            notification.stime,
        );
        let verified = self.verify_message(message.as_bytes(), &notification.sign);

        if verified {
            debug!("callback signature verified");
        } else {
            warn!("callback signature rejected");
        }

        VerificationResult {
            order_id: notification.order_id.clone(),
            status: notification.status,
            stime: notification.stime,
            verified,
        }
    }

    /// Verify a base64 signature over arbitrary bytes.
    pub fn verify_message(&self, message: &[u8], sign_b64: &str) -> bool {
        let Ok(raw) = STANDARD.decode(sign_b64.trim()) else {
            debug!("callback signature is not valid base64");
            return false;
        };
        let Ok(signature) = Signature::try_from(raw.as_slice()) else {
            return false;
        };
        self.key.verify(message, &signature).is_ok()
    }
}

fn parse_public_key(encoded: &str) -> Result<RsaPublicKey> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(FeieError::Key("public key is empty".into()));
    }

    if trimmed.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        return RsaPublicKey::from_pkcs1_pem(trimmed)
            .map_err(|e| FeieError::Key(format!("PKCS#1 PEM: {e}")));
    }
    if trimmed.starts_with("-----BEGIN") {
        return RsaPublicKey::from_public_key_pem(trimmed)
            .map_err(|e| FeieError::Key(format!("SPKI PEM: {e}")));
    }

    let compact: String = trimmed.split_whitespace().collect();
    let der = STANDARD
        .decode(compact)
        .map_err(|e| FeieError::Key(format!("base64 key body: {e}")))?;

    RsaPublicKey::from_public_key_der(&der).or_else(|spki_err| {
        RsaPublicKey::from_pkcs1_der(&der).map_err(|pkcs1_err| {
            FeieError::Key(format!("DER is neither SPKI ({spki_err}) nor PKCS#1 ({pkcs1_err})"))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use std::sync::LazyLock;

    const VENDOR_PRIVATE_PEM: &str = include_str!("../testdata/vendor_private.pem");
    const VENDOR_PUBLIC_PEM: &str = include_str!("../testdata/vendor_public.pem");
    const VENDOR_PUBLIC_PKCS1_PEM: &str = include_str!("../testdata/vendor_public_pkcs1.pem");
    const VENDOR_PUBLIC_B64: &str = include_str!("../testdata/vendor_public.b64");
    const OTHER_PUBLIC_PEM: &str = include_str!("../testdata/other_public.pem");

    /// `openssl dgst -sha256 -sign vendor_private.pem` over
    /// `orderId=ABC123&status=1&stime=1625194910`.
    const ABC123_SIGN: &str = "dot8zssJm1siHGo5F63C8L0droY/KvBn1LRC+uzJ7GJdszAjqNtAAeDsZ7zuSChqoyPy7E5xDdRgCrabh7gfgQlLbKx8HcucbNNrv4ulXTAt2SDGJsW8QP+34aNFOrXlDyKglQBuH8otlO9QjHh9P3nqvY7QNEnRWneNSzJ9QzKOsb+KdIVLRIKzMxcLexCknxFVqA0FKo+Uv0VFW5IZbfNf4CJQgxGFaoGrn5TL1WLztmj/vAwy/eVmZz3fzdwPMysHnAxEnqCH0bBoREPrzGX4RLemqRXbDgXaq29CRO2ls+s9imKTSPh0OtYRHF45A7UhAmsnEzWD5Slw89NiWg==";

    static SIGNER: LazyLock<SigningKey<Sha256>> = LazyLock::new(|| {
        let key = RsaPrivateKey::from_pkcs8_pem(VENDOR_PRIVATE_PEM).expect("test private key");
        SigningKey::<Sha256>::new(key)
    });

    fn vendor_verifier() -> CallbackVerifier {
        CallbackVerifier::from_public_key(VENDOR_PUBLIC_PEM).expect("vendor key")
    }

    fn sign(message: &str) -> String {
        STANDARD.encode(SIGNER.sign(message.as_bytes()).to_vec())
    }

    fn abc123() -> CallbackNotification {
        CallbackNotification {
            order_id: "ABC123".into(),
            status: 1,
            stime: 1625194910,
            sign: ABC123_SIGN.into(),
        }
    }

    #[test]
    fn canonical_string_field_order() {
        assert_eq!(
            canonical_string("816501678_20160919184316_1419533539", 1, 1625194910),
            "orderId=816501678_20160919184316_1419533539&status=1&stime=1625194910"
        );
    }

    #[test]
    fn known_signature_verifies_with_vendor_key() {
        let result = vendor_verifier().verify(&abc123());
        assert!(result.verified);
        assert_eq!(result.order_id, "ABC123");
        assert_eq!(result.status, 1);
        assert_eq!(result.stime, 1625194910);
    }

    #[test]
    fn known_signature_fails_with_other_key() {
        let verifier = CallbackVerifier::from_public_key(OTHER_PUBLIC_PEM).expect("other key");
        assert!(!verifier.verify(&abc123()).verified);
    }

    #[test]
    fn all_key_encodings_load() {
        for encoded in [VENDOR_PUBLIC_PEM, VENDOR_PUBLIC_PKCS1_PEM, VENDOR_PUBLIC_B64] {
            let verifier = CallbackVerifier::from_public_key(encoded).expect("key encoding");
            assert!(verifier.verify(&abc123()).verified);
        }
    }

    #[test]
    fn malformed_keys_are_key_errors() {
        for encoded in [
            "",
            "   ",
            "not base64 at all!",
            "aGVsbG8gd29ybGQ=",
            "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----",
        ] {
            assert!(
                matches!(
                    CallbackVerifier::from_public_key(encoded),
                    Err(FeieError::Key(_))
                ),
                "accepted {encoded:?}"
            );
        }
    }

    #[test]
    fn garbled_signature_is_negative_not_error() {
        let verifier = vendor_verifier();
        for sign in ["", "%%%not-base64%%%", "c2hvcnQ=", "===="] {
            let mut n = abc123();
            n.sign = sign.into();
            assert!(!verifier.verify(&n).verified, "accepted {sign:?}");
        }
    }

    #[test]
    fn form_body_round_trips_plus_signs() {
        // Unescaped '+' in the sign arrives as ' ' after form decoding.
        let body = format!("orderId=ABC123&status=1&stime=1625194910&sign={ABC123_SIGN}");
        let n = parse_callback_form(&body).expect("parse");
        assert_eq!(n.sign, ABC123_SIGN);
        assert!(vendor_verifier().verify(&n).verified);
    }

    #[test]
    fn form_body_with_escaped_sign() {
        let escaped = ABC123_SIGN
            .replace('+', "%2B")
            .replace('/', "%2F")
            .replace('=', "%3D");
        let body = format!("stime=1625194910&sign={escaped}&status=1&orderId=ABC123");
        let n = parse_callback_form(&body).expect("parse");
        assert_eq!(n, abc123());
    }

    #[test]
    fn malformed_form_is_rejected() {
        assert!(matches!(
            parse_callback_form("orderId=ABC123&status=one&stime=1&sign=x"),
            Err(FeieError::InvalidCallback(_))
        ));
        assert!(matches!(
            parse_callback_form("orderId=ABC123&status=1"),
            Err(FeieError::InvalidCallback(_))
        ));
    }

    fn tweak(s: &str, index: usize) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        let i = index % chars.len();
        chars[i] = if chars[i] == '7' { '8' } else { '7' };
        chars.into_iter().collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn fresh_signatures_verify(
            order_id in "[0-9]{9}_[0-9]{14}_[0-9]{10}",
            status in 0i32..3,
            stime in 1_600_000_000i64..2_000_000_000,
        ) {
            let sign = sign(&canonical_string(&order_id, status, stime));
            let n = CallbackNotification { order_id, status, stime, sign };
            prop_assert!(vendor_verifier().verify(&n).verified);
        }
    }

    proptest! {
        #[test]
        fn any_single_tamper_is_rejected(index in 0usize..512, byte_flip in 1u8..=255) {
            let verifier = vendor_verifier();

            let mut n = abc123();
            n.order_id = tweak(&n.order_id, index);
            prop_assert!(!verifier.verify(&n).verified);

            let mut n = abc123();
            n.status = tweak(&n.status.to_string(), index).parse().unwrap();
            prop_assert!(!verifier.verify(&n).verified);

            let mut n = abc123();
            n.stime = tweak(&n.stime.to_string(), index).parse().unwrap();
            prop_assert!(!verifier.verify(&n).verified);

            let mut raw = STANDARD.decode(ABC123_SIGN).unwrap();
            let i = index % raw.len();
            raw[i] ^= byte_flip;
            let mut n = abc123();
            n.sign = STANDARD.encode(raw);
            prop_assert!(!verifier.verify(&n).verified);
        }
    }
}

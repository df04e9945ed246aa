//! Payment processor clients.
//!
//! Stripe, PayPal and Yookassa are stubbed: every charge "succeeds" and gets
//! fabricated processor references, mirroring what the real integrations
//! would return. The reqwest client is the seam where live API calls would
//! go.

mod error;
pub use error::{PaymentError, PaymentResult};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{self, RngCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Stripe,
    Paypal,
    Yookassa,
    BankTransfer,
}

impl ProcessorKind {
    pub fn parse(value: &str) -> PaymentResult<Self> {
        match value {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            "yookassa" => Ok(Self::Yookassa),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(PaymentError::UnsupportedProcessor(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
            Self::Yookassa => "yookassa",
            Self::BankTransfer => "bank_transfer",
        };
        write!(f, "{s}")
    }
}

/// What a processor hands back for one charge. Only the fields for the
/// chosen processor are set; everything lands in the payment row as-is.
#[derive(Debug, Clone)]
pub struct ProcessorCharge {
    pub transaction_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_client_secret: Option<String>,
    pub paypal_order_id: Option<String>,
    pub yookassa_payment_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    #[allow(unused)] // the live integrations would go through this client
    http: reqwest::Client,
}

impl Default for PaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentProcessor {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Runs the charge against the given processor. Amount and currency are
    /// what a live call would send; the stubs only fabricate references.
    pub async fn charge(
        &self,
        kind: ProcessorKind,
        _amount_cents: i64,
        _currency: &str,
    ) -> PaymentResult<ProcessorCharge> {
        let charge = match kind {
            ProcessorKind::Stripe => ProcessorCharge {
                transaction_id: opaque_id("txn"),
                stripe_payment_intent_id: Some(opaque_id("pi")),
                stripe_client_secret: Some(opaque_id("pi_secret")),
                paypal_order_id: None,
                yookassa_payment_id: None,
            },
            ProcessorKind::Paypal => ProcessorCharge {
                transaction_id: opaque_id("txn"),
                stripe_payment_intent_id: None,
                stripe_client_secret: None,
                paypal_order_id: Some(opaque_id("pp")),
                yookassa_payment_id: None,
            },
            ProcessorKind::Yookassa => ProcessorCharge {
                transaction_id: opaque_id("txn"),
                stripe_payment_intent_id: None,
                stripe_client_secret: None,
                paypal_order_id: None,
                yookassa_payment_id: Some(opaque_id("yk")),
            },
            // bank transfers settle out of band; only the reference exists
            ProcessorKind::BankTransfer => ProcessorCharge {
                transaction_id: opaque_id("txn"),
                stripe_payment_intent_id: None,
                stripe_client_secret: None,
                paypal_order_id: None,
                yookassa_payment_id: None,
            },
        };
        Ok(charge)
    }
}

fn opaque_id(prefix: &str) -> String {
    let mut buf = [0u8; 18];
    rand::rng().fill_bytes(&mut buf);
    format!("{prefix}_{}", URL_SAFE_NO_PAD.encode(buf))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn every_processor_returns_its_own_references() {
        let processor = PaymentProcessor::new();

        let stripe = processor
            .charge(ProcessorKind::Stripe, 10_000, "RUB")
            .await
            .unwrap();
        assert!(stripe.stripe_payment_intent_id.is_some());
        assert!(stripe.paypal_order_id.is_none());

        let paypal = processor
            .charge(ProcessorKind::Paypal, 10_000, "RUB")
            .await
            .unwrap();
        assert!(paypal.paypal_order_id.is_some());
        assert!(paypal.stripe_payment_intent_id.is_none());

        let yookassa = processor
            .charge(ProcessorKind::Yookassa, 10_000, "RUB")
            .await
            .unwrap();
        assert!(yookassa.yookassa_payment_id.is_some());
    }

    #[test]
    fn unknown_processor_kind_is_rejected() {
        assert!(matches!(
            ProcessorKind::parse("sberbank"),
            Err(PaymentError::UnsupportedProcessor(_))
        ));
        assert!(ProcessorKind::parse("stripe").is_ok());
    }

    #[test]
    fn opaque_ids_carry_the_prefix_and_differ() {
        let a = opaque_id("pi");
        let b = opaque_id("pi");
        assert!(a.starts_with("pi_"));
        assert_ne!(a, b);
    }
}

use thiserror::Error;

pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("unsupported payment processor: {0}")]
    UnsupportedProcessor(String),
    #[error("payment method is not active")]
    MethodInactive,
    #[error("course is free, nothing to pay for")]
    NothingToPay,
    #[error("course is already purchased")]
    AlreadyPurchased,
    #[error("promo code is not valid: {0}")]
    PromoCodeInvalid(String),
    #[error("purchase is not payable in its `{0}` state")]
    NotPayable(String),
    #[error("processor request failed: {0}")]
    ProcessorError(#[from] reqwest::Error),
}

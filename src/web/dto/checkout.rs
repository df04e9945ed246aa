use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Payment, Purchase};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckoutRequest {
    pub course_id: Uuid,
    pub promo_code: Option<String>,
    pub payment_method_id: Option<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PayResponse {
    pub purchase: Purchase,
    pub payment: Payment,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RefundRequestBody {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RefundRejectBody {
    #[serde(default)]
    pub rejection_reason: String,
}

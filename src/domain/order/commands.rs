use crate::domain::catalog::ProductId;
use crate::domain::user::UserId;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// One requested line: the quantity wanted and the unit price the caller
/// saw. The engine trusts this price rather than re-deriving it from the
/// catalog; see the note on the price trust boundary in `engine`.
#[derive(Debug, Clone)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// Requester resolved from the session token; `None` when the token
    /// did not yield an identity.
    pub requester: Option<UserId>,
    pub receiver_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub voucher_code: Option<String>,
    pub payment_method: String,
    pub lines: Vec<LineRequest>,
}

use std::sync::Arc;

use super::mailer::{EmailClient, EmailMessage};
use crate::domain::order::{OrderId, OrderStatus};
use crate::domain::user::UserId;
use crate::domain::voucher::Voucher;
use crate::store::UserStore;

// ============================================================================
// Notifier - Renders and Dispatches Customer Emails
// ============================================================================
//
// Every method here swallows its own failures: a missing email address, a
// store hiccup, or a dead relay is logged and dropped. The order workflow
// that triggered the notification has already committed.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub receiver_name: String,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub payment_method: String,
    pub reward: Option<Voucher>,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub receiver_name: String,
    pub status: OrderStatus,
}

#[derive(Clone)]
pub struct Notifier {
    users: Arc<dyn UserStore>,
    email: EmailClient,
}

impl Notifier {
    pub fn new(users: Arc<dyn UserStore>, email: EmailClient) -> Self {
        Self { users, email }
    }

    pub async fn order_confirmed(&self, confirmation: OrderConfirmation) {
        let Some(to) = self.email_for(confirmation.user_id).await else {
            return;
        };

        let message = EmailMessage {
            to,
            subject: "Order confirmation & your gift from Clothing Shop".to_string(),
            html_body: render_confirmation(&confirmation),
        };

        if let Err(e) = self.email.send(message).await {
            tracing::warn!(
                order_id = confirmation.order_id,
                error = %e,
                "Order confirmation email dropped"
            );
        }
    }

    pub async fn status_changed(&self, change: StatusChange) {
        let Some(to) = self.email_for(change.user_id).await else {
            return;
        };

        let message = EmailMessage {
            to,
            subject: format!("Order #{} updated", change.order_id),
            html_body: render_status_change(&change),
        };

        if let Err(e) = self.email.send(message).await {
            tracing::warn!(
                order_id = change.order_id,
                error = %e,
                "Status change email dropped"
            );
        }
    }

    async fn email_for(&self, user_id: UserId) -> Option<String> {
        match self.users.user(user_id).await {
            Ok(Some(user)) => match user.email {
                Some(email) if !email.is_empty() => Some(email),
                _ => {
                    tracing::debug!(%user_id, "User has no email address, skipping notification");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(%user_id, "User not found, skipping notification");
                None
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "User lookup failed, skipping notification");
                None
            }
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

fn render_confirmation(c: &OrderConfirmation) -> String {
    let mut body = format!(
        "<h3>🛍️ Thank you for your order at Clothing Shop</h3>\
         <p>Hello <b>{name}</b>,</p>\
         <p>Your order has been placed. Order number: <b>#{id}</b></p>\
         <p>Status: <b>{status}</b></p>\
         <p>Total: <b>{total} VND</b></p>\
         <p>Payment method: {payment}</p>",
        name = c.receiver_name,
        id = c.order_id,
        status = c.status.label(),
        total = format_amount(c.total_amount),
        payment = c.payment_method,
    );

    if let Some(reward) = &c.reward {
        body.push_str(&format!(
            "<hr/><h4>🎁 A little gift:</h4>\
             <p>Use code <b style='color:green'>{code}</b> for <b>{percent}%</b> off your next order.</p>\
             <p>Valid until: <b>{expiry}</b></p>",
            code = reward.code,
            percent = reward.discount_percent,
            expiry = reward.expires_at.format("%d/%m/%Y"),
        ));
    }

    body.push_str("<br/><i>We will process your order shortly. Thank you!</i>");
    body
}

fn render_status_change(c: &StatusChange) -> String {
    format!(
        "<h3>📦 Order #{id} update</h3>\
         <p>Hello <b>{name}</b>,</p>\
         <p>Your order status is now:</p>\
         <p><b style='color:#2c3e50'>{status}</b></p>\
         <br/><i>Thank you for shopping at Clothing Shop.</i>",
        id = c.order_id,
        name = c.receiver_name,
        status = c.status.label(),
    )
}

/// Group an amount in minor units with thousands separators.
fn format_amount(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(180_000), "180,000");
        assert_eq!(format_amount(1_234_567), "1,234,567");
        assert_eq!(format_amount(-50_000), "-50,000");
    }

    #[test]
    fn test_confirmation_mentions_reward_code() {
        let reward = Voucher {
            code: "SALEAB12CD".to_string(),
            discount_percent: 10,
            expires_at: Utc::now() + Duration::days(30),
        };
        let body = render_confirmation(&OrderConfirmation {
            user_id: Uuid::new_v4(),
            order_id: 7,
            receiver_name: "An".to_string(),
            status: OrderStatus::Pending,
            total_amount: 180_000,
            payment_method: "COD".to_string(),
            reward: Some(reward),
        });

        assert!(body.contains("#7"));
        assert!(body.contains("SALEAB12CD"));
        assert!(body.contains("180,000"));
        assert!(body.contains(OrderStatus::Pending.label()));
    }

    #[test]
    fn test_confirmation_without_reward_omits_gift_block() {
        let body = render_confirmation(&OrderConfirmation {
            user_id: Uuid::new_v4(),
            order_id: 8,
            receiver_name: "An".to_string(),
            status: OrderStatus::Pending,
            total_amount: 99_000,
            payment_method: "COD".to_string(),
            reward: None,
        });
        assert!(!body.contains("gift"));
    }

    #[test]
    fn test_status_change_uses_label() {
        let body = render_status_change(&StatusChange {
            user_id: Uuid::new_v4(),
            order_id: 9,
            receiver_name: "An".to_string(),
            status: OrderStatus::Cancelled,
        });
        assert!(body.contains(OrderStatus::Cancelled.label()));
    }
}

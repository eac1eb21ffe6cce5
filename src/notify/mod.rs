// ============================================================================
// Notifications - Email Collaborator Boundary
// ============================================================================
//
// Delivery is best-effort from the core's perspective: the engine spawns a
// notification and moves on. Nothing in this module can fail an order.
//
// ============================================================================

pub mod mailer;
pub mod notifier;

pub use mailer::{EmailClient, EmailMessage, LogMailer, Mailer};
pub use notifier::{Notifier, OrderConfirmation, StatusChange};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// Vouchers - Discount Codes
// ============================================================================
//
// A voucher plays two roles:
// - redeemed: supplied by the customer at order time, matched
//   case-insensitively and honoured only while unexpired
// - reward: minted as a side effect of every successful order
//
// Redeeming does not consume the code; expiry is the only cutoff.
//
// ============================================================================

/// Prefix for reward voucher codes, followed by a random suffix.
pub const REWARD_CODE_PREFIX: &str = "SALE";
/// Discount granted by every reward voucher.
pub const REWARD_DISCOUNT_PERCENT: i32 = 10;
/// Reward vouchers stay redeemable this many days after minting.
pub const REWARD_VALID_DAYS: i64 = 30;

const CODE_SUFFIX_LEN: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Voucher {
    pub code: String,
    pub discount_percent: i32,
    pub expires_at: DateTime<Utc>,
}

impl Voucher {
    /// Mint a reward voucher: fixed prefix, 6 random uppercase
    /// alphanumerics, 10 percent, 30 days from `now`.
    pub fn mint_reward(now: DateTime<Utc>) -> Self {
        let mut rng = rand::rng();
        let mut code = String::with_capacity(REWARD_CODE_PREFIX.len() + CODE_SUFFIX_LEN);
        code.push_str(REWARD_CODE_PREFIX);
        for _ in 0..CODE_SUFFIX_LEN {
            let idx = rng.random_range(0..CODE_CHARSET.len());
            code.push(CODE_CHARSET[idx] as char);
        }

        Self {
            code,
            discount_percent: REWARD_DISCOUNT_PERCENT,
            expires_at: now + Duration::days(REWARD_VALID_DAYS),
        }
    }

    /// A voucher is redeemable strictly before its expiry instant.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_code_shape() {
        let voucher = Voucher::mint_reward(Utc::now());

        assert!(voucher.code.starts_with(REWARD_CODE_PREFIX));
        let suffix = &voucher.code[REWARD_CODE_PREFIX.len()..];
        assert_eq!(suffix.len(), CODE_SUFFIX_LEN);
        assert!(suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_reward_terms() {
        let now = Utc::now();
        let voucher = Voucher::mint_reward(now);

        assert_eq!(voucher.discount_percent, REWARD_DISCOUNT_PERCENT);
        assert_eq!(voucher.expires_at, now + Duration::days(REWARD_VALID_DAYS));
        assert!(voucher.is_redeemable(now));
    }

    #[test]
    fn test_expired_voucher_is_not_redeemable() {
        let now = Utc::now();
        let voucher = Voucher {
            code: "SALEAAAAAA".to_string(),
            discount_percent: 20,
            expires_at: now - Duration::days(1),
        };

        assert!(!voucher.is_redeemable(now));
        // Expiring exactly now is also too late: redemption needs a
        // strictly future expiry.
        let boundary = Voucher {
            expires_at: now,
            ..voucher
        };
        assert!(!boundary.is_redeemable(now));
    }

    #[test]
    fn test_minted_codes_vary() {
        let now = Utc::now();
        let a = Voucher::mint_reward(now);
        let b = Voucher::mint_reward(now);
        // 36^6 combinations; a collision here would point at a broken RNG.
        assert_ne!(a.code, b.code);
    }
}

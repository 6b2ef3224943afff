//! Payment discovery (recipient scan).
//!
//! Trial decryption of a single announcement:
//!
//! ```text
//! for E in candidates(pkx):                 even y, then odd y
//!     r = decrypt(viewing_sk, E, ciphertext)   (skip on failure)
//!     if address(spending_pk · r) == receiver: return ForUser(r)
//! return NotForUser
//! ```

use subtle::ConstantTimeEq;
use tracing::{debug, trace};

use shroud_core::error::{Result, ShroudError};
use shroud_core::types::Announcement;
use shroud_crypto::{candidates_from_x, EncryptedPayload, KeyPair, RandomNumber};

use crate::keys::StealthKeys;

/// Result of scanning a single announcement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanResult {
    /// The announcement belongs to someone else
    NotForUser,
    /// The announcement is ours; carries the decrypted random number
    ForUser(RandomNumber),
}

impl ScanResult {
    /// Returns true if the announcement is for this recipient.
    pub fn is_for_user(&self) -> bool {
        matches!(self, ScanResult::ForUser(_))
    }

    /// Returns the random number if present.
    pub fn into_random_number(self) -> Option<RandomNumber> {
        match self {
            ScanResult::ForUser(r) => Some(r),
            ScanResult::NotForUser => None,
        }
    }
}

/// Checks whether an announcement is addressed to the holder of these keys.
///
/// `spending_public` only needs its public half; `viewing` must carry its
/// private key.
///
/// # Errors
/// - `MissingPrivateKey` if `viewing` is public-only
/// - `ScanItem` if `pkx` is not the x-coordinate of any curve point
pub fn is_announcement_for_user(
    spending_public: &KeyPair,
    viewing: &KeyPair,
    announcement: &Announcement,
) -> Result<ScanResult> {
    if !viewing.has_private_key() {
        return Err(ShroudError::MissingPrivateKey);
    }

    let candidates = candidates_from_x(&announcement.pkx);
    if candidates.is_empty() {
        return Err(ShroudError::ScanItem(format!(
            "pkx 0x{} is not on the curve",
            hex::encode(announcement.pkx)
        )));
    }

    for candidate in candidates {
        let payload = EncryptedPayload::new(candidate, announcement.ciphertext.clone());
        let random_number = match viewing.decrypt(&payload) {
            Ok(r) => r,
            Err(ShroudError::DecryptionFailed) => continue,
            Err(e) => return Err(e),
        };

        let computed = spending_public.mul_public_key(&random_number)?.address();
        let matches: bool = computed.as_bytes()[..]
            .ct_eq(&announcement.receiver.as_bytes()[..])
            .into();

        if matches {
            return Ok(ScanResult::ForUser(random_number));
        }
        // Authenticated under our viewing key but paid elsewhere: the sender
        // used our viewing key with someone else's spending key.
        trace!(receiver = %announcement.receiver, "decrypted announcement for another spending key");
        return Ok(ScanResult::NotForUser);
    }

    Ok(ScanResult::NotForUser)
}

// ═══════════════════════════════════════════════════════════════════════════════
// USER ANNOUNCEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// An announcement that matched, with the recovered random number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAnnouncement {
    /// The matched announcement
    pub announcement: Announcement,
    /// Random number recovered by trial decryption
    pub random_number: RandomNumber,
    /// Whether the funds have been moved out; always false at discovery
    pub is_withdrawn: bool,
}

impl UserAnnouncement {
    /// Wraps a matched announcement.
    pub fn new(announcement: Announcement, random_number: RandomNumber) -> Self {
        Self {
            announcement,
            random_number,
            is_withdrawn: false,
        }
    }

    /// Re-derives the spendable stealth key pair.
    ///
    /// # Errors
    /// `MissingPrivateKey` if `spending` is public-only.
    pub fn stealth_key_pair(&self, spending: &KeyPair) -> Result<KeyPair> {
        if !spending.has_private_key() {
            return Err(ShroudError::MissingPrivateKey);
        }
        spending.mul_public_key(&self.random_number)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEWING KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// The minimal key material needed to scan: spending public key plus the
/// viewing key pair.
///
/// Holders can find payments but cannot spend them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewingKeys {
    spending_public: KeyPair,
    viewing: KeyPair,
}

impl ViewingKeys {
    /// Creates scan keys from a spending public key and a viewing private key.
    pub fn new(spending_public_key: &[u8], viewing_private_key: &[u8]) -> Result<Self> {
        Ok(Self {
            spending_public: KeyPair::from_public_key(spending_public_key)?,
            viewing: KeyPair::from_private_key(viewing_private_key)?,
        })
    }

    /// Creates scan keys from existing key pairs.
    pub fn from_key_pairs(spending: &KeyPair, viewing: KeyPair) -> Result<Self> {
        if !viewing.has_private_key() {
            return Err(ShroudError::MissingPrivateKey);
        }
        Ok(Self {
            spending_public: spending.to_public(),
            viewing,
        })
    }

    /// Returns the spending public key.
    pub fn spending_public(&self) -> &KeyPair {
        &self.spending_public
    }

    /// Returns the viewing key pair.
    pub fn viewing(&self) -> &KeyPair {
        &self.viewing
    }

    /// Scans one announcement, returning the match if any.
    pub fn scan(&self, announcement: &Announcement) -> Result<Option<UserAnnouncement>> {
        let result = is_announcement_for_user(&self.spending_public, &self.viewing, announcement)?;
        Ok(result
            .into_random_number()
            .map(|r| UserAnnouncement::new(announcement.clone(), r)))
    }
}

impl From<&StealthKeys> for ViewingKeys {
    fn from(keys: &StealthKeys) -> Self {
        Self {
            spending_public: keys.spending().to_public(),
            viewing: keys.viewing().clone(),
        }
    }
}

/// Scans a slice of announcements, skipping malformed ones.
///
/// Returns matches in input order. Only errors that make the whole scan
/// meaningless (such as a public-only viewing key) are returned.
pub fn scan_announcements(
    keys: &ViewingKeys,
    announcements: &[Announcement],
) -> Result<Vec<UserAnnouncement>> {
    let mut found = Vec::new();

    for announcement in announcements {
        match keys.scan(announcement) {
            Ok(Some(user_announcement)) => found.push(user_announcement),
            Ok(None) => {}
            Err(e) if e.is_skippable_scan_item() => {
                debug!(tx_hash = %announcement.tx_hash, error = %e, "skipping malformed announcement");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{prepare_send, prepare_send_with};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use shroud_core::types::{EthAddress, TxHash};

    fn recipient(seed: u64) -> StealthKeys {
        StealthKeys::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(seed))
    }

    fn announcement_for(keys: &StealthKeys, tx: u8) -> Announcement {
        prepare_send(
            &keys.spending().public_key_bytes(true),
            &keys.viewing().public_key_bytes(true),
        )
        .unwrap()
        .announcement()
        .tx_hash(TxHash::from_array([tx; 32]))
        .timestamp(1_700_000_000)
        .build()
        .unwrap()
    }

    #[test]
    fn test_true_positive() {
        let keys = recipient(1);
        let r = RandomNumber::from_u64(7).unwrap();
        let prep = prepare_send_with(
            &keys.spending().public_key_bytes(true),
            &keys.viewing().public_key_bytes(true),
            &r,
            &mut ChaCha20Rng::seed_from_u64(99),
        )
        .unwrap();
        let ann = prep.announcement().timestamp(1).build().unwrap();

        let result = is_announcement_for_user(&keys.spending().to_public(), keys.viewing(), &ann).unwrap();
        assert_eq!(result, ScanResult::ForUser(r));
    }

    #[test]
    fn test_true_negative() {
        let keys = recipient(2);
        let other = recipient(3);
        let ann = announcement_for(&other, 1);

        let result = is_announcement_for_user(keys.spending(), keys.viewing(), &ann).unwrap();
        assert_eq!(result, ScanResult::NotForUser);
    }

    #[test]
    fn test_our_viewing_key_other_spending_key() {
        let keys = recipient(4);
        let other = recipient(5);
        // Encrypted to our viewing key, but paid to someone else's spending key.
        let ann = prepare_send(
            &other.spending().public_key_bytes(true),
            &keys.viewing().public_key_bytes(true),
        )
        .unwrap()
        .announcement()
        .build()
        .unwrap();

        let result = is_announcement_for_user(keys.spending(), keys.viewing(), &ann).unwrap();
        assert!(!result.is_for_user());
    }

    #[test]
    fn test_tampered_receiver_not_for_user() {
        let keys = recipient(6);
        let mut ann = announcement_for(&keys, 1);
        ann.receiver = EthAddress::from_array([0xaa; 20]);

        let result = is_announcement_for_user(keys.spending(), keys.viewing(), &ann).unwrap();
        assert_eq!(result, ScanResult::NotForUser);
    }

    #[test]
    fn test_pkx_off_curve_is_scan_item_error() {
        let keys = recipient(7);
        let mut ann = announcement_for(&keys, 1);
        ann.pkx = [0u8; 32];
        ann.pkx[31] = 5;

        let err = is_announcement_for_user(keys.spending(), keys.viewing(), &ann).unwrap_err();
        assert!(matches!(err, ShroudError::ScanItem(_)));
        assert!(err.is_skippable_scan_item());
    }

    #[test]
    fn test_public_only_viewing_key_rejected() {
        let keys = recipient(8);
        let ann = announcement_for(&keys, 1);
        assert!(matches!(
            is_announcement_for_user(keys.spending(), &keys.viewing().to_public(), &ann),
            Err(ShroudError::MissingPrivateKey)
        ));
    }

    #[test]
    fn test_stealth_key_pair_controls_receiver() {
        let keys = recipient(9);
        let ann = announcement_for(&keys, 1);
        let viewing_keys = ViewingKeys::from(&keys);

        let found = viewing_keys.scan(&ann).unwrap().unwrap();
        assert!(!found.is_withdrawn);

        let stealth = found.stealth_key_pair(keys.spending()).unwrap();
        assert!(stealth.has_private_key());
        assert_eq!(stealth.address(), ann.receiver);

        assert!(matches!(
            found.stealth_key_pair(&keys.spending().to_public()),
            Err(ShroudError::MissingPrivateKey)
        ));
    }

    #[test]
    fn test_scan_announcements_mixed() {
        let keys = recipient(10);
        let other = recipient(11);

        let mut malformed = announcement_for(&keys, 9);
        malformed.pkx = [0u8; 32];
        malformed.pkx[31] = 5;

        let announcements = vec![
            announcement_for(&keys, 1),
            announcement_for(&other, 2),
            malformed,
            announcement_for(&keys, 3),
        ];

        let found = scan_announcements(&ViewingKeys::from(&keys), &announcements).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].announcement.tx_hash, TxHash::from_array([1; 32]));
        assert_eq!(found[1].announcement.tx_hash, TxHash::from_array([3; 32]));
    }

    #[test]
    fn test_viewing_keys_from_bytes() {
        let keys = recipient(12);
        let viewing_private = keys.viewing().private_key_bytes().unwrap();
        let viewing_keys =
            ViewingKeys::new(&keys.spending().public_key_bytes(false), &viewing_private[..]).unwrap();
        assert_eq!(viewing_keys, ViewingKeys::from(&keys));
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]

        #[test]
        fn prop_scan_matches_only_the_recipient(seed in proptest::prelude::any::<u64>()) {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keys = StealthKeys::generate_with_rng(&mut rng);
            let other = StealthKeys::generate_with_rng(&mut rng);
            let r = RandomNumber::generate_with_rng(&mut rng);

            let ann = prepare_send_with(
                &keys.spending().public_key_bytes(true),
                &keys.viewing().public_key_bytes(true),
                &r,
                &mut rng,
            )
            .unwrap()
            .announcement()
            .build()
            .unwrap();

            let mine = is_announcement_for_user(keys.spending(), keys.viewing(), &ann).unwrap();
            proptest::prop_assert_eq!(mine, ScanResult::ForUser(r));

            let theirs = is_announcement_for_user(other.spending(), other.viewing(), &ann).unwrap();
            proptest::prop_assert_eq!(theirs, ScanResult::NotForUser);
        }
    }
}

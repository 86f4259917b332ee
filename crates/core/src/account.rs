//! Account labeling from BIP-44 style derivation paths.
//!
//! The purpose segment of an account path (`m/<purpose>'/...`) determines the
//! address scheme the account uses. The label is informational only; it never
//! gates identification or verification.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Address scheme of an account, derived from the path's purpose segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Purpose `44'`.
    Legacy,
    /// Purpose `48'`.
    LegacyMultisig,
    /// Purpose `49'`.
    LegacySegwit,
    /// Purpose `84'`.
    NativeSegwit,
    /// Any other purpose.
    Unknown,
}

impl AccountKind {
    /// Classify a purpose segment (the number without the hardened marker).
    pub fn from_purpose(purpose: &str) -> Self {
        match purpose {
            "44" => AccountKind::Legacy,
            "48" => AccountKind::LegacyMultisig,
            "49" => AccountKind::LegacySegwit,
            "84" => AccountKind::NativeSegwit,
            _ => AccountKind::Unknown,
        }
    }

    /// Human-readable label for display next to the account number.
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Legacy => "Legacy",
            AccountKind::LegacyMultisig => "Legacy multisig",
            AccountKind::LegacySegwit => "Legacy SegWit",
            AccountKind::NativeSegwit => "Native SegWit",
            AccountKind::Unknown => "Unknown",
        }
    }
}

/// A labeled account resolved from a derivation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account-level derivation path, e.g. `m/84'/0'/0'`.
    pub path: String,
    /// One-based account number (hardened account index + 1).
    pub number: u32,
    /// Address scheme derived from the purpose segment.
    pub kind: AccountKind,
}

impl Account {
    /// Resolve the label and number of an account-level path.
    ///
    /// Expects at least `m/<purpose>'/<coin>'/<account>'`; a path that does
    /// not have that shape is an error, while an unrecognized purpose simply
    /// labels the account [`AccountKind::Unknown`].
    pub fn resolve(path: &str) -> Result<Self> {
        let malformed = || Error::Identity(format!("malformed account path: {path:?}"));

        let mut segments = path.split('\'');
        let purpose = segments
            .next()
            .and_then(|s| s.split('/').nth(1))
            .filter(|s| !s.is_empty())
            .ok_or_else(malformed)?;
        let account_index = segments
            .nth(1)
            .and_then(|s| s.split('/').nth(1))
            .ok_or_else(malformed)?
            .parse::<u32>()
            .map_err(|_| malformed())?;

        Ok(Self {
            path: path.to_string(),
            number: account_index + 1,
            kind: AccountKind::from_purpose(purpose),
        })
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} account #{}", self.kind.label(), self.number)
    }
}

/// Compute the next unused receive path under an account.
///
/// Receive addresses live on the external chain (`<account>/0/<index>`); the
/// next path continues after the last used one, or starts at index 0 when no
/// address has been used yet.
pub fn next_receive_path(account_path: &str, last_used: Option<&str>) -> Result<String> {
    let next_index = match last_used {
        None => 0,
        Some(used) => {
            let last = used
                .rsplit('/')
                .next()
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| {
                    Error::Identity(format!("malformed address path: {used:?}"))
                })?;
            last + 1
        }
    };

    Ok(format!("{account_path}/0/{next_index}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_classification() {
        assert_eq!(AccountKind::from_purpose("44"), AccountKind::Legacy);
        assert_eq!(AccountKind::from_purpose("48"), AccountKind::LegacyMultisig);
        assert_eq!(AccountKind::from_purpose("49"), AccountKind::LegacySegwit);
        assert_eq!(AccountKind::from_purpose("84"), AccountKind::NativeSegwit);
        assert_eq!(AccountKind::from_purpose("86"), AccountKind::Unknown);
        assert_eq!(AccountKind::from_purpose(""), AccountKind::Unknown);
    }

    #[test]
    fn test_resolve_native_segwit_account() {
        let account = Account::resolve("m/84'/0'/0'").unwrap();
        assert_eq!(account.kind, AccountKind::NativeSegwit);
        assert_eq!(account.number, 1);
        assert_eq!(account.to_string(), "Native SegWit account #1");
    }

    #[test]
    fn test_resolve_third_legacy_account() {
        let account = Account::resolve("m/44'/1'/2'").unwrap();
        assert_eq!(account.kind, AccountKind::Legacy);
        assert_eq!(account.number, 3);
    }

    #[test]
    fn test_nonstandard_purpose_is_unknown_not_fatal() {
        let account = Account::resolve("m/86'/0'/0'").unwrap();
        assert_eq!(account.kind, AccountKind::Unknown);
        assert_eq!(account.number, 1);
    }

    #[test]
    fn test_malformed_paths_rejected() {
        assert!(Account::resolve("").is_err());
        assert!(Account::resolve("m").is_err());
        assert!(Account::resolve("m/84'").is_err());
        assert!(Account::resolve("m/84'/0'/x'").is_err());
    }

    #[test]
    fn test_next_receive_path_fresh_account() {
        let path = next_receive_path("m/84'/0'/0'", None).unwrap();
        assert_eq!(path, "m/84'/0'/0'/0/0");
    }

    #[test]
    fn test_next_receive_path_after_used() {
        let path = next_receive_path("m/84'/0'/0'", Some("m/84'/0'/0'/0/7")).unwrap();
        assert_eq!(path, "m/84'/0'/0'/0/8");
    }

    #[test]
    fn test_next_receive_path_malformed_last_used() {
        assert!(next_receive_path("m/84'/0'/0'", Some("m/84'/0'/0'/0/x")).is_err());
    }
}

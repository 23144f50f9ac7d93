//! Synthetic identity and content generation.
//!
//! Everything an inbound "verification" message needs — the mailbox address,
//! the sender identity, the body text, and the OTP code embedded in it — is
//! fabricated here from fixed vocabularies and templates. The generator never
//! touches storage: uniqueness of addresses is the store's problem, and no
//! retry happens on collision.

pub mod extract;
pub mod federated;
pub mod standard;

pub use extract::extract_code;

use serde::{Deserialize, Serialize};

// ─── AddressKind ──────────────────────────────────────────────────────────────

/// Which generation profile an address or message belongs to.
///
/// The wire names (`normal` / `sso`) are kept for client compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressKind {
    /// Consumer webmail profile.
    #[serde(rename = "normal")]
    Standard,
    /// Corporate single-sign-on profile.
    #[serde(rename = "sso")]
    Federated,
}

// ─── Synthesized ──────────────────────────────────────────────────────────────

/// Message fields produced by one synthesis step.
///
/// `code` is the exact string substituted into `body` — callers that persist
/// the message store it directly instead of re-extracting it from the text.
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub sender: String,
    pub sender_name: String,
    pub subject: String,
    pub body: String,
    pub code: String,
}

/// Generate a fresh mailbox address of the given kind.
pub fn generate_address(kind: AddressKind) -> String {
    match kind {
        AddressKind::Standard => standard::generate_address(),
        AddressKind::Federated => federated::generate_address(),
    }
}

/// Fabricate the fields of one inbound verification message.
pub fn synthesize(kind: AddressKind) -> Synthesized {
    match kind {
        AddressKind::Standard => standard::synthesize(),
        AddressKind::Federated => federated::synthesize(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names_roundtrip() {
        assert_eq!(
            serde_json::to_string(&AddressKind::Standard).unwrap(),
            "\"normal\""
        );
        assert_eq!(
            serde_json::to_string(&AddressKind::Federated).unwrap(),
            "\"sso\""
        );
        let parsed: AddressKind = serde_json::from_str("\"sso\"").unwrap();
        assert_eq!(parsed, AddressKind::Federated);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<AddressKind>("\"imap\"").is_err());
    }

    #[test]
    fn synthesized_code_is_embedded_in_body() {
        for kind in [AddressKind::Standard, AddressKind::Federated] {
            let synth = synthesize(kind);
            assert!(
                synth.body.contains(&synth.code),
                "body {:?} must contain code {:?}",
                synth.body,
                synth.code
            );
        }
    }
}

//! Guest identity verification state machine.
//!
//! Owns the verification status for the remote party's claim. The machine is
//! pure: it consumes claim/presence/verify-result inputs and emits effect
//! events; the session controller performs the actual signer calls.
//!
//! Status flow: `Unverified → Pending → {Valid, Invalid}`. The terminal
//! states are sticky for the session — once the operator has read a verdict
//! it never silently changes, and a claim arriving after a verdict is
//! rejected rather than re-evaluated.

use crate::error::Result;
use crate::identity::IdentityClaim;
use crate::signer::{SignerPresence, VerifyOutcome};
use tracing::{debug, warn};

/// Verification status of the remote party's identity claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationStatus {
    /// No claim received yet.
    #[default]
    Unverified,
    /// A claim arrived; verification has not concluded.
    Pending,
    /// The signature verifies against the claimed address.
    Valid,
    /// The signature does not belong to the claimed address.
    Invalid,
}

impl VerificationStatus {
    /// Whether this status can never change again within the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationStatus::Valid | VerificationStatus::Invalid)
    }

    /// Get a human-readable string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Valid => "valid",
            VerificationStatus::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effects emitted by the state machine for the controller to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyEvent {
    /// The status moved; notify the embedding layer.
    StatusChanged(VerificationStatus),
    /// Run the signer verify call for this claim and feed the result back.
    VerifyRequested(IdentityClaim),
    /// The verdict is `Invalid`: a cryptographic mismatch, with the reason.
    Mismatch(String),
    /// The verify call itself failed; verification stays inconclusive.
    CallFailed(String),
    /// A claim arrived after a terminal verdict and was dropped.
    ClaimRejected,
}

/// State machine owning the remote party's verification status.
#[derive(Debug, Default)]
pub struct VerificationStateMachine {
    status: VerificationStatus,
    claim: Option<IdentityClaim>,
}

impl VerificationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    /// The remote claim under (or after) verification, if any.
    pub fn claim(&self) -> Option<&IdentityClaim> {
        self.claim.as_ref()
    }

    /// A remote identity claim arrived.
    ///
    /// Enters `Pending` and requests a verify call if the signer is present;
    /// with the signer absent the claim is parked until presence returns.
    /// Claims arriving after a terminal verdict are rejected.
    pub fn on_claim(
        &mut self,
        claim: IdentityClaim,
        presence: SignerPresence,
    ) -> Vec<VerifyEvent> {
        if self.status.is_terminal() {
            warn!(
                address = %claim.address,
                verdict = %self.status,
                "dropping identification received after verdict"
            );
            return vec![VerifyEvent::ClaimRejected];
        }

        let mut events = Vec::new();

        if self.status != VerificationStatus::Pending {
            self.status = VerificationStatus::Pending;
            events.push(VerifyEvent::StatusChanged(VerificationStatus::Pending));
        }

        self.claim = Some(claim.clone());

        match presence {
            SignerPresence::Present => events.push(VerifyEvent::VerifyRequested(claim)),
            SignerPresence::Absent => {
                debug!(address = %claim.address, "signer absent, verification deferred")
            }
        }

        events
    }

    /// The signing device came back.
    ///
    /// Resumes a deferred or interrupted verification; a settled verdict is
    /// left alone.
    pub fn on_presence_restored(&mut self) -> Vec<VerifyEvent> {
        if self.status != VerificationStatus::Pending {
            return Vec::new();
        }

        match &self.claim {
            Some(claim) => vec![VerifyEvent::VerifyRequested(claim.clone())],
            None => Vec::new(),
        }
    }

    /// A signer verify call completed.
    ///
    /// `Ok` with success settles `Valid`; `Ok` without success settles
    /// `Invalid` (mismatch). `Err` means the call never concluded — the
    /// status stays `Pending` and a later attempt may still settle it.
    pub fn on_verify_result(&mut self, result: Result<VerifyOutcome>) -> Vec<VerifyEvent> {
        if self.status != VerificationStatus::Pending {
            debug!(status = %self.status, "ignoring verify result outside pending");
            return Vec::new();
        }

        match result {
            Ok(outcome) if outcome.success => {
                self.status = VerificationStatus::Valid;
                vec![VerifyEvent::StatusChanged(VerificationStatus::Valid)]
            }
            Ok(outcome) => {
                self.status = VerificationStatus::Invalid;
                vec![
                    VerifyEvent::StatusChanged(VerificationStatus::Invalid),
                    VerifyEvent::Mismatch(
                        outcome
                            .error
                            .unwrap_or_else(|| "signature does not match address".to_string()),
                    ),
                ]
            }
            Err(err) => vec![VerifyEvent::CallFailed(err.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::network::Network;
    use crate::rendezvous::SessionId;

    fn claim(address: &str) -> IdentityClaim {
        IdentityClaim {
            session_id: SessionId::generate(Network::Testnet),
            address: address.to_string(),
            signature: "cafe".to_string(),
            is_initiator: true,
            device: None,
        }
    }

    #[test]
    fn test_starts_unverified() {
        let machine = VerificationStateMachine::new();
        assert_eq!(machine.status(), VerificationStatus::Unverified);
        assert!(machine.claim().is_none());
    }

    #[test]
    fn test_claim_with_signer_present_requests_verify() {
        let mut machine = VerificationStateMachine::new();

        let events = machine.on_claim(claim("addr"), SignerPresence::Present);

        assert_eq!(machine.status(), VerificationStatus::Pending);
        assert_eq!(
            events[0],
            VerifyEvent::StatusChanged(VerificationStatus::Pending)
        );
        assert!(matches!(&events[1], VerifyEvent::VerifyRequested(c) if c.address == "addr"));
    }

    #[test]
    fn test_claim_with_signer_absent_defers() {
        let mut machine = VerificationStateMachine::new();

        let events = machine.on_claim(claim("addr"), SignerPresence::Absent);
        assert_eq!(
            events,
            vec![VerifyEvent::StatusChanged(VerificationStatus::Pending)]
        );
        assert_eq!(machine.status(), VerificationStatus::Pending);

        let resumed = machine.on_presence_restored();
        assert!(matches!(&resumed[0], VerifyEvent::VerifyRequested(c) if c.address == "addr"));
    }

    #[test]
    fn test_successful_verify_settles_valid() {
        let mut machine = VerificationStateMachine::new();
        machine.on_claim(claim("addr"), SignerPresence::Present);

        let events = machine.on_verify_result(Ok(VerifyOutcome::valid()));
        assert_eq!(
            events,
            vec![VerifyEvent::StatusChanged(VerificationStatus::Valid)]
        );
        assert_eq!(machine.status(), VerificationStatus::Valid);
    }

    #[test]
    fn test_failed_verify_settles_invalid_with_mismatch() {
        let mut machine = VerificationStateMachine::new();
        machine.on_claim(claim("addr"), SignerPresence::Present);

        let events = machine.on_verify_result(Ok(VerifyOutcome::mismatch("bad signature")));
        assert_eq!(machine.status(), VerificationStatus::Invalid);
        assert!(events.contains(&VerifyEvent::StatusChanged(VerificationStatus::Invalid)));
        assert!(events.contains(&VerifyEvent::Mismatch("bad signature".to_string())));
    }

    #[test]
    fn test_call_failure_keeps_pending() {
        let mut machine = VerificationStateMachine::new();
        machine.on_claim(claim("addr"), SignerPresence::Present);

        let events =
            machine.on_verify_result(Err(Error::Signer("device went away".to_string())));
        assert_eq!(machine.status(), VerificationStatus::Pending);
        assert!(matches!(&events[0], VerifyEvent::CallFailed(_)));

        // A later attempt can still settle the verdict.
        let resumed = machine.on_presence_restored();
        assert!(matches!(&resumed[0], VerifyEvent::VerifyRequested(_)));
        machine.on_verify_result(Ok(VerifyOutcome::valid()));
        assert_eq!(machine.status(), VerificationStatus::Valid);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        for settled in [Ok(VerifyOutcome::valid()), Ok(VerifyOutcome::mismatch("no"))] {
            let mut machine = VerificationStateMachine::new();
            machine.on_claim(claim("addr"), SignerPresence::Present);
            machine.on_verify_result(settled);
            let verdict = machine.status();
            assert!(verdict.is_terminal());

            // Late results, presence changes and fresh claims are all inert.
            assert!(machine
                .on_verify_result(Ok(VerifyOutcome::mismatch("flip")))
                .is_empty());
            assert!(machine.on_presence_restored().is_empty());
            let events = machine.on_claim(claim("other"), SignerPresence::Present);
            assert_eq!(events, vec![VerifyEvent::ClaimRejected]);

            assert_eq!(machine.status(), verdict);
        }
    }

    #[test]
    fn test_replacement_claim_while_pending_reverifies() {
        let mut machine = VerificationStateMachine::new();
        machine.on_claim(claim("first"), SignerPresence::Present);

        let events = machine.on_claim(claim("second"), SignerPresence::Present);

        // Already pending: no duplicate status event, but a new verify run.
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], VerifyEvent::VerifyRequested(c) if c.address == "second"));
        assert_eq!(machine.claim().unwrap().address, "second");
    }

    #[test]
    fn test_presence_restored_without_claim_is_inert() {
        let mut machine = VerificationStateMachine::new();
        assert!(machine.on_presence_restored().is_empty());
    }
}

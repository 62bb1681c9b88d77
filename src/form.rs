//! Headless view-model of the bridge surface.
//!
//! Backs the interactive endpoints: a bidirectional amount input, a
//! direction toggle, a token selector (available only when bridging from
//! L2) and a submit label that always reflects the current amount and
//! asset. Toggling the direction clears every per-direction input: amount,
//! recipient, token, error and any in-flight deposit grant.

use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::error::ValidationError;
use crate::orchestrator::BridgeRequest;
use crate::relay::DepositGrant;
use crate::types::{Direction, TokenInfo};

#[derive(Debug, Clone, Serialize)]
pub struct BridgeForm {
    direction: Direction,
    amount: Option<BigDecimal>,
    recipient: Option<String>,
    token: Option<TokenInfo>,
    error: Option<String>,
    /// Custody info of a deposit awaiting its funding transaction.
    pending_deposit: Option<DepositGrant>,
}

impl BridgeForm {
    pub fn new() -> Self {
        BridgeForm {
            direction: Direction::L1ToL2,
            amount: None,
            recipient: None,
            token: None,
            error: None,
            pending_deposit: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount(&self) -> Option<&BigDecimal> {
        self.amount.as_ref()
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    pub fn token(&self) -> Option<&TokenInfo> {
        self.token.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pending_deposit(&self) -> Option<&DepositGrant> {
        self.pending_deposit.as_ref()
    }

    /// Flip the transfer direction, resetting all per-direction state.
    pub fn toggle_direction(&mut self) -> Direction {
        self.direction = self.direction.toggled();
        self.amount = None;
        self.recipient = None;
        self.token = None;
        self.error = None;
        self.pending_deposit = None;
        self.direction
    }

    pub fn set_amount(&mut self, amount: Option<BigDecimal>) {
        self.amount = amount;
        self.error = None;
    }

    pub fn set_recipient(&mut self, recipient: Option<String>) {
        self.recipient = recipient.filter(|r| !r.trim().is_empty());
        self.error = None;
    }

    /// Select a token to withdraw. Only available from L2.
    pub fn select_token(&mut self, token: Option<TokenInfo>) -> Result<(), ValidationError> {
        if token.is_some() && self.direction == Direction::L1ToL2 {
            return Err(ValidationError::TokenNotAllowed);
        }
        self.token = token;
        self.error = None;
        Ok(())
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn record_deposit(&mut self, grant: DepositGrant) {
        self.pending_deposit = Some(grant);
    }

    /// Clear submission state after a finished attempt.
    pub fn reset_after_submit(&mut self) {
        self.amount = None;
        self.error = None;
        self.pending_deposit = None;
    }

    /// The submit action's label, e.g. "Bridge 10 KAS" or "Bridge 25 USDT".
    pub fn submit_label(&self) -> String {
        let symbol = match (&self.direction, &self.token) {
            (Direction::L2ToL1, Some(token)) => token.symbol.as_str(),
            _ => "KAS",
        };
        match &self.amount {
            Some(amount) => format!("Bridge {amount} {symbol}"),
            None => "Bridge".to_string(),
        }
    }

    /// Snapshot the form into an orchestrator request.
    pub fn to_request(&self) -> BridgeRequest {
        BridgeRequest {
            direction: self.direction,
            amount: self.amount.clone(),
            recipient: self.recipient.clone(),
            token: match self.direction {
                Direction::L2ToL1 => self.token.clone(),
                Direction::L1ToL2 => None,
            },
        }
    }
}

impl Default for BridgeForm {
    fn default() -> Self {
        Self::new()
    }
}

//! Transfer payload construction.
//!
//! L1 transfers are a plain payment instruction; L2 native transfers carry
//! value to the bridge endpoint; L2 fungible-token transfers are an
//! ERC-20 `transfer(address,uint256)` call encoded manually as a fixed
//! byte buffer with named offsets.

use alloy::primitives::{Address, Bytes, U256};
use bigdecimal::BigDecimal;
use eyre::Result;
use tiny_keccak::{Hasher, Keccak};

use crate::types::{L1Address, TokenInfo};
use crate::units;
use crate::wallet::L2TransactionRequest;

/// 4-byte method identifier of `transfer(address,uint256)`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Calldata layout: selector, then two 32-byte left-zero-padded words.
pub const SELECTOR_OFFSET: usize = 0;
pub const RECIPIENT_WORD_OFFSET: usize = 4;
pub const AMOUNT_WORD_OFFSET: usize = 36;
pub const TOKEN_CALLDATA_LEN: usize = 68;

/// Derive the 4-byte method identifier for a solidity-style signature.
pub fn method_selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&output[..4]);
    selector
}

/// A native payment instruction on L1. No further structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Payment {
    pub to: L1Address,
    /// Amount in 10^-8 native units.
    pub amount: u64,
}

/// An instruction for the L2 wallet's generic submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L2Payload {
    /// Native value transfer; amount in 10^-18 units.
    Native { to: Address, value: U256 },
    /// ERC-20 transfer call against `token`; value rides in the calldata.
    Token { token: Address, data: Bytes },
}

impl L2Payload {
    /// Shape the payload into the wallet's `{from, to, value?, data?}` call.
    pub fn to_request(&self, from: Address) -> L2TransactionRequest {
        match self {
            L2Payload::Native { to, value } => L2TransactionRequest {
                from,
                to: *to,
                value: Some(*value),
                data: None,
            },
            L2Payload::Token { token, data } => L2TransactionRequest {
                from,
                to: *token,
                value: None,
                data: Some(data.clone()),
            },
        }
    }
}

/// Encode `transfer(recipient, amount)` calldata.
pub fn token_transfer_calldata(recipient: Address, amount: U256) -> Bytes {
    let mut data = [0u8; TOKEN_CALLDATA_LEN];
    data[SELECTOR_OFFSET..RECIPIENT_WORD_OFFSET].copy_from_slice(&TRANSFER_SELECTOR);
    // Word 0: recipient, 20 bytes right-aligned in the 32-byte word
    data[RECIPIENT_WORD_OFFSET + 12..AMOUNT_WORD_OFFSET].copy_from_slice(recipient.as_slice());
    // Word 1: amount as uint256, big-endian
    data[AMOUNT_WORD_OFFSET..TOKEN_CALLDATA_LEN].copy_from_slice(&amount.to_be_bytes::<32>());
    Bytes::copy_from_slice(&data)
}

/// Build the L1 payment instruction for `amount` display units.
pub fn build_l1_payment(to: L1Address, amount: &BigDecimal) -> Result<L1Payment> {
    Ok(L1Payment {
        to,
        amount: units::to_l1_units(amount)?,
    })
}

/// Build the L2 instruction moving `amount` display units to `recipient`.
///
/// With token metadata the amount scales by the token's declared decimals,
/// never by the ledger's native 18-decimal convention; without it the
/// transfer is a native value call.
pub fn build_l2_payload(
    recipient: Address,
    token: Option<&TokenInfo>,
    amount: &BigDecimal,
) -> Result<L2Payload> {
    match token {
        None => Ok(L2Payload::Native {
            to: recipient,
            value: units::to_l2_units(amount)?,
        }),
        Some(token) => {
            let value = units::to_scaled_units(amount, token.decimals)?;
            Ok(L2Payload::Token {
                token: token.address,
                data: token_transfer_calldata(recipient, value),
            })
        }
    }
}

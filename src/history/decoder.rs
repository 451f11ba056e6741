//! System program instruction decoding
//!
//! Turns a decoded wire transaction into the native transfers it performs.
//! Instructions for other programs, and System instructions other than
//! Transfer, are skipped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DecodeError;
use crate::ledger::transfer::TRANSFER_INSTRUCTION_TYPE;
use crate::ledger::wire::Transaction;
use crate::ledger::{Pubkey, SYSTEM_PROGRAM_ID};

const DISCRIMINANT_LENGTH: usize = 4;
const TRANSFER_DATA_LENGTH: usize = 12;

/// Native System program instruction, tagged by its u32 LE discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemInstruction {
    Transfer { lamports: u64 },
    /// Any other System instruction; only the discriminant is kept.
    Other(u32),
}

impl SystemInstruction {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < DISCRIMINANT_LENGTH {
            return Err(DecodeError::InstructionTooShort {
                expected: DISCRIMINANT_LENGTH,
                actual: data.len(),
            });
        }

        let mut discriminant = [0u8; DISCRIMINANT_LENGTH];
        discriminant.copy_from_slice(&data[..DISCRIMINANT_LENGTH]);
        let discriminant = u32::from_le_bytes(discriminant);

        if discriminant != TRANSFER_INSTRUCTION_TYPE {
            return Ok(Self::Other(discriminant));
        }

        if data.len() < TRANSFER_DATA_LENGTH {
            return Err(DecodeError::InstructionTooShort {
                expected: TRANSFER_DATA_LENGTH,
                actual: data.len(),
            });
        }

        let mut lamports = [0u8; 8];
        lamports.copy_from_slice(&data[DISCRIMINANT_LENGTH..TRANSFER_DATA_LENGTH]);
        Ok(Self::Transfer {
            lamports: u64::from_le_bytes(lamports),
        })
    }
}

/// One native transfer touching the queried address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferEvent {
    /// Lamports moved
    pub amount: u64,
    pub from: Pubkey,
    pub to: Pubkey,
    pub timestamp: DateTime<Utc>,
    /// `true` when the queried address is the sender
    pub is_sender: bool,
}

/// Extract every System Transfer in `transaction`.
///
/// `loaded_addresses` extends the static account list for v0 messages.
pub fn decode_system_transfers(
    transaction: &Transaction,
    loaded_addresses: &[Pubkey],
    timestamp: DateTime<Utc>,
    owner: &Pubkey,
) -> Result<Vec<TransferEvent>, DecodeError> {
    let static_keys = &transaction.message.account_keys;
    let total = static_keys.len() + loaded_addresses.len();

    let resolve = |index: u8| -> Result<Pubkey, DecodeError> {
        let index = index as usize;
        static_keys
            .get(index)
            .or_else(|| loaded_addresses.get(index.wrapping_sub(static_keys.len())))
            .copied()
            .ok_or(DecodeError::AccountIndexOutOfRange { index, len: total })
    };

    let mut events = Vec::new();
    for instruction in &transaction.message.instructions {
        if resolve(instruction.program_id_index)? != SYSTEM_PROGRAM_ID {
            continue;
        }

        let lamports = match SystemInstruction::decode(&instruction.data)? {
            SystemInstruction::Transfer { lamports } => lamports,
            SystemInstruction::Other(_) => continue,
        };

        if instruction.accounts.len() < 2 {
            return Err(DecodeError::MissingTransferAccounts(instruction.accounts.len()));
        }
        let from = resolve(instruction.accounts[0])?;
        let to = resolve(instruction.accounts[1])?;

        events.push(TransferEvent {
            amount: lamports,
            from,
            to,
            timestamp,
            is_sender: from == *owner,
        });
    }

    Ok(events)
}

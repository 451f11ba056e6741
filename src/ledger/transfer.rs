//! Native transfer construction and signing

use crate::error::KeyError;
use crate::ledger::wire::{
    CompiledInstruction, Message, MessageHeader, MessageVersion, Transaction,
};
use crate::ledger::{Pubkey, SYSTEM_PROGRAM_ID};
use crate::storage::Keypair;

/// System program instruction discriminant for Transfer.
pub const TRANSFER_INSTRUCTION_TYPE: u32 = 2;

/// Transfer payload: u32 discriminant followed by u64 lamports, little endian.
pub fn transfer_instruction_data(lamports: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_INSTRUCTION_TYPE.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data
}

/// Legacy message moving `lamports` from `from` (also fee payer) to `to`.
pub fn transfer_message(
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
    recent_blockhash: [u8; 32],
) -> Message {
    // keys: [payer (signer, writable), recipient (writable), system program (readonly)]
    Message {
        version: MessageVersion::Legacy,
        header: MessageHeader {
            num_required_signatures: 1,
            num_readonly_signed_accounts: 0,
            num_readonly_unsigned_accounts: 1,
        },
        account_keys: vec![*from, *to, SYSTEM_PROGRAM_ID],
        recent_blockhash,
        instructions: vec![CompiledInstruction {
            program_id_index: 2,
            accounts: vec![0, 1],
            data: transfer_instruction_data(lamports),
        }],
        address_table_lookups: Vec::new(),
    }
}

/// Signed transfer transaction ready for submission.
pub fn signed_transfer(
    from: &Keypair,
    to: &Pubkey,
    lamports: u64,
    recent_blockhash: [u8; 32],
) -> Result<Transaction, KeyError> {
    let signing_key = from.signing_key()?;
    let from_pubkey = Pubkey::new(signing_key.verifying_key().to_bytes());
    let message = transfer_message(&from_pubkey, to, lamports, recent_blockhash);
    let signature = from.sign(&message.encode())?;

    Ok(Transaction {
        signatures: vec![signature],
        message,
    })
}

//! Solana transaction wire format
//!
//! Compact binary layout, no external SDK:
//!
//! ```text
//! transaction = compact_u16 n_sigs, [64-byte signature; n_sigs], message
//! message     = [version prefix]?, header(3), compact_u16 n_keys, [32-byte key; n_keys],
//!               recent_blockhash(32), compact_u16 n_ix, [instruction; n_ix],
//!               [address table lookups]  (v0 only)
//! instruction = program_id_index(u8), compact_u16 n, [u8 account index; n],
//!               compact_u16 len, [u8; len]
//! ```

use crate::error::DecodeError;
use crate::ledger::Pubkey;

pub const SIGNATURE_LENGTH: usize = 64;
const VERSION_PREFIX_MASK: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTableLookup {
    pub account_key: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    V0,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<AddressTableLookup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<[u8; SIGNATURE_LENGTH]>,
    pub message: Message,
}

impl Transaction {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);

        let n_sigs = reader.compact_u16("signature count")?;
        let mut signatures = Vec::with_capacity(n_sigs);
        for _ in 0..n_sigs {
            signatures.push(reader.array::<SIGNATURE_LENGTH>("signature")?);
        }

        let message = Message::read(&mut reader)?;

        if reader.remaining() > 0 {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact_u16(self.signatures.len(), &mut out);
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&self.message.encode());
        out
    }
}

impl Message {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let message = Self::read(&mut reader)?;
        if reader.remaining() > 0 {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }
        Ok(message)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = reader.peek("message header")?;
        let version = if first & VERSION_PREFIX_MASK != 0 {
            reader.u8("version prefix")?;
            match first & !VERSION_PREFIX_MASK {
                0 => MessageVersion::V0,
                other => return Err(DecodeError::UnsupportedVersion(other)),
            }
        } else {
            MessageVersion::Legacy
        };

        let header = MessageHeader {
            num_required_signatures: reader.u8("message header")?,
            num_readonly_signed_accounts: reader.u8("message header")?,
            num_readonly_unsigned_accounts: reader.u8("message header")?,
        };

        let n_keys = reader.compact_u16("account key count")?;
        let mut account_keys = Vec::with_capacity(n_keys);
        for _ in 0..n_keys {
            account_keys.push(Pubkey::new(reader.array::<32>("account key")?));
        }

        let recent_blockhash = reader.array::<32>("recent blockhash")?;

        let n_ix = reader.compact_u16("instruction count")?;
        let mut instructions = Vec::with_capacity(n_ix);
        for _ in 0..n_ix {
            let program_id_index = reader.u8("program id index")?;
            let n_accounts = reader.compact_u16("instruction account count")?;
            let accounts = reader.bytes(n_accounts, "instruction accounts")?.to_vec();
            let data_len = reader.compact_u16("instruction data length")?;
            let data = reader.bytes(data_len, "instruction data")?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let mut address_table_lookups = Vec::new();
        if version == MessageVersion::V0 {
            let n_lookups = reader.compact_u16("address table lookup count")?;
            for _ in 0..n_lookups {
                let account_key = Pubkey::new(reader.array::<32>("lookup table key")?);
                let n_writable = reader.compact_u16("writable index count")?;
                let writable_indexes = reader.bytes(n_writable, "writable indexes")?.to_vec();
                let n_readonly = reader.compact_u16("readonly index count")?;
                let readonly_indexes = reader.bytes(n_readonly, "readonly indexes")?.to_vec();
                address_table_lookups.push(AddressTableLookup {
                    account_key,
                    writable_indexes,
                    readonly_indexes,
                });
            }
        }

        Ok(Self {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.version == MessageVersion::V0 {
            out.push(VERSION_PREFIX_MASK);
        }
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_compact_u16(self.account_keys.len(), &mut out);
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash);

        encode_compact_u16(self.instructions.len(), &mut out);
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_compact_u16(ix.accounts.len(), &mut out);
            out.extend_from_slice(&ix.accounts);
            encode_compact_u16(ix.data.len(), &mut out);
            out.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            encode_compact_u16(self.address_table_lookups.len(), &mut out);
            for lookup in &self.address_table_lookups {
                out.extend_from_slice(lookup.account_key.as_bytes());
                encode_compact_u16(lookup.writable_indexes.len(), &mut out);
                out.extend_from_slice(&lookup.writable_indexes);
                encode_compact_u16(lookup.readonly_indexes.len(), &mut out);
                out.extend_from_slice(&lookup.readonly_indexes);
            }
        }
        out
    }
}

/// Append a compact-u16 (1–3 bytes, 7 bits per byte, little end first).
pub fn encode_compact_u16(value: usize, out: &mut Vec<u8>) {
    let mut rem = value as u16;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Decode a compact-u16, returning the value and bytes consumed.
pub fn decode_compact_u16(bytes: &[u8]) -> Result<(usize, usize), DecodeError> {
    let mut value: usize = 0;
    for i in 0..3 {
        let byte = *bytes
            .get(i)
            .ok_or(DecodeError::UnexpectedEof("compact-u16"))?;
        // the third byte may only carry the top two bits
        if i == 2 && byte > 0x03 {
            return Err(DecodeError::InvalidCompactLength);
        }
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            // reject non-canonical encodings such as [0x80, 0x00]
            if i > 0 && byte == 0 {
                return Err(DecodeError::InvalidCompactLength);
            }
            return Ok((value, i + 1));
        }
    }
    Err(DecodeError::InvalidCompactLength)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn peek(&self, what: &'static str) -> Result<u8, DecodeError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof(what))
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        let byte = self.peek(what)?;
        self.pos += 1;
        Ok(byte)
    }

    fn bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEof(what));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N, what)?);
        Ok(out)
    }

    fn compact_u16(&mut self, what: &'static str) -> Result<usize, DecodeError> {
        let (value, used) = decode_compact_u16(&self.bytes[self.pos..]).map_err(|e| match e {
            DecodeError::UnexpectedEof(_) => DecodeError::UnexpectedEof(what),
            other => other,
        })?;
        self.pos += used;
        Ok(value)
    }
}

//! Canonical wire codec for sealed-ledger records.
//!
//! The network-canonical form is big-endian and length-prefixed:
//! - `u32`/`i64` integers as 4/8 big-endian bytes
//! - opaque byte strings as a `u32` length prefix followed by raw bytes
//! - vectors as a `u32` element count followed by the elements
//!
//! Every sealed-ledger record opens with a `u32` version discriminant.
//! Decoding is exact: `encode(decode(bytes)) == bytes` for every accepted
//! input, because downstream consumers verify content addresses over the
//! original bytes. The codec parses only what the index needs from the
//! per-transaction blobs: their boundaries and the leading envelope/result
//! discriminants.

use snafu::Snafu;

use crate::types::{LedgerTransaction, SealedLedger};

/// Version discriminant for the current sealed-ledger record layout.
pub const LEDGER_RECORD_V0: u32 = 0;

/// Envelope discriminant: plain transaction.
pub const ENVELOPE_PLAIN: u32 = 0;
/// Envelope discriminant: fee-bump transaction, where one account pays fees
/// on behalf of another's inner transaction.
pub const ENVELOPE_FEE_BUMP: u32 = 1;

/// Result discriminant: execution succeeded.
pub const RESULT_SUCCESS: u32 = 0;
/// Result discriminant: execution failed.
pub const RESULT_FAILED: u32 = 1;

/// Hard upper bound on any single decoded record or length prefix (16 MiB).
pub const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// Error decoding or encoding a canonical record.
#[derive(Debug, Snafu)]
pub enum WireError {
    /// The input ended before the record did.
    #[snafu(display("truncated record: needed {needed} more bytes, {remaining} remaining"))]
    Truncated {
        /// Bytes the decoder needed next.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// A version or kind discriminant had no known interpretation.
    #[snafu(display("unknown discriminant {value}"))]
    UnknownDiscriminant {
        /// The offending discriminant value.
        value: u32,
    },

    /// A length prefix exceeded the record size bound.
    #[snafu(display("length {len} exceeds maximum record size {max}"))]
    LengthOverflow {
        /// The declared length.
        len: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// Bytes remained after the record ended.
    #[snafu(display("{len} trailing bytes after record"))]
    TrailingBytes {
        /// Number of unconsumed bytes.
        len: usize,
    },
}

/// Kind of a transaction envelope, read from its leading discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Ordinary transaction envelope.
    Plain,
    /// Fee-bump envelope wrapping an inner transaction.
    FeeBump,
}

impl EnvelopeKind {
    /// Returns true for fee-bump envelopes.
    #[inline]
    pub fn is_fee_bump(self) -> bool {
        matches!(self, EnvelopeKind::FeeBump)
    }
}

/// Outcome of a transaction, read from the result's leading discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// The transaction executed without errors.
    Success,
    /// The transaction was included but failed.
    Failed,
}

impl ResultStatus {
    /// Returns true for successful results.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, ResultStatus::Success)
    }
}

/// Decodes a sealed-ledger record from its canonical bytes.
///
/// Validates the record version, all blob boundaries, and the envelope and
/// result discriminants of every contained transaction, so ingest fails
/// before any row is written.
///
/// # Errors
///
/// Returns [`WireError`] on truncation, unknown discriminants, oversized
/// length prefixes, or trailing bytes.
pub fn decode_sealed_ledger(bytes: &[u8]) -> Result<SealedLedger, WireError> {
    if bytes.len() > MAX_RECORD_LEN {
        return Err(WireError::LengthOverflow { len: bytes.len(), max: MAX_RECORD_LEN });
    }

    let mut r = Reader::new(bytes);
    let version = r.read_u32()?;
    if version != LEDGER_RECORD_V0 {
        return Err(WireError::UnknownDiscriminant { value: version });
    }

    let sequence = r.read_u32()?;
    let close_time = r.read_i64()?;
    let header = r.read_opaque()?.to_vec();

    let tx_count = r.read_count(MIN_TX_RECORD_LEN)?;
    let mut transactions = Vec::with_capacity(tx_count);
    for _ in 0..tx_count {
        let envelope = r.read_opaque()?.to_vec();
        let result = r.read_opaque()?.to_vec();
        let meta = r.read_opaque()?.to_vec();

        let event_count = r.read_count(OPAQUE_LEN_PREFIX)?;
        let mut events = Vec::with_capacity(event_count);
        for _ in 0..event_count {
            events.push(r.read_opaque()?.to_vec());
        }

        // Fail early if the index-relevant discriminants are unreadable.
        envelope_kind(&envelope)?;
        result_status(&result)?;

        transactions.push(LedgerTransaction { envelope, result, meta, events });
    }

    let remaining = r.remaining();
    if remaining != 0 {
        return Err(WireError::TrailingBytes { len: remaining });
    }

    Ok(SealedLedger { sequence, close_time, header, transactions })
}

/// Encodes a sealed ledger to its canonical bytes.
///
/// # Errors
///
/// Returns [`WireError::LengthOverflow`] if any blob or the whole record
/// exceeds [`MAX_RECORD_LEN`].
pub fn encode_sealed_ledger(ledger: &SealedLedger) -> Result<Vec<u8>, WireError> {
    let mut w = Writer::default();
    w.put_u32(LEDGER_RECORD_V0);
    w.put_u32(ledger.sequence);
    w.put_i64(ledger.close_time);
    w.put_opaque(&ledger.header)?;

    w.put_count(ledger.transactions.len())?;
    for tx in &ledger.transactions {
        w.put_opaque(&tx.envelope)?;
        w.put_opaque(&tx.result)?;
        w.put_opaque(&tx.meta)?;
        w.put_count(tx.events.len())?;
        for event in &tx.events {
            w.put_opaque(event)?;
        }
    }

    if w.buf.len() > MAX_RECORD_LEN {
        return Err(WireError::LengthOverflow { len: w.buf.len(), max: MAX_RECORD_LEN });
    }
    Ok(w.buf)
}

/// Reads the kind discriminant of an envelope blob.
pub fn envelope_kind(envelope: &[u8]) -> Result<EnvelopeKind, WireError> {
    match Reader::new(envelope).read_u32()? {
        ENVELOPE_PLAIN => Ok(EnvelopeKind::Plain),
        ENVELOPE_FEE_BUMP => Ok(EnvelopeKind::FeeBump),
        value => Err(WireError::UnknownDiscriminant { value }),
    }
}

/// Reads the status discriminant of a result blob.
pub fn result_status(result: &[u8]) -> Result<ResultStatus, WireError> {
    match Reader::new(result).read_u32()? {
        RESULT_SUCCESS => Ok(ResultStatus::Success),
        RESULT_FAILED => Ok(ResultStatus::Failed),
        value => Err(WireError::UnknownDiscriminant { value }),
    }
}

/// Builds an envelope blob from a kind and an opaque payload.
pub fn encode_envelope(kind: EnvelopeKind, payload: &[u8]) -> Vec<u8> {
    let tag = match kind {
        EnvelopeKind::Plain => ENVELOPE_PLAIN,
        EnvelopeKind::FeeBump => ENVELOPE_FEE_BUMP,
    };
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Splits an envelope blob into its kind and opaque payload.
pub fn decode_envelope(envelope: &[u8]) -> Result<(EnvelopeKind, &[u8]), WireError> {
    let kind = envelope_kind(envelope)?;
    Ok((kind, &envelope[4..]))
}

/// Builds a result blob from a status and an opaque detail payload.
pub fn encode_result(status: ResultStatus, detail: &[u8]) -> Vec<u8> {
    let tag = match status {
        ResultStatus::Success => RESULT_SUCCESS,
        ResultStatus::Failed => RESULT_FAILED,
    };
    let mut buf = Vec::with_capacity(4 + detail.len());
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(detail);
    buf
}

/// Splits a result blob into its status and opaque detail payload.
pub fn decode_result(result: &[u8]) -> Result<(ResultStatus, &[u8]), WireError> {
    let status = result_status(result)?;
    Ok((status, &result[4..]))
}

/// Length of an opaque field's length prefix.
const OPAQUE_LEN_PREFIX: usize = 4;

/// Minimum encoded size of one transaction record: three empty opaques and
/// an empty event vector.
const MIN_TX_RECORD_LEN: usize = 4 * OPAQUE_LEN_PREFIX;

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::Truncated { needed: len, remaining: self.remaining() });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64, WireError> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn read_opaque(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u32()? as usize;
        if len > MAX_RECORD_LEN {
            return Err(WireError::LengthOverflow { len, max: MAX_RECORD_LEN });
        }
        self.take(len)
    }

    /// Reads an element count, bounding it by the bytes actually remaining
    /// so a hostile count cannot drive an unbounded allocation.
    fn read_count(&mut self, min_element_len: usize) -> Result<usize, WireError> {
        let count = self.read_u32()? as usize;
        let needed = count.saturating_mul(min_element_len.max(1));
        if needed > self.remaining() {
            return Err(WireError::Truncated { needed, remaining: self.remaining() });
        }
        Ok(count)
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_opaque(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if bytes.len() > MAX_RECORD_LEN {
            return Err(WireError::LengthOverflow { len: bytes.len(), max: MAX_RECORD_LEN });
        }
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn put_count(&mut self, count: usize) -> Result<(), WireError> {
        let value =
            u32::try_from(count).map_err(|_| WireError::LengthOverflow {
                len: count,
                max: MAX_RECORD_LEN,
            })?;
        self.put_u32(value);
        Ok(())
    }
}

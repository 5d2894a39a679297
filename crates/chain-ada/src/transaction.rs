//! Transaction model, declarative builder, signing and hashing.
//!
//! Payloads are CBOR with this shape:
//!
//! ```text
//! transaction = [ body, witness_set, is_valid, auxiliary_data ]
//! body        = { 0: [ input* ], 1: [ output* ], 2: fee }
//! input       = [ tx_hash: bytes(32), index: uint ]
//! output      = [ address: bytes, lovelace: uint ]
//! witness_set = { 0: [ [ vkey: bytes(32), signature: bytes(64) ]* ] }   ({} when unsigned)
//! is_valid    = true
//! auxiliary   = null
//! ```
//!
//! The transaction id is blake2b-256 over the body bytes exactly as they
//! appear in the payload, so it does not change when witnesses are added.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::address::{Address, KEY_HASH_LEN};
use crate::asset::{lovelace_of, Asset};
use crate::cbor::{Decoder, Encoder};
use crate::error::AdaError;
use crate::hash::{blake2b_224, blake2b_256};
use crate::utxo::{sort_largest_first, Utxo};

/// Per-byte fee coefficient (preprod protocol parameter `minFeeA`).
pub const DEFAULT_MIN_FEE_A: u64 = 44;

/// Constant fee term (preprod protocol parameter `minFeeB`).
pub const DEFAULT_MIN_FEE_B: u64 = 155_381;

/// Smallest value an output may carry.
pub const MIN_UTXO_LOVELACE: u64 = 1_000_000;

const BODY_INPUTS: u64 = 0;
const BODY_OUTPUTS: u64 = 1;
const BODY_FEE: u64 = 2;
const WITNESS_VKEYS: u64 = 0;

// ---------------------------------------------------------------------------
// Identifiers and fee parameters
// ---------------------------------------------------------------------------

/// A 32-byte transaction id, shown as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for TxHash {
    type Err = AdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AdaError::InvalidTxHash("empty transaction hash".into()));
        }
        let bytes = hex::decode(s)
            .map_err(|e| AdaError::InvalidTxHash(format!("invalid hex: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            AdaError::InvalidTxHash(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl TryFrom<String> for TxHash {
    type Error = AdaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.to_hex()
    }
}

/// Linear fee parameters: `fee = min_fee_a * size_in_bytes + min_fee_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self {
            min_fee_a: DEFAULT_MIN_FEE_A,
            min_fee_b: DEFAULT_MIN_FEE_B,
        }
    }
}

impl FeeParams {
    /// Minimum fee for a signed transaction of `size` bytes.
    pub fn min_fee(&self, size: usize) -> u64 {
        self.min_fee_a
            .saturating_mul(size as u64)
            .saturating_add(self.min_fee_b)
    }
}

// ---------------------------------------------------------------------------
// Transaction model
// ---------------------------------------------------------------------------

/// Reference to an output of an earlier transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl fmt::Display for TxInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub lovelace: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
}

impl TxBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.map(3);

        enc.uint(BODY_INPUTS).array(self.inputs.len());
        for input in &self.inputs {
            enc.array(2)
                .bytes(input.tx_hash.as_bytes())
                .uint(input.index as u64);
        }

        enc.uint(BODY_OUTPUTS).array(self.outputs.len());
        for output in &self.outputs {
            enc.array(2)
                .bytes(&output.address.to_bytes())
                .uint(output.lovelace);
        }

        enc.uint(BODY_FEE).uint(self.fee);
        enc.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self, AdaError> {
        let mut dec = Decoder::new(bytes);
        let entries = dec.map()?;

        let mut inputs = None;
        let mut outputs = None;
        let mut fee = None;

        for _ in 0..entries {
            match dec.uint()? {
                BODY_INPUTS if inputs.is_none() => {
                    let count = dec.array()?;
                    let mut list = Vec::new();
                    for _ in 0..count {
                        expect_pair(&mut dec, "input")?;
                        let hash: [u8; 32] = dec.bytes()?.try_into().map_err(|_| {
                            AdaError::Cbor("input transaction hash must be 32 bytes".into())
                        })?;
                        let index = u32::try_from(dec.uint()?)
                            .map_err(|_| AdaError::Cbor("input index out of range".into()))?;
                        list.push(TxInput {
                            tx_hash: TxHash(hash),
                            index,
                        });
                    }
                    inputs = Some(list);
                }
                BODY_OUTPUTS if outputs.is_none() => {
                    let count = dec.array()?;
                    let mut list = Vec::new();
                    for _ in 0..count {
                        expect_pair(&mut dec, "output")?;
                        let address = Address::from_bytes(dec.bytes()?)?;
                        let lovelace = dec.uint()?;
                        list.push(TxOutput { address, lovelace });
                    }
                    outputs = Some(list);
                }
                BODY_FEE if fee.is_none() => fee = Some(dec.uint()?),
                BODY_INPUTS | BODY_OUTPUTS | BODY_FEE => {
                    return Err(AdaError::Cbor("duplicate key in transaction body".into()))
                }
                _ => dec.skip()?,
            }
        }

        if !dec.is_at_end() {
            return Err(AdaError::Cbor("trailing bytes after transaction body".into()));
        }

        Ok(Self {
            inputs: inputs.ok_or_else(|| AdaError::Cbor("transaction body has no inputs".into()))?,
            outputs: outputs
                .ok_or_else(|| AdaError::Cbor("transaction body has no outputs".into()))?,
            fee: fee.ok_or_else(|| AdaError::Cbor("transaction body has no fee".into()))?,
        })
    }

    /// Sum of all output values.
    pub fn total_output(&self) -> Result<u64, AdaError> {
        self.outputs.iter().try_fold(0u64, |acc, o| {
            acc.checked_add(o.lovelace)
                .ok_or_else(|| AdaError::TransactionBuildError("output total overflows u64".into()))
        })
    }
}

fn expect_pair(dec: &mut Decoder<'_>, what: &str) -> Result<(), AdaError> {
    match dec.array()? {
        2 => Ok(()),
        n => Err(AdaError::Cbor(format!("{what} must be a 2-element array, got {n}"))),
    }
}

/// An Ed25519 verification key and its signature over the transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VkeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

impl VkeyWitness {
    /// Payment key hash this witness authorizes.
    pub fn key_hash(&self) -> [u8; KEY_HASH_LEN] {
        blake2b_224(&self.vkey)
    }

    pub fn verify(&self, tx_hash: &TxHash) -> Result<(), AdaError> {
        let vkey = VerifyingKey::from_bytes(&self.vkey)
            .map_err(|e| AdaError::SigningError(format!("invalid verification key: {e}")))?;
        let signature = Signature::from_bytes(&self.signature);
        vkey.verify(tx_hash.as_bytes(), &signature)
            .map_err(|e| AdaError::SigningError(format!("signature check failed: {e}")))
    }

    fn placeholder() -> Self {
        Self {
            vkey: [0u8; 32],
            signature: [0u8; 64],
        }
    }
}

/// A complete transaction, signed or not.
///
/// `body_bytes` keeps the body exactly as encoded so the id survives a
/// decode/encode cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub body: TxBody,
    body_bytes: Vec<u8>,
    pub witnesses: Vec<VkeyWitness>,
}

impl Transaction {
    pub fn new(body: TxBody) -> Self {
        let body_bytes = body.encode();
        Self {
            body,
            body_bytes,
            witnesses: Vec::new(),
        }
    }

    pub fn hash(&self) -> TxHash {
        TxHash(blake2b_256(&self.body_bytes))
    }

    pub fn is_signed(&self) -> bool {
        !self.witnesses.is_empty()
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.array(4).raw(&self.body_bytes);

        if self.witnesses.is_empty() {
            enc.map(0);
        } else {
            enc.map(1).uint(WITNESS_VKEYS).array(self.witnesses.len());
            for w in &self.witnesses {
                enc.array(2).bytes(&w.vkey).bytes(&w.signature);
            }
        }

        enc.bool(true).null();
        enc.into_bytes()
    }

    pub fn from_cbor(payload: &[u8]) -> Result<Self, AdaError> {
        let mut dec = Decoder::new(payload);
        let len = dec.array()?;
        if len != 4 {
            return Err(AdaError::Cbor(format!(
                "transaction must be a 4-element array, got {len}"
            )));
        }

        let body_bytes = dec.item_bytes()?.to_vec();
        let body = TxBody::decode(&body_bytes)?;

        let mut witnesses = Vec::new();
        let entries = dec.map()?;
        for _ in 0..entries {
            if dec.uint()? != WITNESS_VKEYS {
                dec.skip()?;
                continue;
            }
            let count = dec.array()?;
            for _ in 0..count {
                expect_pair(&mut dec, "vkey witness")?;
                let vkey: [u8; 32] = dec
                    .bytes()?
                    .try_into()
                    .map_err(|_| AdaError::Cbor("verification key must be 32 bytes".into()))?;
                let signature: [u8; 64] = dec
                    .bytes()?
                    .try_into()
                    .map_err(|_| AdaError::Cbor("signature must be 64 bytes".into()))?;
                witnesses.push(VkeyWitness { vkey, signature });
            }
        }

        if !dec.bool()? {
            return Err(AdaError::Cbor("transaction is flagged invalid".into()));
        }
        if !dec.null()? {
            dec.skip()?;
        }
        if !dec.is_at_end() {
            return Err(AdaError::Cbor("trailing bytes after transaction".into()));
        }

        Ok(Self {
            body,
            body_bytes,
            witnesses,
        })
    }

    /// Key hashes of all witnesses, after checking every signature.
    pub fn verified_signers(&self) -> Result<BTreeSet<[u8; KEY_HASH_LEN]>, AdaError> {
        let hash = self.hash();
        self.witnesses
            .iter()
            .map(|w| w.verify(&hash).map(|_| w.key_hash()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Hashing and signing
// ---------------------------------------------------------------------------

/// Transaction id of a payload: blake2b-256 over its body bytes.
///
/// Witnesses do not influence the result, so the id of a signed payload
/// equals the id of the unsigned payload it came from.
pub fn tx_hash(payload: &[u8]) -> Result<TxHash, AdaError> {
    let mut dec = Decoder::new(payload);
    if dec.array()? == 0 {
        return Err(AdaError::Cbor("transaction array is empty".into()));
    }
    let body = dec.item_bytes()?;
    Ok(TxHash(blake2b_256(body)))
}

/// Add a vkey witness for `signing_key` to a payload and return the new payload.
///
/// Signing twice with the same key replaces the earlier witness rather than
/// duplicating it.
pub fn sign_transaction(payload: &[u8], signing_key: &SigningKey) -> Result<Vec<u8>, AdaError> {
    let mut tx = Transaction::from_cbor(payload)?;
    let hash = tx.hash();

    let witness = VkeyWitness {
        vkey: signing_key.verifying_key().to_bytes(),
        signature: signing_key.sign(hash.as_bytes()).to_bytes(),
    };

    match tx.witnesses.iter_mut().find(|w| w.vkey == witness.vkey) {
        Some(existing) => *existing = witness,
        None => tx.witnesses.push(witness),
    }

    Ok(tx.to_cbor())
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DeclaredInput {
    tx_hash: String,
    index: u32,
    amount: Vec<Asset>,
    owner: Address,
}

/// Declarative transaction builder.
///
/// Outputs and inputs are declared up front; `complete` then tops up the
/// inputs from the funding records (largest first), computes the fee and
/// returns the change to the change address as the last output.
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    fee_params: FeeParams,
    outputs: Vec<(Address, Vec<Asset>)>,
    inputs: Vec<DeclaredInput>,
    change_address: Option<Address>,
    funding: Vec<Utxo>,
}

impl TxBuilder {
    pub fn new(fee_params: FeeParams) -> Self {
        Self {
            fee_params,
            ..Self::default()
        }
    }

    /// Pay `amount` to `address`. An empty amount list pays the minimum output value.
    pub fn tx_out(&mut self, address: &Address, amount: &[Asset]) -> &mut Self {
        self.outputs.push((*address, amount.to_vec()));
        self
    }

    /// Spend output `index` of transaction `tx_hash` (hex), worth `amount` and owned by `owner`.
    ///
    /// The hash is validated by `complete`, so an empty or malformed reference
    /// surfaces there as `AdaError::InvalidTxHash`.
    pub fn tx_in(&mut self, tx_hash: &str, index: u32, amount: &[Asset], owner: &Address) -> &mut Self {
        self.inputs.push(DeclaredInput {
            tx_hash: tx_hash.to_string(),
            index,
            amount: amount.to_vec(),
            owner: *owner,
        });
        self
    }

    pub fn change_address(&mut self, address: &Address) -> &mut Self {
        self.change_address = Some(*address);
        self
    }

    pub fn select_utxos_from(&mut self, utxos: &[Utxo]) -> &mut Self {
        self.funding.extend_from_slice(utxos);
        self
    }

    /// Build the balanced, unsigned transaction.
    pub fn complete(&self) -> Result<Transaction, AdaError> {
        let change_address = self
            .change_address
            .ok_or_else(|| AdaError::TransactionBuildError("change address not set".into()))?;

        let mut outputs = Vec::with_capacity(self.outputs.len() + 1);
        for (address, amount) in &self.outputs {
            let lovelace = if amount.is_empty() {
                MIN_UTXO_LOVELACE
            } else {
                lovelace_of(amount)?
            };
            if lovelace < MIN_UTXO_LOVELACE {
                return Err(AdaError::TransactionBuildError(format!(
                    "output of {lovelace} lovelace is below the minimum of {MIN_UTXO_LOVELACE}"
                )));
            }
            outputs.push(TxOutput {
                address: *address,
                lovelace,
            });
        }
        let output_total = checked_sum(outputs.iter().map(|o| o.lovelace))?;

        let mut inputs: Vec<TxInput> = Vec::new();
        let mut signers = BTreeSet::new();
        let mut input_total: u64 = 0;

        for declared in &self.inputs {
            let tx_hash: TxHash = declared.tx_hash.parse()?;
            let input = TxInput {
                tx_hash,
                index: declared.index,
            };
            if declared.amount.is_empty() {
                return Err(AdaError::TransactionBuildError(format!(
                    "input {input} declares no amount"
                )));
            }
            if inputs.contains(&input) {
                return Err(AdaError::TransactionBuildError(format!(
                    "input {input} declared twice"
                )));
            }
            input_total = checked_sum([input_total, lovelace_of(&declared.amount)?])?;
            signers.insert(*declared.owner.payment_key_hash());
            inputs.push(input);
        }

        let pool: Vec<(&Utxo, u64)> = sort_largest_first(&self.funding)?
            .into_iter()
            .filter(|(utxo, _)| !inputs.contains(&utxo.input()))
            .collect();
        let mut pool = pool.into_iter();

        loop {
            if !inputs.is_empty() {
                if let Some(tx) =
                    self.balance(&inputs, &outputs, input_total, output_total, signers.len(), &change_address)
                {
                    return Ok(tx);
                }
            }

            match pool.next() {
                Some((utxo, value)) => {
                    if inputs.contains(&utxo.input()) {
                        continue;
                    }
                    input_total = checked_sum([input_total, value])?;
                    signers.insert(*utxo.address.payment_key_hash());
                    inputs.push(utxo.input());
                }
                None if inputs.is_empty() => {
                    return Err(AdaError::TransactionBuildError(
                        "no inputs declared and no funding records available".into(),
                    ))
                }
                None if outputs.is_empty() => {
                    return Err(AdaError::TransactionBuildError(format!(
                        "inputs of {input_total} lovelace cannot pay the fee and leave a change output of at least {MIN_UTXO_LOVELACE}"
                    )))
                }
                None => {
                    let fee = self.estimate_fee(&inputs, &outputs, None, signers.len());
                    return Err(AdaError::InsufficientFunds {
                        needed: output_total.saturating_add(fee),
                        available: input_total,
                    });
                }
            }
        }
    }

    /// Try to balance with the current inputs: first with a change output,
    /// then with the remainder folded into the fee.
    fn balance(
        &self,
        inputs: &[TxInput],
        outputs: &[TxOutput],
        input_total: u64,
        output_total: u64,
        witness_count: usize,
        change_address: &Address,
    ) -> Option<Transaction> {
        let remainder = input_total.checked_sub(output_total)?;

        let fee = self.estimate_fee(inputs, outputs, Some(change_address), witness_count);
        if let Some(change) = remainder.checked_sub(fee) {
            if change >= MIN_UTXO_LOVELACE {
                let mut with_change = outputs.to_vec();
                with_change.push(TxOutput {
                    address: *change_address,
                    lovelace: change,
                });
                return Some(Transaction::new(TxBody {
                    inputs: inputs.to_vec(),
                    outputs: with_change,
                    fee,
                }));
            }
        }

        // Folding with no outputs left would burn the whole input as fee.
        if outputs.is_empty() {
            return None;
        }
        let fee = self.estimate_fee(inputs, outputs, None, witness_count);
        if remainder >= fee {
            return Some(Transaction::new(TxBody {
                inputs: inputs.to_vec(),
                outputs: outputs.to_vec(),
                fee: remainder,
            }));
        }

        None
    }

    /// Fee for the signed size, with fee and change encoded at their widest.
    fn estimate_fee(
        &self,
        inputs: &[TxInput],
        outputs: &[TxOutput],
        change_address: Option<&Address>,
        witness_count: usize,
    ) -> u64 {
        let mut outs = outputs.to_vec();
        if let Some(address) = change_address {
            outs.push(TxOutput {
                address: *address,
                lovelace: u64::MAX,
            });
        }

        let mut sized = Transaction::new(TxBody {
            inputs: inputs.to_vec(),
            outputs: outs,
            fee: u64::MAX,
        });
        sized.witnesses = vec![VkeyWitness::placeholder(); witness_count.max(1)];

        self.fee_params.min_fee(sized.to_cbor().len())
    }
}

fn checked_sum(values: impl IntoIterator<Item = u64>) -> Result<u64, AdaError> {
    values.into_iter().try_fold(0u64, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| AdaError::TransactionBuildError("lovelace total overflows u64".into()))
    })
}

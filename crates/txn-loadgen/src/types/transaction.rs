//! Unsigned and signed transactions.
//!
//! A [`Transaction`] starts as a script plus arguments produced by a
//! [`TransactionFactory`](crate::factory::TransactionFactory). The submission
//! engine then binds the payer, proposal key, authorizer and reference block
//! and signs the envelope.

use crate::crypto::{Signature, Signer};
use crate::error::LoadResult;
use crate::types::{Address, Identifier};
use rlp::RlpStream;

/// Gas limit applied to transactions that do not set their own.
pub const DEFAULT_GAS_LIMIT: u64 = 9999;

/// Domain tag prepended to every envelope signing message, right-padded with
/// zeros to 32 bytes.
pub const TRANSACTION_DOMAIN_TAG: [u8; 32] = domain_tag(b"FLOW-V0.0-transaction");

const fn domain_tag(tag: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let mut i = 0;
    while i < tag.len() {
        padded[i] = tag[i];
        i += 1;
    }
    padded
}

/// The account key whose sequence number orders a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProposalKey {
    /// Account owning the key.
    pub address: Address,
    /// Index of the key on the account.
    pub key_index: u32,
    /// Sequence number (nonce) consumed by this transaction.
    pub sequence_number: u64,
}

/// A signature over the transaction envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSignature {
    /// Signing account.
    pub address: Address,
    /// Key index on the signing account.
    pub key_index: u32,
    /// The signature bytes.
    pub signature: Signature,
}

/// A transaction, unsigned until [`Transaction::sign_envelope`] is called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Script source.
    pub script: Vec<u8>,
    /// JSON-encoded script arguments.
    pub arguments: Vec<Vec<u8>>,
    /// Block bounding the transaction's validity window.
    pub reference_block_id: Identifier,
    /// Maximum computation the transaction may use.
    pub gas_limit: u64,
    /// Proposal key and sequence number.
    pub proposal_key: ProposalKey,
    /// Account paying the fees.
    pub payer: Address,
    /// Accounts authorizing the script.
    pub authorizers: Vec<Address>,
    /// Envelope signatures.
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    /// Creates an empty transaction with the default gas limit.
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            arguments: Vec::new(),
            reference_block_id: Identifier::ZERO,
            gas_limit: DEFAULT_GAS_LIMIT,
            proposal_key: ProposalKey::default(),
            payer: Address::ZERO,
            authorizers: Vec::new(),
            envelope_signatures: Vec::new(),
        }
    }

    /// Sets the script source.
    pub fn with_script(mut self, script: impl Into<Vec<u8>>) -> Self {
        self.script = script.into();
        self
    }

    /// Appends an encoded argument.
    pub fn with_argument(mut self, argument: Vec<u8>) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Sets the gas limit.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the fee payer.
    pub fn set_payer(&mut self, address: Address) -> &mut Self {
        self.payer = address;
        self
    }

    /// Sets the proposal key and the sequence number it consumes.
    pub fn set_proposal_key(
        &mut self,
        address: Address,
        key_index: u32,
        sequence_number: u64,
    ) -> &mut Self {
        self.proposal_key = ProposalKey {
            address,
            key_index,
            sequence_number,
        };
        self
    }

    /// Adds an authorizer, ignoring duplicates.
    pub fn add_authorizer(&mut self, address: Address) -> &mut Self {
        if !self.authorizers.contains(&address) {
            self.authorizers.push(address);
        }
        self
    }

    /// Sets the reference block.
    pub fn set_reference_block_id(&mut self, id: Identifier) -> &mut Self {
        self.reference_block_id = id;
        self
    }

    /// Proposer, payer, then authorizers, each listed once. A signature
    /// names its signer by position in this list.
    fn signers(&self) -> Vec<Address> {
        let mut signers = Vec::with_capacity(self.authorizers.len() + 2);
        for address in [self.proposal_key.address, self.payer]
            .into_iter()
            .chain(self.authorizers.iter().copied())
        {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    fn append_payload(&self, stream: &mut RlpStream) {
        stream.begin_list(9);
        stream.append(&self.script);
        stream.begin_list(self.arguments.len());
        for argument in &self.arguments {
            stream.append(argument);
        }
        stream.append(&self.reference_block_id);
        stream.append(&self.gas_limit);
        stream.append(&self.proposal_key.address);
        stream.append(&self.proposal_key.key_index);
        stream.append(&self.proposal_key.sequence_number);
        stream.append(&self.payer);
        stream.begin_list(self.authorizers.len());
        for authorizer in &self.authorizers {
            stream.append(authorizer);
        }
    }

    fn append_signatures(&self, stream: &mut RlpStream, signatures: &[TransactionSignature]) {
        let signers = self.signers();
        let mut indexed: Vec<(usize, &TransactionSignature)> = signatures
            .iter()
            .map(|s| {
                let index = signers
                    .iter()
                    .position(|a| *a == s.address)
                    .unwrap_or(signers.len());
                (index, s)
            })
            .collect();
        indexed.sort_by_key(|(index, s)| (*index, s.key_index));

        stream.begin_list(indexed.len());
        for (index, signature) in indexed {
            stream.begin_list(3);
            stream.append(&(index as u64));
            stream.append(&signature.key_index);
            stream.append(&signature.signature.to_bytes().to_vec());
        }
    }

    /// RLP encoding of the payload alone.
    pub fn payload_message(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        self.append_payload(&mut stream);
        stream.out().to_vec()
    }

    /// Returns the message an envelope signer signs: the domain tag followed
    /// by the RLP encoding of `[payload, payload_signatures]`. Payload
    /// signatures are never used here, so that list is empty.
    pub fn envelope_message(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(2);
        self.append_payload(&mut stream);
        self.append_signatures(&mut stream, &[]);

        let mut message = TRANSACTION_DOMAIN_TAG.to_vec();
        message.extend_from_slice(&stream.out());
        message
    }

    /// Returns the transaction ID: the SHA3-256 digest of
    /// `[payload, payload_signatures, envelope_signatures]`. It changes when
    /// the envelope is signed, so read it after [`Self::sign_envelope`].
    pub fn id(&self) -> Identifier {
        let mut stream = RlpStream::new_list(3);
        self.append_payload(&mut stream);
        self.append_signatures(&mut stream, &[]);
        self.append_signatures(&mut stream, &self.envelope_signatures);
        Identifier::sha3_256(stream.out())
    }

    /// Signs the envelope and records the signature.
    pub fn sign_envelope(
        &mut self,
        address: Address,
        key_index: u32,
        signer: &dyn Signer,
    ) -> LoadResult<()> {
        let signature = signer.sign(&self.envelope_message())?;
        self.envelope_signatures.push(TransactionSignature {
            address,
            key_index,
            signature,
        });
        Ok(())
    }
}

//! Script templates for account creation and token transfers.

use crate::crypto::AccountKey;
use crate::error::LoadResult;
use crate::factory::{CadenceValue, TransactionFactory, UFix64};
use crate::types::{Address, Transaction};

const FUNGIBLE_TOKEN: &str = "FUNGIBLE_TOKEN";
const FLOW_TOKEN: &str = "FLOW_TOKEN";

const CREATE_ACCOUNT_TEMPLATE: &str = r#"
import FungibleToken from 0xFUNGIBLE_TOKEN
import FlowToken from 0xFLOW_TOKEN

transaction(key: String, amount: UFix64) {
    prepare(signer: AuthAccount) {
        let account = AuthAccount(payer: signer)
        account.addPublicKey(key.decodeHex())

        let vault = signer.borrow<&FlowToken.Vault>(from: /storage/flowTokenVault)
            ?? panic("missing sender vault")
        let receiver = account.getCapability(/public/flowTokenReceiver)
            .borrow<&{FungibleToken.Receiver}>()
            ?? panic("missing receiver capability")

        receiver.deposit(from: <-vault.withdraw(amount: amount))
    }
}
"#;

const TRANSFER_TEMPLATE: &str = r#"
import FungibleToken from 0xFUNGIBLE_TOKEN
import FlowToken from 0xFLOW_TOKEN

transaction(amount: UFix64, to: Address) {
    let sentVault: @FungibleToken.Vault

    prepare(signer: AuthAccount) {
        let vault = signer.borrow<&FlowToken.Vault>(from: /storage/flowTokenVault)
            ?? panic("missing sender vault")
        self.sentVault <- vault.withdraw(amount: amount)
    }

    execute {
        let receiver = getAccount(to)
            .getCapability(/public/flowTokenReceiver)
            .borrow<&{FungibleToken.Receiver}>()
            ?? panic("missing receiver capability")
        receiver.deposit(from: <-self.sentVault)
    }
}
"#;

fn bind(template: &str, fungible_token: Address, flow_token: Address) -> String {
    template
        .replace(FUNGIBLE_TOKEN, &fungible_token.to_hex_unprefixed())
        .replace(FLOW_TOKEN, &flow_token.to_hex_unprefixed())
}

/// A [`TransactionFactory`] built from script templates bound to the token
/// contract addresses of one network.
///
/// # Example
///
/// ```rust
/// use txn_loadgen::factory::{ScriptLibrary, TransactionFactory};
/// use txn_loadgen::types::Address;
///
/// let library = ScriptLibrary::new(
///     Address::from_hex("0xee82856bf20e2aa6").unwrap(),
///     Address::from_hex("0x0ae53cb6e3f42a79").unwrap(),
/// );
/// let txn = library.transfer(Address::from_hex("0x01").unwrap(), 10).unwrap();
/// assert_eq!(txn.arguments.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    create_account: String,
    transfer: String,
}

impl ScriptLibrary {
    /// Binds the templates to the given contract addresses.
    pub fn new(fungible_token: Address, flow_token: Address) -> Self {
        Self {
            create_account: bind(CREATE_ACCOUNT_TEMPLATE, fungible_token, flow_token),
            transfer: bind(TRANSFER_TEMPLATE, fungible_token, flow_token),
        }
    }
}

impl TransactionFactory for ScriptLibrary {
    fn create_account(&self, key: &AccountKey, initial_balance: u64) -> LoadResult<Transaction> {
        let key = CadenceValue::String(hex::encode(key.encode()));
        let amount = CadenceValue::UFix64(UFix64::from_parts(initial_balance, 0)?);
        Ok(Transaction::new()
            .with_script(self.create_account.as_bytes())
            .with_argument(key.encode()?)
            .with_argument(amount.encode()?))
    }

    fn transfer(&self, to: Address, amount: u64) -> LoadResult<Transaction> {
        let amount = CadenceValue::UFix64(UFix64::from_parts(0, amount)?);
        let to = CadenceValue::Address(to);
        Ok(Transaction::new()
            .with_script(self.transfer.as_bytes())
            .with_argument(amount.encode()?)
            .with_argument(to.encode()?))
    }
}

//! Intent normalization.
//!
//! [`normalize`] is the single point where loosely-typed intent parameters
//! become a [`NormalizedOperation`]. It is pure: no I/O, no clock, no
//! randomness.

use serde_json::{Map, Value};

use crate::address::Address;
use crate::error::{IntentError, Result};
use crate::intent::{
    AssetCreate, AssetHolding, AssetTransfer, Intent, MultiTransfer, NormalizedOperation, Payout,
    SwapOrder, Transfer, NATIVE_SYMBOL,
};

/// Maximum transactions in one atomic group.
pub const MAX_GROUP_SIZE: usize = 16;
/// Minimum recipients for a multi-recipient transfer.
pub const MIN_MULTI_RECIPIENTS: usize = 2;
/// Largest single amount accepted, in whole units.
pub const MAX_TRANSFER_AMOUNT: f64 = 1_000_000.0;
pub const MAX_ASSET_NAME_BYTES: usize = 32;
pub const MAX_UNIT_NAME_BYTES: usize = 8;
pub const MAX_NOTE_BYTES: usize = 1024;
pub const DEFAULT_SLIPPAGE: f64 = 0.005;
pub const MAX_SLIPPAGE: f64 = 0.5;

/// Validate and canonicalize an intent.
pub fn normalize(intent: &Intent) -> Result<NormalizedOperation> {
    let operation = intent.operation.trim().to_ascii_lowercase();
    let params = Params(&intent.parameters);

    // Reject unknown operations before looking at anything else.
    let kind = match operation.as_str() {
        "send_algo" | "transfer_single" | "send" => Kind::TransferSingle,
        "send_algo_multi" | "transfer_multi" => Kind::TransferMulti,
        "create_nft" | "create_nft_with_image" | "asset_create" => Kind::AssetCreate,
        "send_nft" | "send_nft_multi" | "asset_transfer" => Kind::AssetTransfer,
        "opt_in" | "asset_opt_in" => Kind::OptIn,
        "opt_out" | "asset_opt_out" => Kind::OptOut,
        "swap" => Kind::Swap,
        _ => return Err(IntentError::UnsupportedOperation(intent.operation.clone())),
    };

    if intent.sender.trim().is_empty() {
        return Err(IntentError::MissingField {
            field: "sender".to_string(),
        });
    }
    let sender = Address::parse_field("sender", &intent.sender)?;

    match kind {
        Kind::TransferSingle => transfer_single(sender, &params),
        Kind::TransferMulti => transfer_multi(sender, &params),
        Kind::AssetCreate => asset_create(sender, &params),
        Kind::AssetTransfer => asset_transfer(sender, &params),
        Kind::OptIn => Ok(NormalizedOperation::AssetOptIn(AssetHolding {
            account: sender,
            asset_id: params.asset_id("asset_id")?,
        })),
        Kind::OptOut => Ok(NormalizedOperation::AssetOptOut(AssetHolding {
            account: sender,
            asset_id: params.asset_id("asset_id")?,
        })),
        Kind::Swap => swap(sender, &params),
    }
}

/// Canonical token symbol: native aliases collapse to `ALGO`, everything
/// else is upper-cased.
pub fn canonical_symbol(token: &str) -> String {
    let trimmed = token.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "algo" | "algos" | "algorand" | "microalgo" | "microalgos" => NATIVE_SYMBOL.to_string(),
        _ => trimmed.to_uppercase(),
    }
}

/// Unit label from the upper-case initials of the asset name.
pub fn generate_unit_name(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        "NFT".to_string()
    } else {
        truncate_bytes(&initials, MAX_UNIT_NAME_BYTES)
    }
}

/// Truncate to at most `max` bytes without splitting a character.
pub fn truncate_bytes(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

enum Kind {
    TransferSingle,
    TransferMulti,
    AssetCreate,
    AssetTransfer,
    OptIn,
    OptOut,
    Swap,
}

fn transfer_single(sender: Address, params: &Params<'_>) -> Result<NormalizedOperation> {
    let amount = params.amount("amount")?;
    let receiver = params.address("recipient")?;
    let asset = params.token_or_native()?;

    Ok(NormalizedOperation::TransferSingle(Transfer {
        sender,
        asset,
        payout: Payout { receiver, amount },
    }))
}

fn transfer_multi(sender: Address, params: &Params<'_>) -> Result<NormalizedOperation> {
    let entries = params.array("recipients")?;
    check_group_bounds(entries.len(), MIN_MULTI_RECIPIENTS)?;

    let mut payouts = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let field = format!("recipients[{}]", index);
        let object = entry.as_object().ok_or_else(|| {
            IntentError::invalid_field(&field, "expected an object with address and amount")
        })?;
        let entry_params = Params(object);
        let receiver = entry_params.address_as("address", &format!("{}.address", field))?;
        let amount = entry_params.amount_as("amount", &format!("{}.amount", field))?;
        payouts.push(Payout { receiver, amount });
    }

    Ok(NormalizedOperation::TransferMulti(MultiTransfer {
        sender,
        asset: params.token_or_native()?,
        payouts,
    }))
}

fn asset_create(creator: Address, params: &Params<'_>) -> Result<NormalizedOperation> {
    let raw_name = params.string("name")?;
    let name = truncate_bytes(raw_name.trim(), MAX_ASSET_NAME_BYTES);
    if name.is_empty() {
        return Err(IntentError::MissingField {
            field: "name".to_string(),
        });
    }

    let unit_name = match params.optional_string("unit_name")? {
        Some(unit) if !unit.trim().is_empty() => {
            truncate_bytes(&unit.trim().to_uppercase(), MAX_UNIT_NAME_BYTES)
        }
        _ => generate_unit_name(&name),
    };

    let total = match params.first_present(&["supply", "total_supply", "total"]) {
        Some((field, value)) => whole_number(field, value)?,
        None => 1,
    };

    let url = params
        .optional_string("image_url")?
        .or(params.optional_string("url")?)
        .filter(|url| !url.trim().is_empty());

    let description = params
        .optional_string("description")?
        .filter(|d| !d.trim().is_empty())
        .map(|d| truncate_bytes(&d, MAX_NOTE_BYTES));

    Ok(NormalizedOperation::AssetCreate(AssetCreate {
        creator,
        name,
        unit_name,
        total,
        decimals: 0,
        default_frozen: params.optional_bool("default_frozen")?.unwrap_or(false),
        url,
        description,
        manager: params.optional_address("manager")?,
        reserve: params.optional_address("reserve")?,
        freeze: params.optional_address("freeze")?,
        clawback: params.optional_address("clawback")?,
    }))
}

fn asset_transfer(sender: Address, params: &Params<'_>) -> Result<NormalizedOperation> {
    let asset_id = params.asset_id("asset_id")?;

    let payouts = match params.get("recipients") {
        Some(Value::Array(entries)) => {
            check_group_bounds(entries.len(), 1)?;
            let default_amount = match params.get("amount") {
                Some(_) => params.amount("amount")?,
                None => 1.0,
            };
            let mut payouts = Vec::with_capacity(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                let field = format!("recipients[{}]", index);
                let payout = match entry {
                    Value::String(address) => Payout {
                        receiver: Address::parse_field(&field, address)?,
                        amount: default_amount,
                    },
                    Value::Object(object) => {
                        let entry_params = Params(object);
                        let amount = match entry_params.get("amount") {
                            Some(_) => {
                                entry_params.amount_as("amount", &format!("{}.amount", field))?
                            }
                            None => default_amount,
                        };
                        Payout {
                            receiver: entry_params
                                .address_as("address", &format!("{}.address", field))?,
                            amount,
                        }
                    }
                    _ => {
                        return Err(IntentError::invalid_field(
                            field,
                            "expected an address or an object",
                        ))
                    }
                };
                payouts.push(payout);
            }
            payouts
        }
        Some(_) => {
            return Err(IntentError::invalid_field(
                "recipients",
                "expected an array",
            ))
        }
        None => {
            let amount = match params.get("amount") {
                Some(_) => params.amount("amount")?,
                None => 1.0,
            };
            vec![Payout {
                receiver: params.address("recipient")?,
                amount,
            }]
        }
    };

    Ok(NormalizedOperation::AssetTransfer(AssetTransfer {
        sender,
        asset_id,
        payouts,
    }))
}

fn swap(sender: Address, params: &Params<'_>) -> Result<NormalizedOperation> {
    let from_asset = canonical_symbol(&params.string("from_asset")?);
    let to_asset = canonical_symbol(&params.string("to_asset")?);
    if from_asset.is_empty() {
        return Err(IntentError::MissingField {
            field: "from_asset".to_string(),
        });
    }
    if to_asset.is_empty() {
        return Err(IntentError::MissingField {
            field: "to_asset".to_string(),
        });
    }
    if from_asset == to_asset {
        return Err(IntentError::invalid_field(
            "to_asset",
            format!("cannot swap {} for itself", from_asset),
        ));
    }

    let amount = params.amount("amount")?;

    let slippage = match params.get("slippage") {
        Some(value) => {
            let slippage = number(value).ok_or_else(|| {
                IntentError::invalid_field("slippage", "expected a number")
            })?;
            if !(slippage > 0.0 && slippage <= MAX_SLIPPAGE) {
                return Err(IntentError::invalid_field(
                    "slippage",
                    format!("must be in (0, {}]", MAX_SLIPPAGE),
                ));
            }
            slippage
        }
        None => DEFAULT_SLIPPAGE,
    };

    Ok(NormalizedOperation::Swap(SwapOrder {
        sender,
        from_asset,
        to_asset,
        amount,
        slippage,
    }))
}

fn check_group_bounds(found: usize, min: usize) -> Result<()> {
    if found < min {
        return Err(IntentError::TooFewRecipients { min, found });
    }
    if found > MAX_GROUP_SIZE {
        return Err(IntentError::GroupTooLarge {
            max: MAX_GROUP_SIZE,
            found,
        });
    }
    Ok(())
}

/// Accepts JSON numbers and numeric strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn whole_number(field: &str, value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => Ok(n),
        Some(_) => Err(IntentError::invalid_amount(field, "must be greater than 0")),
        None => Err(IntentError::invalid_amount(
            field,
            "expected a positive whole number",
        )),
    }
}

/// Typed accessors over the raw parameter map.
struct Params<'a>(&'a Map<String, Value>);

impl<'a> Params<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn first_present(&self, names: &[&'static str]) -> Option<(&'static str, &'a Value)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }

    fn require(&self, name: &str) -> Result<&'a Value> {
        self.get(name).ok_or_else(|| IntentError::MissingField {
            field: name.to_string(),
        })
    }

    fn string(&self, name: &str) -> Result<String> {
        match self.require(name)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(IntentError::invalid_field(name, "expected a string")),
        }
    }

    fn optional_string(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(IntentError::invalid_field(name, "expected a string")),
        }
    }

    fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(IntentError::invalid_field(name, "expected a boolean")),
        }
    }

    fn array(&self, name: &str) -> Result<&'a Vec<Value>> {
        match self.require(name)? {
            Value::Array(entries) => Ok(entries),
            _ => Err(IntentError::invalid_field(name, "expected an array")),
        }
    }

    fn address(&self, name: &str) -> Result<Address> {
        self.address_as(name, name)
    }

    fn address_as(&self, name: &str, field: &str) -> Result<Address> {
        match self.get(name) {
            None => Err(IntentError::MissingField {
                field: field.to_string(),
            }),
            Some(Value::String(s)) => Address::parse_field(field, s),
            Some(other) => Err(IntentError::InvalidAddress {
                field: field.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn optional_address(&self, name: &str) -> Result<Option<Address>> {
        match self.get(name) {
            None => Ok(None),
            Some(_) => self.address(name).map(Some),
        }
    }

    fn amount(&self, name: &str) -> Result<f64> {
        self.amount_as(name, name)
    }

    fn amount_as(&self, name: &str, field: &str) -> Result<f64> {
        let value = self.get(name).ok_or_else(|| IntentError::MissingField {
            field: field.to_string(),
        })?;
        let amount =
            number(value).ok_or_else(|| IntentError::invalid_amount(field, "expected a number"))?;

        if !amount.is_finite() || amount <= 0.0 {
            return Err(IntentError::invalid_amount(field, "must be greater than 0"));
        }
        if amount > MAX_TRANSFER_AMOUNT {
            return Err(IntentError::invalid_amount(
                field,
                format!("must not exceed {}", MAX_TRANSFER_AMOUNT),
            ));
        }
        Ok(amount)
    }

    fn asset_id(&self, name: &str) -> Result<u64> {
        let value = self.require(name)?;
        let parsed = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        match parsed {
            Some(id) if id > 0 => Ok(id),
            _ => Err(IntentError::invalid_field(
                name,
                "expected a positive asset id",
            )),
        }
    }

    /// `asset` or `token`, canonicalized; the native unit when absent.
    fn token_or_native(&self) -> Result<String> {
        let token = match self.optional_string("asset")? {
            Some(token) => Some(token),
            None => match self.get("token") {
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => self.optional_string("token")?,
            },
        };
        Ok(token
            .filter(|t| !t.trim().is_empty())
            .map(|t| canonical_symbol(&t))
            .unwrap_or_else(|| NATIVE_SYMBOL.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationKind;
    use serde_json::json;

    fn addr(seed: u8) -> String {
        Address::from_public_key([seed; 32]).to_string()
    }

    fn intent(operation: &str, parameters: Value) -> Intent {
        Intent {
            operation: operation.to_string(),
            sender: addr(1),
            parameters: parameters.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_transfer_single() {
        let op = normalize(&intent(
            "send_algo",
            json!({ "amount": 5, "recipient": addr(2) }),
        ))
        .unwrap();

        match op {
            NormalizedOperation::TransferSingle(t) => {
                assert_eq!(t.asset, "ALGO");
                assert_eq!(t.payout.amount, 5.0);
                assert_eq!(t.payout.receiver.to_string(), addr(2));
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operation() {
        let err = normalize(&intent("mint_money", json!({}))).unwrap_err();
        assert_eq!(err, IntentError::UnsupportedOperation("mint_money".to_string()));
    }

    #[test]
    fn test_invalid_sender() {
        let mut bad = intent("send_algo", json!({ "amount": 1, "recipient": addr(2) }));
        bad.sender = "ADDR1".to_string();
        assert!(matches!(
            normalize(&bad),
            Err(IntentError::InvalidAddress { ref field, .. }) if field == "sender"
        ));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        for amount in [json!(0), json!(-3), json!("0"), json!("abc")] {
            let err = normalize(&intent(
                "send_algo",
                json!({ "amount": amount, "recipient": addr(2) }),
            ))
            .unwrap_err();
            assert!(matches!(err, IntentError::InvalidAmount { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_amount_upper_bound() {
        let err = normalize(&intent(
            "send_algo",
            json!({ "amount": 1_000_001, "recipient": addr(2) }),
        ))
        .unwrap_err();
        assert!(matches!(err, IntentError::InvalidAmount { .. }));
    }

    #[test]
    fn test_multi_requires_two_recipients() {
        for recipients in [json!([]), json!([{ "address": addr(2), "amount": 1 }])] {
            let err = normalize(&intent(
                "send_algo_multi",
                json!({ "recipients": recipients }),
            ))
            .unwrap_err();
            assert!(matches!(err, IntentError::TooFewRecipients { min: 2, .. }));
            assert!(err.kind().is_caller_correctable());
        }
    }

    #[test]
    fn test_multi_first_invalid_recipient_aborts() {
        let err = normalize(&intent(
            "send_algo_multi",
            json!({ "recipients": [
                { "address": addr(2), "amount": 2 },
                { "address": "NOPE", "amount": 2 },
                { "address": addr(4), "amount": -1 },
            ]}),
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            IntentError::InvalidAddress { ref field, .. } if field == "recipients[1].address"
        ));
    }

    #[test]
    fn test_multi_group_limit() {
        let recipients: Vec<Value> = (0..17)
            .map(|i| json!({ "address": addr(10 + i), "amount": 1 }))
            .collect();
        let err = normalize(&intent(
            "send_algo_multi",
            json!({ "recipients": recipients }),
        ))
        .unwrap_err();
        assert!(matches!(err, IntentError::GroupTooLarge { max: 16, found: 17 }));
    }

    #[test]
    fn test_asset_create_defaults() {
        let op = normalize(&intent(
            "create_nft",
            json!({ "name": "Universe", "supply": 10, "description": "a big place" }),
        ))
        .unwrap();

        match op {
            NormalizedOperation::AssetCreate(c) => {
                assert_eq!(c.name, "Universe");
                assert_eq!(c.unit_name, "U");
                assert_eq!(c.total, 10);
                assert_eq!(c.decimals, 0);
                assert_eq!(c.description.as_deref(), Some("a big place"));
                assert!(c.manager.is_none());
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_asset_create_truncates_names() {
        let long_name = "Very Long Collection Name That Goes On And On Forever";
        let op = normalize(&intent(
            "create_nft",
            json!({ "name": long_name, "unit_name": "toolongunit" }),
        ))
        .unwrap();

        match op {
            NormalizedOperation::AssetCreate(c) => {
                assert_eq!(c.name.len(), MAX_ASSET_NAME_BYTES);
                assert_eq!(c.unit_name, "TOOLONGU");
                assert_eq!(c.total, 1);
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_generate_unit_name() {
        assert_eq!(generate_unit_name("Cosmic Dream Art"), "CDA");
        assert_eq!(generate_unit_name("!!! ???"), "NFT");
        assert_eq!(generate_unit_name("a b c d e f g h i j"), "ABCDEFGH");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate_bytes("héllo", 2), "h");
        assert_eq!(truncate_bytes("short", 32), "short");
    }

    #[test]
    fn test_asset_transfer_multi_strings() {
        let op = normalize(&intent(
            "send_nft_multi",
            json!({ "asset_id": "1234", "recipients": [addr(2), addr(3)] }),
        ))
        .unwrap();
        match op {
            NormalizedOperation::AssetTransfer(t) => {
                assert_eq!(t.asset_id, 1234);
                assert_eq!(t.payouts.len(), 2);
                assert!(t.payouts.iter().all(|p| p.amount == 1.0));
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_opt_out_requires_asset_id() {
        let err = normalize(&intent("opt_out", json!({}))).unwrap_err();
        assert!(matches!(err, IntentError::MissingField { .. }));
        let op = normalize(&intent("opt_out", json!({ "asset_id": 9 }))).unwrap();
        assert_eq!(op.kind(), OperationKind::AssetOptOut);
    }

    #[test]
    fn test_swap_canonical_symbols() {
        let op = normalize(&intent(
            "swap",
            json!({ "from_asset": "algos", "to_asset": "usdc", "amount": "2.5" }),
        ))
        .unwrap();
        match op {
            NormalizedOperation::Swap(s) => {
                assert_eq!(s.from_asset, "ALGO");
                assert_eq!(s.to_asset, "USDC");
                assert_eq!(s.amount, 2.5);
                assert_eq!(s.slippage, DEFAULT_SLIPPAGE);
            }
            other => panic!("unexpected operation {:?}", other),
        }

        let err = normalize(&intent(
            "swap",
            json!({ "from_asset": "ALGO", "to_asset": "algorand", "amount": 1 }),
        ))
        .unwrap_err();
        assert!(matches!(err, IntentError::InvalidField { .. }));
    }

    #[test]
    fn test_token_alias_on_transfer() {
        let op = normalize(&intent(
            "send",
            json!({ "amount": 1, "recipient": addr(2), "token": "usdc" }),
        ))
        .unwrap();
        match op {
            NormalizedOperation::TransferSingle(t) => assert_eq!(t.asset, "USDC"),
            other => panic!("unexpected operation {:?}", other),
        }
    }
}

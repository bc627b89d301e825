//! Asset symbol resolution.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use algointent_core::normalize::canonical_symbol;
use algointent_core::{IntentError, Network, Result, NATIVE_SYMBOL};
use algointent_ledger::LedgerClient;
use tracing::debug;

/// Id used for the native unit.
pub const NATIVE_ASSET_ID: u64 = 0;
/// The native unit has six decimal places (microunits).
pub const NATIVE_DECIMALS: u32 = 6;

/// Read-only symbol table, one map per network.
#[derive(Debug)]
pub struct AssetRegistry {
    entries: HashMap<Network, HashMap<&'static str, u64>>,
}

static REGISTRY: OnceLock<AssetRegistry> = OnceLock::new();

impl AssetRegistry {
    /// The process-wide registry, built on first use.
    pub fn global() -> &'static AssetRegistry {
        REGISTRY.get_or_init(Self::builtin)
    }

    fn builtin() -> Self {
        let mainnet = HashMap::from([
            ("USDC", 31566704),
            ("USDT", 312769),
            ("GOBTC", 386192725),
            ("GOETH", 386195940),
            ("GONNA", 2582294183),
        ]);
        let testnet = HashMap::from([("USDC", 10458941)]);

        Self {
            entries: HashMap::from([(Network::MainNet, mainnet), (Network::TestNet, testnet)]),
        }
    }

    /// Look up an already canonical symbol.
    pub fn lookup(&self, network: Network, symbol: &str) -> Option<u64> {
        self.entries.get(&network)?.get(symbol).copied()
    }
}

/// Relative slack allowed between a scaled amount and its nearest base unit.
const BASE_UNIT_TOLERANCE: f64 = 1e-9;

/// An asset id with the precision used to scale whole-unit amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub id: u64,
    pub decimals: u32,
}

impl ResolvedAsset {
    pub fn native() -> Self {
        Self {
            id: NATIVE_ASSET_ID,
            decimals: NATIVE_DECIMALS,
        }
    }

    pub fn is_native(&self) -> bool {
        self.id == NATIVE_ASSET_ID
    }

    /// Scale a whole-unit amount to base units.
    ///
    /// Amounts finer than the asset's precision are rejected, never rounded.
    pub fn to_base_units(&self, field: &str, amount: f64) -> Result<u64> {
        let exact = amount * 10f64.powi(self.decimals as i32);
        if !exact.is_finite() || exact > u64::MAX as f64 {
            return Err(IntentError::InvalidAmount {
                field: field.to_string(),
                message: format!("{} does not fit in base units", amount),
            });
        }
        let scaled = exact.round();
        // Absorb binary representation error only (e.g. 1.1 * 10^6).
        if (exact - scaled).abs() > BASE_UNIT_TOLERANCE * scaled.max(1.0) {
            return Err(IntentError::InvalidAmount {
                field: field.to_string(),
                message: format!(
                    "{} has more precision than asset {} allows ({} decimals)",
                    amount, self.id, self.decimals
                ),
            });
        }
        if scaled < 1.0 {
            return Err(IntentError::InvalidAmount {
                field: field.to_string(),
                message: format!(
                    "{} is below the smallest unit of asset {} ({} decimals)",
                    amount, self.id, self.decimals
                ),
            });
        }
        Ok(scaled as u64)
    }
}

/// Maps symbols and numeric ids to assets on one network.
///
/// Decimals of non-native assets are fetched on every call.
#[derive(Clone)]
pub struct AssetResolver {
    ledger: Arc<dyn LedgerClient>,
    network: Network,
}

impl AssetResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>, network: Network) -> Self {
        Self { ledger, network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub async fn resolve(&self, symbol_or_id: &str) -> Result<ResolvedAsset> {
        let symbol = canonical_symbol(symbol_or_id);
        if symbol == NATIVE_SYMBOL {
            return Ok(ResolvedAsset::native());
        }

        let id = match symbol.parse::<u64>() {
            Ok(id) => id,
            Err(_) => AssetRegistry::global()
                .lookup(self.network, &symbol)
                .ok_or_else(|| IntentError::UnknownAsset {
                    symbol: symbol.clone(),
                    network: self.network,
                })?,
        };
        if id == NATIVE_ASSET_ID {
            return Ok(ResolvedAsset::native());
        }

        let metadata = self.ledger.asset_metadata(id).await?;
        debug!("Resolved {} to asset {} ({} decimals)", symbol, id, metadata.decimals);
        Ok(ResolvedAsset {
            id,
            decimals: metadata.decimals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algointent_core::Address;
    use algointent_ledger::{AssetMetadata, InMemoryLedger};

    async fn ledger_with_usdc() -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::new(Network::TestNet));
        ledger
            .register_asset(AssetMetadata {
                id: 10458941,
                decimals: 6,
                total: 1_000_000_000,
                creator: Address::from_public_key([9; 32]).to_string(),
                unit_name: Some("USDC".to_string()),
                name: Some("USDC".to_string()),
            })
            .await
            .unwrap();
        ledger
    }

    #[test]
    fn test_registry_is_per_network() {
        let registry = AssetRegistry::global();
        assert_eq!(registry.lookup(Network::MainNet, "USDC"), Some(31566704));
        assert_eq!(registry.lookup(Network::TestNet, "USDC"), Some(10458941));
        assert_eq!(registry.lookup(Network::TestNet, "GOBTC"), None);
        assert!(std::ptr::eq(registry, AssetRegistry::global()));
    }

    #[test]
    fn test_base_unit_scaling() {
        let native = ResolvedAsset::native();
        assert_eq!(native.to_base_units("amount", 5.0).unwrap(), 5_000_000);
        assert_eq!(native.to_base_units("amount", 0.1).unwrap(), 100_000);
        assert!(native.to_base_units("amount", 0.0000001).is_err());

        assert_eq!(native.to_base_units("amount", 1.1).unwrap(), 1_100_000);
        assert_eq!(native.to_base_units("amount", 0.000001).unwrap(), 1);
        assert!(matches!(
            native.to_base_units("amount", 1.0000005),
            Err(IntentError::InvalidAmount { .. })
        ));

        let nft = ResolvedAsset { id: 7, decimals: 0 };
        assert_eq!(nft.to_base_units("amount", 2.0).unwrap(), 2);
        assert!(matches!(
            nft.to_base_units("amount", 2.6),
            Err(IntentError::InvalidAmount { .. })
        ));
        assert!(matches!(
            nft.to_base_units("amount", 0.5),
            Err(IntentError::InvalidAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_native_without_network() {
        let ledger = Arc::new(InMemoryLedger::new(Network::TestNet));
        let resolver = AssetResolver::new(ledger.clone(), Network::TestNet);
        assert_eq!(resolver.resolve("algos").await.unwrap(), ResolvedAsset::native());
        assert_eq!(resolver.resolve("0").await.unwrap(), ResolvedAsset::native());
        assert_eq!(ledger.metadata_fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_resolve_symbol_fetches_decimals_each_time() {
        let ledger = ledger_with_usdc().await;
        let resolver = AssetResolver::new(ledger.clone(), Network::TestNet);

        let usdc = resolver.resolve("usdc").await.unwrap();
        assert_eq!(usdc, ResolvedAsset { id: 10458941, decimals: 6 });
        resolver.resolve("10458941").await.unwrap();
        assert_eq!(ledger.metadata_fetch_count().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let ledger = Arc::new(InMemoryLedger::new(Network::TestNet));
        let resolver = AssetResolver::new(ledger.clone(), Network::TestNet);
        let err = resolver.resolve("DOGE").await.unwrap_err();
        assert!(matches!(err, IntentError::UnknownAsset { .. }));
        assert_eq!(ledger.metadata_fetch_count().await, 0);

        let err = resolver.resolve("424242").await.unwrap_err();
        assert!(matches!(err, IntentError::NotFound { .. }));
    }
}

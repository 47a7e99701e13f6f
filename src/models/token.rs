use alloy_primitives::U256;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const DEFAULT_DECIMALS: u8 = 18;

/// Token metadata for one scan. Fields the upstream could not provide are `None`,
/// so "unavailable" stays distinguishable from a real zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenIdentity {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
}

impl TokenIdentity {
    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    pub fn symbol_or_default(&self) -> &str {
        self.symbol.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    pub fn decimals_or_default(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_DECIMALS)
    }

    pub fn supply_or_zero(&self) -> U256 {
        self.total_supply.unwrap_or(U256::ZERO)
    }

    /// Names of the fields that fell back to defaults.
    pub fn unavailable_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.symbol.is_none() {
            missing.push("symbol");
        }
        if self.decimals.is_none() {
            missing.push("decimals");
        }
        if self.total_supply.is_none() {
            missing.push("totalSupply");
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        self.unavailable_fields().len() == 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let identity = TokenIdentity {
            symbol: Some("HEX".into()),
            ..Default::default()
        };
        assert_eq!(identity.name_or_default(), "Unknown");
        assert_eq!(identity.symbol_or_default(), "HEX");
        assert_eq!(identity.decimals_or_default(), 18);
        assert_eq!(identity.supply_or_zero(), U256::ZERO);
        assert_eq!(identity.unavailable_fields(), vec!["name", "decimals", "totalSupply"]);
        assert!(!identity.is_empty());
        assert!(TokenIdentity::default().is_empty());
    }
}

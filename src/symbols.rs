/// Index symbols tracked when no override is configured
pub const DEFAULT_TRACKED_SYMBOLS: [&str; 3] = ["^DJI", "^GSPC", "^IXIC"];

/// Vendor-side identity of a canonical index symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Human-readable index name, if the symbol is a known index
    pub display_name: Option<&'static str>,

    /// Symbol the quote vendor expects (the ETF that tracks the index)
    pub vendor_symbol: String,
}

impl SymbolInfo {
    /// Display name, falling back to the given canonical symbol
    pub fn name_or<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.display_name.unwrap_or(canonical)
    }
}

/// Map a canonical index symbol to its vendor symbol and display name.
///
/// Unknown symbols pass through unchanged with no display name.
pub fn resolve(symbol: &str) -> SymbolInfo {
    let (display_name, vendor_symbol) = match symbol {
        "^DJI" => (Some("Dow Jones"), "DIA"),
        "^GSPC" => (Some("S&P 500"), "SPY"),
        "^IXIC" => (Some("Nasdaq"), "QQQ"),
        other => (None, other),
    };

    SymbolInfo {
        display_name,
        vendor_symbol: vendor_symbol.to_string(),
    }
}

/// Default tracked set as owned strings
pub fn default_tracked() -> Vec<String> {
    DEFAULT_TRACKED_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

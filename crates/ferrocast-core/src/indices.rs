//! Well-known market indices and index ETFs with their Yahoo symbols.

use serde::Serialize;

use crate::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub key: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const fn index(
    key: &'static str,
    symbol: &'static str,
    name: &'static str,
    description: &'static str,
) -> IndexInfo {
    IndexInfo {
        key,
        symbol,
        name,
        description,
    }
}

const CATALOG: [IndexInfo; 16] = [
    index("sp500", "^GSPC", "S&P 500", "500 largest US companies"),
    index("dow_jones", "^DJI", "Dow Jones Industrial Average", "30 leading US industrial companies"),
    index("nasdaq", "^IXIC", "NASDAQ Composite", "All stocks listed on NASDAQ"),
    index("nasdaq100", "^NDX", "NASDAQ 100", "100 largest non-financial NASDAQ companies"),
    index("russell2000", "^RUT", "Russell 2000", "US small caps"),
    index("vix", "^VIX", "CBOE Volatility Index", "Implied volatility of the S&P 500"),
    index("ftse100", "^FTSE", "FTSE 100", "100 largest UK companies"),
    index("dax", "^GDAXI", "DAX", "40 largest German companies"),
    index("cac40", "^FCHI", "CAC 40", "40 largest French companies"),
    index("nikkei225", "^N225", "Nikkei 225", "225 large Japanese companies"),
    index("shanghai", "000001.SS", "Shanghai Composite", "Main Shanghai exchange index"),
    index("hang_seng", "^HSI", "Hang Seng Index", "Main Hong Kong exchange index"),
    index("spy", "SPY", "SPDR S&P 500 ETF", "ETF tracking the S&P 500"),
    index("qqq", "QQQ", "Invesco QQQ Trust", "ETF tracking the NASDAQ 100"),
    index("dia", "DIA", "SPDR Dow Jones Industrial Average ETF", "ETF tracking the Dow Jones"),
    index("iwm", "IWM", "iShares Russell 2000 ETF", "ETF tracking the Russell 2000"),
];

pub fn catalog() -> &'static [IndexInfo] {
    &CATALOG
}

/// Finds an entry by key, symbol or display name, ignoring case.
///
/// Exact matches win; otherwise a display name containing `name` (or
/// contained in it) is accepted.
pub fn lookup(name: &str) -> Option<&'static IndexInfo> {
    let needle = name.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }

    CATALOG
        .iter()
        .find(|info| {
            info.key == needle
                || info.symbol.eq_ignore_ascii_case(&needle)
                || info.name.eq_ignore_ascii_case(&needle)
        })
        .or_else(|| {
            CATALOG.iter().find(|info| {
                let display = info.name.to_ascii_lowercase();
                display.contains(&needle) || needle.contains(&display)
            })
        })
}

/// Provider symbol for an index alias; caret-prefixed symbols pass through.
pub fn resolve_symbol(name: &str) -> Option<Symbol> {
    if let Some(info) = lookup(name) {
        return Symbol::parse(info.symbol).ok();
    }
    if name.trim_start().starts_with('^') {
        return Symbol::parse(name).ok();
    }
    None
}

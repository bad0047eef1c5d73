use crate::error::ConfigError;
use std::collections::HashSet;

/// A tradable asset: the name shown in the selector and the market-data symbol behind it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instrument {
    pub display_name: &'static str,
    pub symbol: &'static str,
}

pub const MAX_INSTRUMENTS: usize = 10;

pub const INSTRUMENTS: &[Instrument] = &[
    Instrument { display_name: "Bitcoin", symbol: "BTC-USD" },
    Instrument { display_name: "Ethereum", symbol: "ETH-USD" },
    Instrument { display_name: "Dogecoin", symbol: "DOGE-USD" },
    Instrument { display_name: "Tron", symbol: "TRX-USD" },
    Instrument { display_name: "Tether", symbol: "USDT-USD" },
    Instrument { display_name: "Shiba", symbol: "SHIB-USD" },
    Instrument { display_name: "Pepe", symbol: "PEPE24478-USD" },
];

/// The instrument preselected when the dashboard opens.
pub fn default_instrument() -> &'static Instrument {
    &INSTRUMENTS[0]
}

/// Name to symbol. The shells carry `&'static Instrument` from the catalog itself,
/// so only tests resolve by name.
#[cfg(test)]
pub fn lookup_symbol(display_name: &str) -> Option<&'static str> {
    find(display_name).map(|i| i.symbol)
}

#[cfg(test)]
pub fn find(display_name: &str) -> Option<&'static Instrument> {
    INSTRUMENTS.iter().find(|i| i.display_name == display_name)
}

/// Checked once at startup; lookups afterwards cannot fail for names drawn from the catalog.
pub fn validate() -> Result<(), ConfigError> {
    validate_entries(INSTRUMENTS)
}

fn validate_entries(entries: &[Instrument]) -> Result<(), ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::Catalog("no instruments defined".to_string()));
    }
    if entries.len() > MAX_INSTRUMENTS {
        return Err(ConfigError::Catalog(format!(
            "{} instruments defined, at most {} allowed",
            entries.len(),
            MAX_INSTRUMENTS
        )));
    }

    let mut names = HashSet::new();
    let mut symbols = HashSet::new();
    for entry in entries {
        if entry.display_name.trim().is_empty() || entry.symbol.trim().is_empty() {
            return Err(ConfigError::Catalog(format!("blank entry {:?}", entry)));
        }
        if !names.insert(entry.display_name) {
            return Err(ConfigError::Catalog(format!(
                "duplicate name {}",
                entry.display_name
            )));
        }
        if !symbols.insert(entry.symbol) {
            return Err(ConfigError::Catalog(format!("duplicate symbol {}", entry.symbol)));
        }
    }
    Ok(())
}

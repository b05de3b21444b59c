//! Read-only country reference data.
//!
//! The tables are static; the lookup indexes over them are built once per
//! process on first use.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Country {
    pub name: &'static str,
    pub iso2: &'static str,
    pub iso3: &'static str,
    pub currency: &'static str,
}

const fn country(
    name: &'static str,
    iso2: &'static str,
    iso3: &'static str,
    currency: &'static str,
) -> Country {
    Country { name, iso2, iso3, currency }
}

pub static COUNTRIES: &[Country] = &[
    country("Argentina", "AR", "ARG", "ARS"),
    country("Australia", "AU", "AUS", "AUD"),
    country("Austria", "AT", "AUT", "EUR"),
    country("Belgium", "BE", "BEL", "EUR"),
    country("Brazil", "BR", "BRA", "BRL"),
    country("Bulgaria", "BG", "BGR", "BGN"),
    country("Canada", "CA", "CAN", "CAD"),
    country("Chile", "CL", "CHL", "CLP"),
    country("China", "CN", "CHN", "CNY"),
    country("Colombia", "CO", "COL", "COP"),
    country("Costa Rica", "CR", "CRI", "CRC"),
    country("Croatia", "HR", "HRV", "EUR"),
    country("Czech Republic", "CZ", "CZE", "CZK"),
    country("Denmark", "DK", "DNK", "DKK"),
    country("Egypt", "EG", "EGY", "EGP"),
    country("Estonia", "EE", "EST", "EUR"),
    country("Finland", "FI", "FIN", "EUR"),
    country("France", "FR", "FRA", "EUR"),
    country("Germany", "DE", "DEU", "EUR"),
    country("Greece", "GR", "GRC", "EUR"),
    country("Hong Kong", "HK", "HKG", "HKD"),
    country("Hungary", "HU", "HUN", "HUF"),
    country("India", "IN", "IND", "INR"),
    country("Indonesia", "ID", "IDN", "IDR"),
    country("Ireland", "IE", "IRL", "EUR"),
    country("Israel", "IL", "ISR", "ILS"),
    country("Italy", "IT", "ITA", "EUR"),
    country("Japan", "JP", "JPN", "JPY"),
    country("Kenya", "KE", "KEN", "KES"),
    country("Malaysia", "MY", "MYS", "MYR"),
    country("Mexico", "MX", "MEX", "MXN"),
    country("Netherlands", "NL", "NLD", "EUR"),
    country("New Zealand", "NZ", "NZL", "NZD"),
    country("Nigeria", "NG", "NGA", "NGN"),
    country("Norway", "NO", "NOR", "NOK"),
    country("Pakistan", "PK", "PAK", "PKR"),
    country("Peru", "PE", "PER", "PEN"),
    country("Philippines", "PH", "PHL", "PHP"),
    country("Poland", "PL", "POL", "PLN"),
    country("Portugal", "PT", "PRT", "EUR"),
    country("Romania", "RO", "ROU", "RON"),
    country("Saudi Arabia", "SA", "SAU", "SAR"),
    country("Singapore", "SG", "SGP", "SGD"),
    country("South Africa", "ZA", "ZAF", "ZAR"),
    country("South Korea", "KR", "KOR", "KRW"),
    country("Spain", "ES", "ESP", "EUR"),
    country("Sweden", "SE", "SWE", "SEK"),
    country("Switzerland", "CH", "CHE", "CHF"),
    country("Thailand", "TH", "THA", "THB"),
    country("Turkey", "TR", "TUR", "TRY"),
    country("Ukraine", "UA", "UKR", "UAH"),
    country("United Arab Emirates", "AE", "ARE", "AED"),
    country("United Kingdom", "GB", "GBR", "GBP"),
    country("United States", "US", "USA", "USD"),
    country("Vietnam", "VN", "VNM", "VND"),
];

const NAME_ALIASES: &[(&str, &str)] = &[
    ("uk", "GB"),
    ("great britain", "GB"),
    ("england", "GB"),
    ("united states of america", "US"),
    ("america", "US"),
    ("czechia", "CZ"),
    ("korea", "KR"),
    ("republic of korea", "KR"),
    ("uae", "AE"),
    ("turkiye", "TR"),
    ("viet nam", "VN"),
    ("the netherlands", "NL"),
    ("holland", "NL"),
];

struct CountryIndex {
    by_key: HashMap<String, &'static Country>,
}

fn index() -> &'static CountryIndex {
    static INDEX: OnceLock<CountryIndex> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut by_key = HashMap::with_capacity(COUNTRIES.len() * 3 + NAME_ALIASES.len());
        for entry in COUNTRIES {
            by_key.insert(entry.iso2.to_ascii_lowercase(), entry);
            by_key.insert(entry.iso3.to_ascii_lowercase(), entry);
            by_key.insert(entry.name.to_ascii_lowercase(), entry);
        }
        for (alias, iso2) in NAME_ALIASES {
            if let Some(entry) = COUNTRIES.iter().find(|entry| entry.iso2 == *iso2) {
                by_key.insert((*alias).to_string(), entry);
            }
        }
        CountryIndex { by_key }
    })
}

/// Resolves a country name, ISO2 or ISO3 code (case-insensitive).
pub fn lookup_country(input: &str) -> Option<&'static Country> {
    let key = input.trim().to_ascii_lowercase();
    if key.is_empty() {
        return None;
    }
    index().by_key.get(&key).copied()
}

pub fn resolve_country_code(input: &str) -> Option<&'static str> {
    lookup_country(input).map(|entry| entry.iso2)
}

pub fn iso3_to_iso2(iso3: &str) -> Option<&'static str> {
    let code = iso3.trim();
    COUNTRIES.iter().find(|entry| entry.iso3.eq_ignore_ascii_case(code)).map(|entry| entry.iso2)
}

pub fn currency_for_country(iso2: &str) -> Option<&'static str> {
    let code = iso2.trim();
    COUNTRIES.iter().find(|entry| entry.iso2.eq_ignore_ascii_case(code)).map(|entry| entry.currency)
}

/// Case-insensitive ISO 4217 comparison.
pub fn same_currency(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

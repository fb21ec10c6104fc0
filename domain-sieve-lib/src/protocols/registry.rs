//! Suffix registry: WHOIS server mappings and the suffix price catalogue.
//!
//! Both tables are plain values built once at startup and handed to whoever
//! needs them. Nothing here is global, so tests can inject a table that
//! points every suffix at a local fake server.

use crate::error::SieveError;
use crate::types::DomainName;
use crate::utils::{normalize_suffix, validate_suffix};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Default WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// Built-in suffix -> WHOIS host mappings.
///
/// Covers the generic TLDs plus every suffix in the price catalogue that has
/// a public port-43 service. `.ph` is deliberately absent: its registry only
/// offers a web lookup.
const BUILTIN_SERVERS: &[(&str, &str)] = &[
    // Legacy gTLDs
    (".com", "whois.verisign-grs.com"),
    (".net", "whois.verisign-grs.com"),
    (".org", "whois.pir.org"),
    (".info", "whois.nic.info"),
    (".biz", "whois.nic.biz"),
    (".name", "whois.nic.name"),
    (".mobi", "whois.nic.mobi"),
    (".pro", "whois.nic.pro"),
    (".asia", "whois.nic.asia"),
    (".tel", "whois.nic.tel"),
    (".jobs", "whois.nic.jobs"),
    // Country codes
    (".io", "whois.nic.io"),
    (".ai", "whois.nic.ai"),
    (".co", "whois.nic.co"),
    (".me", "whois.nic.me"),
    (".tv", "whois.nic.tv"),
    (".cc", "ccwhois.verisign-grs.com"),
    (".nl", "whois.domain-registry.nl"),
    (".in", "whois.registry.in"),
    (".at", "whois.nic.at"),
    (".ir", "whois.nic.ir"),
    (".li", "whois.nic.li"),
    (".pw", "whois.nic.pw"),
    (".uk", "whois.nic.uk"),
    (".de", "whois.denic.de"),
    // Google
    (".app", "whois.nic.google"),
    (".dev", "whois.nic.google"),
    // New gTLDs
    (".xyz", "whois.nic.xyz"),
    (".online", "whois.nic.online"),
    (".vip", "whois.nic.vip"),
    (".live", "whois.nic.live"),
    (".trade", "whois.nic.trade"),
    (".express", "whois.nic.express"),
    (".icu", "whois.nic.icu"),
    (".work", "whois.nic.work"),
    (".zone", "whois.nic.zone"),
    (".site", "whois.nic.site"),
    (".life", "whois.nic.life"),
    (".space", "whois.nic.space"),
    (".club", "whois.nic.club"),
    (".ltd", "whois.nic.ltd"),
    (".link", "whois.nic.link"),
    (".works", "whois.nic.works"),
    (".rocks", "whois.nic.rocks"),
    (".tech", "whois.nic.tech"),
    (".plus", "whois.nic.plus"),
    (".cloud", "whois.nic.cloud"),
    (".observer", "whois.nic.observer"),
    (".direct", "whois.nic.direct"),
    (".store", "whois.nic.store"),
    (".solutions", "whois.nic.solutions"),
    (".shop", "whois.nic.shop"),
    (".website", "whois.nic.website"),
    (".today", "whois.nic.today"),
    (".guru", "whois.nic.guru"),
    (".show", "whois.nic.show"),
    (".london", "whois.nic.london"),
    (".design", "whois.nic.design"),
    (".center", "whois.nic.center"),
    (".news", "whois.nic.news"),
    (".win", "whois.nic.win"),
    (".email", "whois.nic.email"),
    (".company", "whois.nic.company"),
    (".systems", "whois.nic.systems"),
    (".host", "whois.nic.host"),
    (".one", "whois.nic.one"),
    (".loan", "whois.nic.loan"),
    (".business", "whois.nic.business"),
    (".world", "whois.nic.world"),
    (".click", "whois.nic.click"),
    (".ink", "whois.nic.ink"),
    (".market", "whois.nic.market"),
    (".bid", "whois.nic.bid"),
    (".stream", "whois.nic.stream"),
    (".men", "whois.nic.men"),
    (".photography", "whois.nic.photography"),
    (".exchange", "whois.nic.exchange"),
    (".buzz", "whois.nic.buzz"),
    (".international", "whois.nic.international"),
    (".media", "whois.nic.media"),
    (".berlin", "whois.nic.berlin"),
    (".group", "whois.nic.group"),
    (".global", "whois.nic.global"),
    (".art", "whois.nic.art"),
    (".blog", "whois.nic.blog"),
    (".studio", "whois.nic.studio"),
    (".ooo", "whois.nic.ooo"),
    (".digital", "whois.nic.digital"),
    (".services", "whois.nic.services"),
    (".expert", "whois.nic.expert"),
    (".tools", "whois.nic.tools"),
    (".agency", "whois.nic.agency"),
    (".network", "whois.nic.network"),
];

/// Registration prices per suffix, in catalogue order.
///
/// Prices are opaque strings (a local-currency amount); they are copied into
/// ledger entries verbatim.
const SUFFIX_PRICES: &[(&str, &str)] = &[
    (".nl", "6897290"),
    (".info", "4927230"),
    (".xyz", "3605402"),
    (".in", "13264020"),
    (".at", "12130549"),
    (".online", "3557169"),
    (".me", "10699054"),
    (".vip", "16929713"),
    (".live", "4039497"),
    (".trade", "6692301"),
    (".cc", "9960073"),
    (".ir", "450000"),
    (".mobi", "7114338"),
    (".express", "13505184"),
    (".io", "46725525"),
    (".icu", "4482844"),
    (".work", "10418285"),
    (".zone", "13505184"),
    (".site", "2351349"),
    (".life", "3014550"),
    (".space", "2351349"),
    (".club", "16929713"),
    (".ltd", "8983359"),
    (".link", "9067766"),
    (".works", "9887724"),
    (".pro", "4721929"),
    (".asia", "14325142"),
    (".app", "19244887"),
    (".rocks", "5064444"),
    (".tech", "4762989"),
    (".plus", "13505184"),
    (".cloud", "18666094"),
    (".biz", "20836570"),
    (".dev", "16495618"),
    (".observer", "11394999"),
    (".direct", "18027009"),
    (".store", "3557169"),
    (".solutions", "9887724"),
    (".shop", "2399582"),
    (".website", "2351349"),
    (".today", "4039497"),
    (".name", "8296042"),
    (".guru", "4039497"),
    (".show", "16218279"),
    (".london", "36488113"),
    (".design", "50933837"),
    (".center", "10792089"),
    (".news", "13505184"),
    (".tel", "11202068"),
    (".win", "6692301"),
    (".email", "6089391"),
    (".company", "8139285"),
    (".systems", "24357564"),
    (".li", "8513089"),
    (".host", "97671420"),
    (".one", "17303517"),
    (".loan", "6692301"),
    (".business", "4039497"),
    (".world", "3014550"),
    (".click", "2399582"),
    (".ink", "26045712"),
    (".market", "40768774"),
    (".tv", "31110156"),
    (".bid", "6692301"),
    (".stream", "6692301"),
    (".men", "6692301"),
    (".pw", "7174629"),
    (".photography", "13505184"),
    (".exchange", "13505184"),
    (".ph", "54985392"),
    (".buzz", "33642378"),
    (".international", "13505184"),
    (".media", "8139285"),
    (".berlin", "55720942"),
    (".jobs", "198960300"),
    (".group", "9887724"),
    (".global", "36114309"),
    (".art", "3574321"),
    (".blog", "4762989"),
    (".studio", "19835739"),
    (".ooo", "27480638"),
    (".digital", "3014550"),
    (".services", "10792089"),
    (".expert", "10792089"),
    (".tools", "16218279"),
    (".agency", "8139285"),
    (".network", "8139285"),
];

/// Address of one WHOIS service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhoisServer {
    pub host: String,
    pub port: u16,
}

impl WhoisServer {
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host` or `host:port`.
    pub fn parse(spec: &str) -> Result<Self, SieveError> {
        let spec = spec.trim();
        let (host, port) = match spec.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    SieveError::config(format!("Invalid port in WHOIS server '{}'", spec))
                })?;
                (host, port)
            }
            None => (spec, WHOIS_PORT),
        };

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(SieveError::config(format!(
                "Invalid WHOIS server host '{}'",
                spec
            )));
        }

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for WhoisServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Immutable suffix -> WHOIS server table, injected into the query client.
#[derive(Debug, Clone, Default)]
pub struct WhoisServerTable {
    servers: HashMap<String, WhoisServer>,
}

impl WhoisServerTable {
    /// An empty table; every lookup through it yields "no server mapping".
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in mappings.
    pub fn builtin() -> Self {
        let servers = BUILTIN_SERVERS
            .iter()
            .map(|(suffix, host)| (suffix.to_string(), WhoisServer::new(*host, WHOIS_PORT)))
            .collect();
        Self { servers }
    }

    /// Add or replace the server for a suffix.
    pub fn with_server(mut self, suffix: &str, server: WhoisServer) -> Self {
        self.servers.insert(normalize_suffix(suffix), server);
        self
    }

    /// Apply `suffix = "host[:port]"` overrides from configuration.
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<String, String>,
    ) -> Result<Self, SieveError> {
        for (suffix, spec) in overrides {
            let suffix = normalize_suffix(suffix);
            validate_suffix(&suffix)?;
            self.servers.insert(suffix, WhoisServer::parse(spec)?);
        }
        Ok(self)
    }

    /// Find the server for a domain.
    ///
    /// The full suffix is tried first, then progressively shorter ones, so
    /// `.co.uk` falls back to `.uk` when only the latter is mapped.
    pub fn server_for(&self, domain: &DomainName) -> Option<&WhoisServer> {
        let mut suffix = domain.suffix();
        loop {
            if let Some(server) = self.servers.get(suffix) {
                return Some(server);
            }
            // Drop the leftmost label: ".co.uk" -> ".uk"
            match suffix[1..].find('.') {
                Some(next) => suffix = &suffix[next + 1..],
                None => return None,
            }
        }
    }

    pub fn contains(&self, suffix: &str) -> bool {
        self.servers.contains_key(&normalize_suffix(suffix))
    }

    /// All mapped suffixes, sorted alphabetically.
    pub fn suffixes(&self) -> Vec<String> {
        let mut suffixes: Vec<String> = self.servers.keys().cloned().collect();
        suffixes.sort();
        suffixes
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// How to order the price catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrder {
    /// Catalogue order
    Unsorted,
    Ascending,
    Descending,
}

/// Suffix -> registration price list.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    entries: Vec<(String, String)>,
}

impl PriceCatalog {
    /// The built-in catalogue. Duplicate suffixes keep their first price.
    pub fn builtin() -> Self {
        let mut catalog = Self {
            entries: Vec::with_capacity(SUFFIX_PRICES.len()),
        };
        for (suffix, price) in SUFFIX_PRICES {
            if catalog.price_for(suffix).is_none() {
                catalog
                    .entries
                    .push((suffix.to_string(), price.to_string()));
            }
        }
        catalog
    }

    /// Apply `suffix = "price"` overrides; unknown suffixes are appended.
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<String, String>,
    ) -> Result<Self, SieveError> {
        // Sorted so appended entries land in a stable order
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort();

        for key in keys {
            let suffix = normalize_suffix(key);
            validate_suffix(&suffix)?;
            let price = overrides[key].clone();
            match self.entries.iter_mut().find(|(s, _)| *s == suffix) {
                Some(entry) => entry.1 = price,
                None => self.entries.push((suffix, price)),
            }
        }
        Ok(self)
    }

    pub fn price_for(&self, suffix: &str) -> Option<&str> {
        let suffix = normalize_suffix(suffix);
        self.entries
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|(_, price)| price.as_str())
    }

    /// Entries in the requested order.
    ///
    /// Unparsable prices count as the most expensive: last when ascending,
    /// first when descending.
    pub fn entries(&self, order: PriceOrder) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(s, p)| (s.as_str(), p.as_str()))
            .collect();

        match order {
            PriceOrder::Unsorted => {}
            PriceOrder::Ascending => {
                entries.sort_by(|a, b| compare_prices(a.1, b.1));
            }
            PriceOrder::Descending => {
                entries.sort_by(|a, b| compare_prices(b.1, a.1));
            }
        }

        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Numeric value of a price string; thousands separators are ignored.
pub fn price_to_number(price: &str) -> Option<f64> {
    price.replace(',', "").trim().parse::<f64>().ok()
}

// Unparsable prices rank as infinitely expensive.
fn compare_prices(a: &str, b: &str) -> Ordering {
    let a = price_to_number(a).unwrap_or(f64::INFINITY);
    let b = price_to_number(b).unwrap_or(f64::INFINITY);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

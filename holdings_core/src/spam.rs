//! Heuristic spam-token filtering.

/// Terms commonly planted in airdrop-scam token names and symbols.
const DENYLIST: [&str; 12] = [
    "claim",
    "claimable",
    "reward",
    "rewards",
    "visit",
    "http://",
    "https://",
    "t.me/",
    "t.ly/",
    ".org",
    ".com",
    ".io",
];

/// Case-insensitive substring matcher over a fixed denylist. A legitimate
/// token whose name contains a listed term is still flagged.
#[derive(Debug, Clone)]
pub struct SpamClassifier {
    denylist: Vec<String>,
}

impl Default for SpamClassifier {
    fn default() -> Self {
        Self {
            denylist: DENYLIST.iter().map(|term| term.to_string()).collect(),
        }
    }
}

impl SpamClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when either the name or the symbol contains a denylisted term.
    pub fn is_spam(&self, name: &str, symbol: &str) -> bool {
        let name_lower = name.to_lowercase();
        let symbol_lower = symbol.to_lowercase();

        self.denylist
            .iter()
            .any(|term| name_lower.contains(term) || symbol_lower.contains(term))
    }
}

//! Supported chain registry.
//!
//! Loaded once at process start as static data and never mutated. Unknown
//! chain ids resolve to `None`; callers skip them with a warning rather than
//! panicking.

/// Immutable description of one supported chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub display_name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub native_symbol: &'static str,
    pub logo_url: &'static str,
}

/// Native currencies on all supported chains use 18 decimals.
pub const NATIVE_DECIMALS: u8 = 18;

pub const CHAINS: &[ChainDescriptor] = &[
    ChainDescriptor {
        chain_id: 1,
        display_name: "Ethereum Mainnet",
        rpc_url: "https://ethereum.rpc.thirdweb.com",
        explorer_url: "https://etherscan.io",
        native_symbol: "ETH",
        logo_url: "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/ethereum/info/logo.png",
    },
    ChainDescriptor {
        chain_id: 10,
        display_name: "Optimism Mainnet",
        rpc_url: "https://optimism.rpc.thirdweb.com",
        explorer_url: "https://optimistic.etherscan.io",
        native_symbol: "ETH",
        logo_url: "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/optimism/info/logo.png",
    },
    ChainDescriptor {
        chain_id: 137,
        display_name: "Polygon Mainnet",
        rpc_url: "https://polygon.rpc.thirdweb.com",
        explorer_url: "https://polygonscan.com",
        native_symbol: "MATIC",
        logo_url: "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/polygon/info/logo.png",
    },
    ChainDescriptor {
        chain_id: 8453,
        display_name: "Base Mainnet",
        rpc_url: "https://base.rpc.thirdweb.com",
        explorer_url: "https://basescan.org",
        native_symbol: "ETH",
        logo_url: "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/base/info/logo.png",
    },
    ChainDescriptor {
        chain_id: 42161,
        display_name: "Arbitrum One",
        rpc_url: "https://arbitrum.rpc.thirdweb.com",
        explorer_url: "https://arbiscan.io",
        native_symbol: "ETH",
        logo_url: "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/arbitrum/info/logo.png",
    },
    ChainDescriptor {
        chain_id: 43114,
        display_name: "Avalanche Mainnet",
        rpc_url: "https://avalanche.rpc.thirdweb.com",
        explorer_url: "https://snowtrace.io",
        native_symbol: "AVAX",
        logo_url: "https://icons.llama.fi/avalanche.png",
    },
    ChainDescriptor {
        chain_id: 11155111,
        display_name: "Ethereum Sepolia",
        rpc_url: "https://rpc.sepolia.org",
        explorer_url: "https://sepolia.etherscan.io",
        native_symbol: "ETH",
        logo_url: "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/sepolia/info/logo.png",
    },
];

/// Look up a chain descriptor by id.
pub fn chain_by_id(chain_id: u64) -> Option<&'static ChainDescriptor> {
    CHAINS.iter().find(|chain| chain.chain_id == chain_id)
}

/// All registered chain ids, in registry order.
pub fn supported_chain_ids() -> Vec<u64> {
    CHAINS.iter().map(|chain| chain.chain_id).collect()
}

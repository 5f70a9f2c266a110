// =============================================================================
// Hyperliquid REST integration — info (read) and exchange (signed write)
// =============================================================================

pub mod client;
pub mod exchange;

pub use client::InfoClient;
pub use exchange::ExchangeClient;

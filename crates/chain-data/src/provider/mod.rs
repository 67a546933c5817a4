//! Blockchain data providers.

pub mod blockchair;
mod traits;

pub use blockchair::BlockchairProvider;
pub use traits::ChainDataProvider;

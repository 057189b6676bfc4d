pub mod browse;
pub mod marketplace;

pub use browse::BrowseClient;
pub use marketplace::{
    ItemDetails, ItemLookup, Marketplace, MarketplaceError, MarketplaceItem, MarketplaceSearch,
    UpstreamQuery,
};

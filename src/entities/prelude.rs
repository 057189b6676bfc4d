pub use super::jobs::Entity as Jobs;
pub use super::saved_items::Entity as SavedItems;
pub use super::search_cache::Entity as SearchCache;
pub use super::search_sessions::Entity as SearchSessions;
pub use super::swipe_history::Entity as SwipeHistory;
pub use super::wishlists::Entity as Wishlists;

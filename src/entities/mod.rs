pub mod prelude;

pub mod jobs;
pub mod saved_items;
pub mod search_cache;
pub mod search_sessions;
pub mod swipe_history;
pub mod wishlists;

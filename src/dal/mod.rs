pub mod blob_store;
pub mod name_cache_db;

pub mod category;
pub mod detail;
pub mod discovery;
pub mod ops;
pub mod stream;
pub mod watchlist;

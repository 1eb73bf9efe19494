pub mod poster;
pub mod shortener;

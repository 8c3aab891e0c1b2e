mod app;
pub mod new_book;

pub use app::app;

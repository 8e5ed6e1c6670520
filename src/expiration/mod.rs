mod cleaner;

pub use cleaner::start_no_show_cleaner;

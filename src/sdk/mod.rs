/// Opening the application's stores.
///
/// The application constructs its stores once at startup through [`open`]
/// and calls [`LocalStore::flush`](crate::LocalStore::flush) on each before exit.
pub mod discovery;

pub use discovery::{data_dir, open, open_in, open_with, DATA_DIR_ENV};

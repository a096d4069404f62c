pub mod codec;
pub mod persistence;
pub mod store;

pub use codec::{Codec, FnCodec, JsonCodec};
pub use persistence::{Persistence, Snapshot, StoreData};
pub use store::LocalStore;

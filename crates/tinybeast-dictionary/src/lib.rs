pub mod store;

pub use store::FsDictionaryStore;

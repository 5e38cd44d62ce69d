pub mod aggregate;
pub mod keys;
pub mod locks;
pub mod normalize;
pub mod side_channel;
pub mod store;

pub use aggregate::Snapshot;
pub use store::Ledger;

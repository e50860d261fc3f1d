// ── State storage ──

mod lock_store;

pub use lock_store::LockStateStore;

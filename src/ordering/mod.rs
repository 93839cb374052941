//! Ordering module: Portable Memory Ordering Primitives
//!
//! Prinsip desain:
//! - Kontrak per barrier, bukan per arsitektur: call site tidak pernah
//!   tahu instruction encoding yang dipakai
//! - Profil kemampuan hardware dipilih saat compile time
//! - Ordered store untuk data sempit lewat strategy table, bukan
//!   overload per tipe

mod barriers;
mod cross_modify;
mod store;

pub use barriers::{
    acquire, fence, loadload, loadstore, release, storestore, Barrier, ModelProfile,
    OrderedScope, ScopePolicy, PROFILE, PUBLISH_SCOPE, RETIRE_SCOPE,
};
pub use cross_modify::{cross_modify_fence, sync_core_accelerated};
pub use store::{
    ordered_store_u16, ordered_store_u32, ordered_store_u64, ordered_store_u8, strategy_for,
    StoreOrdering, StoreStrategy,
};

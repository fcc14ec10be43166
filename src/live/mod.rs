pub mod feed;
pub mod subscription;

pub use feed::{listen_postgres, ChangeEvent, ChangeFeedHub, ChangeOp};
pub use subscription::{SyncEngine, SyncError, TableSnapshot, TableSubscription};

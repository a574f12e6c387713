pub mod cashfree;
pub mod in_memory;
pub mod notifier;
pub mod razorpay;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

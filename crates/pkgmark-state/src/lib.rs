mod error;
mod fs_utils;
mod layout;
mod mark;
mod receipts;
mod store;
mod types;

pub use error::MarkError;
pub use layout::{default_user_prefix, validate_package_name, PrefixLayout};
pub use mark::{apply_mark, apply_mark_to_all, apply_mark_to_all_with, ensure_all_installed};
pub use receipts::{read_install_receipt, read_install_receipts, update_receipt_flags};
pub use store::{MetadataStore, PackageLock, ReceiptStore};
pub use types::{InstallReceipt, MarkIntent, MarkOutcome};

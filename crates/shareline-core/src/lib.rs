//! Core engine for shareline: reliable record appends to remote file shares.
//!
//! The hard problem here is appending one structured record (a CSV line or a
//! spreadsheet row) to a file on a remote, unreliable share. Naive
//! open-and-append is unsafe: the connection can drop mid-write, the payload
//! may need encryption at rest, and spreadsheet targets have to be decoded,
//! mutated, and rewritten in full on every append. This crate provides:
//!
//! - **Target location**: `smb://host/share/path` decomposition ([`target`])
//! - **Directory creation on demand** ([`ensure`])
//! - **Payload building**: line mode and spreadsheet mode ([`payload`])
//! - **Authenticated-encryption envelopes** with device-bound or
//!   passphrase-derived keys ([`envelope`], [`crypto`])
//! - **Atomic-ish writes** via a temp sibling and copy-then-delete swap
//! - **Bounded retries** with a fresh connection per attempt, and a
//!   worker-per-request service front end ([`service`])
//! - **Offline spooling** for records that could not be delivered ([`spool`])
//!
//! The share transport itself is a seam: implement [`transport::ShareClient`]
//! for a real SMB stack, or use [`transport::local::LocalShareClient`] for
//! shares the OS has already mounted. Tests run against
//! [`transport::mock::MockShareClient`].

pub mod audit;
pub mod crypto;
pub mod ensure;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod payload;
pub mod request;
pub mod service;
pub mod spool;
pub mod target;
pub mod transport;
pub mod workbook;

mod attempt;
mod retry;
mod writer;

pub use error::WriteError;
pub use request::{
    Credentials, EncryptionSpec, PayloadFormat, RetryPolicy, SpreadsheetSpec, WriteRequest,
};
pub use service::{ShareWriter, WriteReceipt};
pub use target::ParsedTarget;

//! Payload building: turn one record line into the exact bytes to write.
//!
//! Every attempt rebuilds its payload from the target's current state, so a
//! retry after a partial failure starts from what is actually on the share
//! instead of assuming prior progress. Modes that rewrite the whole object
//! (atomic line writes, envelopes, workbooks) carry every existing record
//! forward into the new image; a write never drops history.

pub mod line;
pub mod sheet;

use crate::crypto::{CryptoError, KeyStore};
use crate::envelope;
use crate::error::WriteError;
use crate::request::{EncryptionSpec, PayloadFormat, WriteRequest};
use crate::target::ParsedTarget;
use crate::transport::ShareHandle;
use crate::workbook::WorkbookCodec;
use std::sync::Arc;

/// Bytes the writer will put on the share, tagged by how they relate to the
/// target's current content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Payload {
    /// A delta to append after the target's existing bytes.
    Append(Vec<u8>),
    /// A complete image of the target, existing records included.
    Replace(Vec<u8>),
}

/// Build the bytes this attempt will write.
///
/// Plain line mode in a non-atomic request yields a delta; every other
/// combination reads the target's current content and produces a full
/// replacement image. Key stretching, sealing, and workbook serialization
/// are CPU-bound and run on blocking tasks so they never stall the runtime.
pub(crate) async fn build(
    handle: &dyn ShareHandle,
    target: &ParsedTarget,
    request: &WriteRequest,
    keystore: &Arc<dyn KeyStore>,
    codec: &Arc<dyn WorkbookCodec>,
) -> Result<Payload, WriteError> {
    match &request.format {
        PayloadFormat::Line { encryption } => {
            let exists = handle.file_exists(&target.relative_path).await?;
            match encryption {
                None => {
                    let rendered = line::render(&request.line, exists);
                    if !request.atomic {
                        return Ok(Payload::Append(rendered));
                    }
                    let mut content = if exists {
                        handle.read_file(&target.relative_path).await?
                    } else {
                        Vec::new()
                    };
                    content.extend_from_slice(&rendered);
                    Ok(Payload::Replace(content))
                }
                Some(spec) => {
                    let existing = if exists {
                        Some(handle.read_file(&target.relative_path).await?)
                    } else {
                        None
                    };
                    let spec = spec.clone();
                    let record = request.line.clone();
                    let keystore = Arc::clone(keystore);
                    let sealed = tokio::task::spawn_blocking(move || {
                        reseal(existing.as_deref(), &record, &spec, keystore.as_ref())
                    })
                    .await
                    .map_err(|_| WriteError::WorkerLost)??;
                    Ok(Payload::Replace(sealed))
                }
            }
        }
        PayloadFormat::Spreadsheet(spec) => {
            let existing = if handle.file_exists(&target.relative_path).await? {
                Some(handle.read_file(&target.relative_path).await?)
            } else {
                None
            };
            let spec = spec.clone();
            let record = request.line.clone();
            let codec = Arc::clone(codec);
            let bytes = tokio::task::spawn_blocking(move || {
                sheet::append_record(existing.as_deref(), &record, &spec, codec.as_ref())
            })
            .await
            .map_err(|_| WriteError::WorkerLost)??;
            Ok(Payload::Replace(bytes))
        }
    }
}

/// Extend an enveloped target with one more record and seal the result.
///
/// The existing envelope is opened under the same spec, the rendered line is
/// appended to its plaintext, and the full content is resealed with a fresh
/// IV (and salt). A target that exists but is not an envelope openable under
/// this spec fails the attempt; nothing here ever degrades to plaintext.
fn reseal(
    existing: Option<&[u8]>,
    record: &str,
    spec: &EncryptionSpec,
    keystore: &dyn KeyStore,
) -> Result<Vec<u8>, CryptoError> {
    let mut plaintext = match existing {
        Some(sealed) => open(sealed, spec, keystore)?,
        None => Vec::new(),
    };
    plaintext.extend_from_slice(&line::render(record, existing.is_some()));
    seal(&plaintext, spec, keystore)
}

fn seal(
    plaintext: &[u8],
    spec: &EncryptionSpec,
    keystore: &dyn KeyStore,
) -> Result<Vec<u8>, CryptoError> {
    match spec {
        EncryptionSpec::DeviceKey { alias } => {
            let key = keystore.get_or_create(alias)?;
            envelope::seal_with_key(plaintext, &key)
        }
        EncryptionSpec::PassphraseKey { passphrase } => {
            envelope::seal_with_passphrase(plaintext, passphrase)
        }
    }
}

fn open(
    sealed: &[u8],
    spec: &EncryptionSpec,
    keystore: &dyn KeyStore,
) -> Result<Vec<u8>, CryptoError> {
    match spec {
        EncryptionSpec::DeviceKey { alias } => {
            let key = keystore.get_or_create(alias)?;
            envelope::open_with_key(sealed, &key)
        }
        EncryptionSpec::PassphraseKey { passphrase } => {
            envelope::open_with_passphrase(sealed, passphrase)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MemoryKeyStore;
    use crate::transport::mock::MockShareClient;
    use crate::transport::{ShareClient, ShareHandle};
    use crate::workbook::{WorkbookCodec, XlsxCodec};

    async fn open_handle(client: &MockShareClient) -> Box<dyn ShareHandle> {
        let mut conn = client.connect("host").await.unwrap();
        conn.authenticate("u", "p").await.unwrap();
        conn.open_share("records").await.unwrap()
    }

    fn deps() -> (Arc<dyn KeyStore>, Arc<dyn WorkbookCodec>) {
        (
            Arc::new(MemoryKeyStore::new()),
            Arc::new(XlsxCodec::new()),
        )
    }

    fn replace_bytes(payload: Payload) -> Vec<u8> {
        match payload {
            Payload::Replace(bytes) => bytes,
            other => panic!("expected a replacement image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn atomic_line_image_carries_existing_records_forward() {
        let client = MockShareClient::new();
        let handle = open_handle(&client).await;
        let (keystore, codec) = deps();
        let target = ParsedTarget::parse("smb://h/records/visits.csv").unwrap();
        let request = WriteRequest::new("smb://h/records/visits.csv", "a,b");

        let first = replace_bytes(
            build(handle.as_ref(), &target, &request, &keystore, &codec)
                .await
                .unwrap(),
        );
        assert!(first.starts_with(line::CSV_HEADER.as_bytes()));
        assert!(first.ends_with(b"a,b\n"));

        client.put_file("records", "visits.csv", first.clone());
        let request = WriteRequest::new("smb://h/records/visits.csv", "c,d");
        let second = replace_bytes(
            build(handle.as_ref(), &target, &request, &keystore, &codec)
                .await
                .unwrap(),
        );
        // One header, then both records in order.
        let text = String::from_utf8(second).unwrap();
        assert_eq!(text, format!("{}\na,b\nc,d\n", line::CSV_HEADER));
    }

    #[tokio::test]
    async fn non_atomic_line_payload_is_a_delta() {
        let client = MockShareClient::new();
        let handle = open_handle(&client).await;
        let (keystore, codec) = deps();
        let target = ParsedTarget::parse("smb://h/records/visits.csv").unwrap();
        let mut request = WriteRequest::new("smb://h/records/visits.csv", "a,b");
        request.atomic = false;

        let first = build(handle.as_ref(), &target, &request, &keystore, &codec)
            .await
            .unwrap();
        match first {
            Payload::Append(bytes) => assert!(bytes.starts_with(line::CSV_HEADER.as_bytes())),
            other => panic!("expected an appendable delta, got {other:?}"),
        }

        client.put_file("records", "visits.csv", "already there\n");
        let second = build(handle.as_ref(), &target, &request, &keystore, &codec)
            .await
            .unwrap();
        assert_eq!(second, Payload::Append(b"a,b\n".to_vec()));
    }

    #[tokio::test]
    async fn enveloped_line_payload_accumulates_plaintext_records() {
        let client = MockShareClient::new();
        let handle = open_handle(&client).await;
        let (keystore, codec) = deps();
        let target = ParsedTarget::parse("smb://h/records/visits.csv").unwrap();
        let mut request = WriteRequest::new("smb://h/records/visits.csv", "a,b");
        request.format = PayloadFormat::Line {
            encryption: Some(EncryptionSpec::PassphraseKey {
                passphrase: "pw".to_string(),
            }),
        };

        let first = replace_bytes(
            build(handle.as_ref(), &target, &request, &keystore, &codec)
                .await
                .unwrap(),
        );
        assert_eq!(&first[..8], envelope::MAGIC);

        client.put_file("records", "visits.csv", first);
        request.line = "c,d".to_string();
        let second = replace_bytes(
            build(handle.as_ref(), &target, &request, &keystore, &codec)
                .await
                .unwrap(),
        );

        let opened = envelope::open_with_passphrase(&second, "pw").unwrap();
        let text = String::from_utf8(opened).unwrap();
        assert_eq!(text, format!("{}\na,b\nc,d\n", line::CSV_HEADER));
    }

    #[tokio::test]
    async fn envelope_target_with_the_wrong_key_fails_the_attempt() {
        let client = MockShareClient::new();
        let handle = open_handle(&client).await;
        let (keystore, codec) = deps();
        let target = ParsedTarget::parse("smb://h/records/visits.csv").unwrap();

        let sealed = envelope::seal_with_passphrase(b"rows\n", "right").unwrap();
        client.put_file("records", "visits.csv", sealed);

        let mut request = WriteRequest::new("smb://h/records/visits.csv", "a,b");
        request.format = PayloadFormat::Line {
            encryption: Some(EncryptionSpec::PassphraseKey {
                passphrase: "wrong".to_string(),
            }),
        };
        let err = build(handle.as_ref(), &target, &request, &keystore, &codec)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Encryption(_)));
    }

    #[tokio::test]
    async fn spreadsheet_payload_rebuilds_the_container() {
        let client = MockShareClient::new();
        let handle = open_handle(&client).await;
        let (keystore, codec) = deps();
        let target = ParsedTarget::parse("smb://h/records/visits.xlsx").unwrap();
        let mut request = WriteRequest::new("smb://h/records/visits.xlsx", "t,Ana,5,a@b,1,M,C,v");
        request.format = PayloadFormat::Spreadsheet(Default::default());

        let bytes = replace_bytes(
            build(handle.as_ref(), &target, &request, &keystore, &codec)
                .await
                .unwrap(),
        );
        let doc = XlsxCodec::new().decode(&bytes).unwrap();
        assert_eq!(doc.sheet(0).unwrap().name, sheet::SHEET_NAME);
        assert_eq!(doc.sheet(0).unwrap().rows[1][1], "Ana");
    }
}

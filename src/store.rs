//! Embedded-document access over the raw-query channel.
//!
//! The typed channel cannot carry embedded documents reliably, so they are
//! read and written as raw rows. Where a document lives depends on its owner:
//!
//! | Owner | Read | Write |
//! |-------|------|-------|
//! | enterprise phone config | single row of `enterprisephoneconfigxml` | `update ... where pkid` |
//! | common phone profile | `commonphoneconfigxml` joined to the profile by name | `update ... where pkid` |
//! | phone | device row id, then `dbreaddevicexml` | `dbwritedevicexml` |
//!
//! Patching reads, edits and writes back with no concurrency token; a
//! concurrent writer between the read and the write loses (last writer wins).

use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::document::{decode, encode, patch, EmbeddedDocument};
use crate::error::DocumentStoreError;
use crate::service::{quote_sql, row_text, RawQuery};
use crate::types::Record;

/// Resource that owns an embedded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOwner {
    EnterprisePhoneConfig,
    CommonPhoneConfig { name: String },
    Phone { name: String },
}

impl fmt::Display for DocumentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentOwner::EnterprisePhoneConfig => f.write_str("enterprise phone config"),
            DocumentOwner::CommonPhoneConfig { name } => write!(f, "common phone config '{}'", name),
            DocumentOwner::Phone { name } => write!(f, "phone '{}'", name),
        }
    }
}

/// A document together with the row identifier it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub pkid: String,
    pub document: EmbeddedDocument,
}

/// Reads and writes embedded documents through a [`RawQuery`] channel.
pub struct DocumentStore<Q> {
    channel: Q,
}

impl<Q: RawQuery> DocumentStore<Q> {
    pub fn new(channel: Q) -> Self {
        Self { channel }
    }

    /// Read and decode the document of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentStoreError::NotFound` when no row matches,
    /// `DocumentStoreError::Ambiguous` when several do, and a parse error when
    /// the stored fragment is malformed.
    pub fn read(&self, owner: &DocumentOwner) -> Result<StoredDocument, DocumentStoreError> {
        let (pkid, fragment) = match owner {
            DocumentOwner::EnterprisePhoneConfig => {
                let row = self.single_row(owner, "select pkid, xml from enterprisephoneconfigxml")?;
                (required_text(&row, "pkid", owner)?, row_text(&row, "xml").map(String::from))
            }
            DocumentOwner::CommonPhoneConfig { name } => {
                let sql = format!(
                    "select x.pkid, x.xml from commonphoneconfigxml as x \
                     left outer join commonphoneconfig as c on x.fkcommonphoneconfig = c.pkid \
                     where c.name = {}",
                    quote_sql(name)
                );
                let row = self.single_row(owner, &sql)?;
                (required_text(&row, "pkid", owner)?, row_text(&row, "xml").map(String::from))
            }
            DocumentOwner::Phone { name } => {
                let pkid = self.device_pkid(owner, name)?;
                let sql = format!("execute procedure dbreaddevicexml({})", quote_sql(&pkid));
                let rows = self.channel.query(&sql)?;
                let fragment = rows
                    .first()
                    .and_then(|row| row_text(row, "expression"))
                    .map(String::from);
                (pkid, fragment)
            }
        };

        debug!(%owner, %pkid, "read embedded document");
        let document = decode(fragment.as_deref().unwrap_or_default())
            .map_err(crate::error::DocumentError::from)?;
        Ok(StoredDocument { pkid, document })
    }

    /// Encode and write a whole document for `owner` at row `pkid`.
    ///
    /// Returns the row count the remote reports. The stored procedure used for
    /// phones reports zero even on success.
    pub fn write(
        &self,
        owner: &DocumentOwner,
        pkid: &str,
        document: &EmbeddedDocument,
    ) -> Result<u64, DocumentStoreError> {
        let xml = encode(document)?;
        let sql = match owner {
            DocumentOwner::EnterprisePhoneConfig => format!(
                "update enterprisephoneconfigxml set xml = {} where pkid = {}",
                quote_sql(&xml),
                quote_sql(pkid)
            ),
            DocumentOwner::CommonPhoneConfig { .. } => format!(
                "update commonphoneconfigxml set xml = {} where pkid = {}",
                quote_sql(&xml),
                quote_sql(pkid)
            ),
            DocumentOwner::Phone { .. } => format!(
                "execute procedure dbwritedevicexml({}, {})",
                quote_sql(pkid),
                quote_sql(&xml)
            ),
        };

        let rows = self.channel.execute(&sql)?;
        info!(%owner, %pkid, rows, "wrote embedded document");
        Ok(rows)
    }

    /// Set a single path in the document of `owner`: one read, one write.
    pub fn patch(
        &self,
        owner: &DocumentOwner,
        path: &str,
        value: impl Into<Value>,
        delimiter: &str,
    ) -> Result<u64, DocumentStoreError> {
        let StoredDocument { pkid, mut document } = self.read(owner)?;
        patch(&mut document, path, value, delimiter)?;
        self.write(owner, &pkid, &document)
    }

    fn device_pkid(&self, owner: &DocumentOwner, name: &str) -> Result<String, DocumentStoreError> {
        let sql = format!("select pkid from device where name = {}", quote_sql(name));
        let row = self.single_row(owner, &sql)?;
        required_text(&row, "pkid", owner)
    }

    fn single_row(&self, owner: &DocumentOwner, sql: &str) -> Result<Record, DocumentStoreError> {
        let mut rows = self.channel.query(sql)?;
        match rows.len() {
            0 => Err(DocumentStoreError::NotFound {
                owner: owner.to_string(),
            }),
            1 => Ok(rows.remove(0)),
            n => Err(DocumentStoreError::Ambiguous {
                owner: owner.to_string(),
                rows: n,
            }),
        }
    }
}

fn required_text(
    row: &Record,
    column: &str,
    owner: &DocumentOwner,
) -> Result<String, DocumentStoreError> {
    row_text(row, column)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| DocumentStoreError::NotFound {
            owner: owner.to_string(),
        })
}

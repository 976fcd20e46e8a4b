use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hjl::{parse_specs, Decoder, Encoder, FieldSpec, Record};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::paths::{session_file_name, session_root};
use crate::schema::{
    RecordKind, SessionEntry, SessionEntryKind, SessionHeader, ENTRY_HEREDOC_FIELDS,
    HEADER_HEREDOC_FIELDS,
};

pub struct SessionStore {
    pub(crate) path: PathBuf,
    pub(crate) file: File,
    pub(crate) header: SessionHeader,
    pub(crate) entries: Vec<SessionEntry>,
    pub(crate) index_by_id: HashMap<String, usize>,
    pub(crate) current_leaf_id: Option<String>,
}

impl SessionStore {
    /// Starts a new session file under `session_root(cwd)` and writes its
    /// header record.
    pub fn create_new(
        cwd: &Path,
        system_prompt: Option<String>,
    ) -> Result<Self, SessionStoreError> {
        if !cwd.is_absolute() {
            return Err(SessionStoreError::NonAbsoluteCreateCwd {
                path: cwd.to_path_buf(),
            });
        }

        let created_at = now_rfc3339()?;
        let session_id = Uuid::new_v4().to_string();
        let root = session_root(cwd);
        fs::create_dir_all(&root)
            .map_err(|source| SessionStoreError::io("creating session directory", &root, source))?;

        let path = root.join(session_file_name(&created_at, &session_id));
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .map_err(|source| SessionStoreError::io("creating session file", &path, source))?;

        let header = SessionHeader::v1(session_id, created_at, cwd.display().to_string())
            .with_system_prompt(system_prompt);
        write_record(&file, &path, &header, &header_fields()?)?;
        info!(path = %path.display(), session_id = %header.session_id, "created session");

        Ok(Self {
            path,
            file,
            header,
            entries: Vec::new(),
            index_by_id: HashMap::new(),
            current_leaf_id: None,
        })
    }

    pub fn open(path: &Path) -> Result<Self, SessionStoreError> {
        let path = path.to_path_buf();
        let read_file = File::open(&path)
            .map_err(|source| SessionStoreError::io("opening session file", &path, source))?;
        // Appends accept tool output of any length, so reading back must too.
        let mut decoder = Decoder::new(BufReader::new(read_file));

        let mut fields = header_fields()?;
        fields.extend(entry_fields()?);

        let mut header: Option<SessionHeader> = None;
        let mut entries_with_records: Vec<(usize, SessionEntry)> = Vec::new();
        let mut index_by_id = HashMap::new();

        loop {
            let record_number = decoder.records_decoded() + 1;
            let Some(record) = decoder
                .decode_record(&fields)
                .map_err(|source| SessionStoreError::decode(&path, record_number, source))?
            else {
                break;
            };
            let kind = RecordKind::of(&record);

            if record_number == 1 {
                if kind != RecordKind::Session {
                    return Err(SessionStoreError::InvalidHeaderRecord {
                        path,
                        record: record_number,
                    });
                }
                let parsed_header: SessionHeader = from_record(&path, record_number, record)?;
                validate_header_record(&path, record_number, &parsed_header)?;
                header = Some(parsed_header);
                continue;
            }

            if kind != RecordKind::Entry {
                return Err(SessionStoreError::InvalidEntryRecord {
                    path,
                    record: record_number,
                });
            }
            let keys = record.keys().cloned().collect::<Vec<_>>();
            let entry: SessionEntry = from_record(&path, record_number, record)?;
            validate_entry_record(&path, record_number, &entry, &keys)?;
            if index_by_id.contains_key(&entry.id) {
                return Err(SessionStoreError::DuplicateEntryId {
                    path,
                    record: record_number,
                    id: entry.id,
                });
            }

            let next_index = entries_with_records.len();
            index_by_id.insert(entry.id.clone(), next_index);
            entries_with_records.push((record_number, entry));
        }

        let header =
            header.ok_or_else(|| SessionStoreError::MissingHeader { path: path.clone() })?;
        validate_entry_graph(&path, &entries_with_records, &index_by_id)?;

        let entries = entries_with_records
            .into_iter()
            .map(|(_, entry)| entry)
            .collect::<Vec<_>>();
        let current_leaf_id = entries.last().map(|entry| entry.id.clone());
        debug!(path = %path.display(), entries = entries.len(), "opened session");

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| {
                SessionStoreError::io("opening session file for append", &path, source)
            })?;

        Ok(Self {
            path,
            file,
            header,
            entries,
            index_by_id,
            current_leaf_id,
        })
    }

    /// Appends an entry as a child of the current leaf and makes it the new
    /// leaf.
    pub fn append(&mut self, kind: SessionEntryKind) -> Result<&SessionEntry, SessionStoreError> {
        let entry = SessionEntry::new(
            Uuid::new_v4().to_string(),
            self.current_leaf_id.clone(),
            now_rfc3339()?,
            kind,
        );
        write_record(&self.file, &self.path, &entry, &entry_fields()?)?;

        let index = self.entries.len();
        self.index_by_id.insert(entry.id.clone(), index);
        self.current_leaf_id = Some(entry.id.clone());
        self.entries.push(entry);
        Ok(&self.entries[index])
    }

    /// Moves the leaf so the next append branches from `leaf_id`.
    pub fn set_current_leaf(&mut self, leaf_id: &str) -> Result<(), SessionStoreError> {
        if !self.index_by_id.contains_key(leaf_id) {
            return Err(SessionStoreError::UnknownLeafId {
                path: self.path.clone(),
                leaf_id: leaf_id.to_string(),
            });
        }
        self.current_leaf_id = Some(leaf_id.to_string());
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    #[must_use]
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn current_leaf_id(&self) -> Option<&str> {
        self.current_leaf_id.as_deref()
    }
}

fn header_fields() -> Result<Vec<FieldSpec>, SessionStoreError> {
    parse_specs(HEADER_HEREDOC_FIELDS).map_err(SessionStoreError::FieldSpec)
}

fn entry_fields() -> Result<Vec<FieldSpec>, SessionStoreError> {
    parse_specs(ENTRY_HEREDOC_FIELDS).map_err(SessionStoreError::FieldSpec)
}

fn write_record<T: Serialize>(
    file: &File,
    path: &Path,
    value: &T,
    fields: &[FieldSpec],
) -> Result<(), SessionStoreError> {
    Encoder::new(file)
        .encode(value, fields)
        .map_err(|source| SessionStoreError::encode(path, source))
}

fn from_record<T: serde::de::DeserializeOwned>(
    path: &Path,
    record_number: usize,
    record: Record,
) -> Result<T, SessionStoreError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|source| SessionStoreError::record_shape(path, record_number, source))
}

fn now_rfc3339() -> Result<String, SessionStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(SessionStoreError::ClockFormat)
}

pub(crate) fn validate_header_record(
    path: &Path,
    record_number: usize,
    header: &SessionHeader,
) -> Result<(), SessionStoreError> {
    if header.version != 1 {
        return Err(SessionStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            record: record_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, record_number, "created_at", &header.created_at)?;

    if !Path::new(&header.cwd).is_absolute() {
        return Err(SessionStoreError::NonAbsoluteCwd {
            path: path.to_path_buf(),
            record: record_number,
            cwd: header.cwd.clone(),
        });
    }

    Ok(())
}

/// `keys` are the fields of the record `entry` was read from. The flattened
/// entry kind cannot deny unknown fields itself, so any key the entry does
/// not write back is rejected here.
pub(crate) fn validate_entry_record(
    path: &Path,
    record_number: usize,
    entry: &SessionEntry,
    keys: &[String],
) -> Result<(), SessionStoreError> {
    let Value::Object(known) = serde_json::to_value(entry)
        .map_err(|source| SessionStoreError::record_shape(path, record_number, source))?
    else {
        return Err(SessionStoreError::InvalidEntryRecord {
            path: path.to_path_buf(),
            record: record_number,
        });
    };
    if let Some(field) = keys.iter().find(|key| !known.contains_key(key.as_str())) {
        return Err(SessionStoreError::UnknownEntryField {
            path: path.to_path_buf(),
            record: record_number,
            field: field.clone(),
        });
    }

    validate_rfc3339(path, record_number, "ts", &entry.ts)
}

pub(crate) fn validate_entry_graph(
    path: &Path,
    entries_with_records: &[(usize, SessionEntry)],
    index_by_id: &HashMap<String, usize>,
) -> Result<(), SessionStoreError> {
    for (record_number, entry) in entries_with_records {
        if let Some(parent_id) = &entry.parent_id {
            if !index_by_id.contains_key(parent_id) {
                return Err(SessionStoreError::DanglingParentId {
                    path: path.to_path_buf(),
                    record: *record_number,
                    entry_id: entry.id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }
    }

    Ok(())
}

pub(crate) fn validate_rfc3339(
    path: &Path,
    record_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), SessionStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(SessionStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            record: record_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

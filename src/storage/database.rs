//! Plan database files.
//!
//! A plan is stored either as YAML (`.yaml` or `.yml`) or in a compact
//! binary form for any other extension. The binary form starts with
//! [`MAGIC`] and a format version byte, followed by the borsh encoding of
//! the [`PlanRecord`].

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use sha2::{Digest, Sha256};

use crate::{
    domain::{Config, Plan},
    storage::record::PlanRecord,
};

/// Leading bytes of a binary plan database.
pub const MAGIC: &[u8; 4] = b"VPDB";

const FORMAT_VERSION: u8 = 1;

/// On-disk encoding of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable YAML.
    Yaml,
    /// Header followed by borsh-encoded data.
    Binary,
}

impl Format {
    /// Picks the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Binary,
        }
    }

    /// Writes a record in this format.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn write<W: Write>(self, record: &PlanRecord, writer: &mut W) -> Result<(), SaveError> {
        match self {
            Self::Yaml => serde_yaml::to_writer(writer, record)?,
            Self::Binary => {
                writer.write_all(MAGIC)?;
                writer.write_all(&[FORMAT_VERSION])?;
                borsh::to_writer(writer, record)?;
            }
        }
        Ok(())
    }

    /// Reads a record in this format.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be read or is not a valid plan
    /// database.
    pub fn read<R: Read>(self, reader: &mut R) -> Result<PlanRecord, LoadError> {
        match self {
            Self::Yaml => Ok(serde_yaml::from_reader(reader)?),
            Self::Binary => {
                let mut header = [0; 5];
                reader.read_exact(&mut header).map_err(|e| match e.kind() {
                    io::ErrorKind::UnexpectedEof => LoadError::BadMagic,
                    _ => LoadError::Io(e),
                })?;
                if &header[..4] != MAGIC {
                    return Err(LoadError::BadMagic);
                }
                if header[4] != FORMAT_VERSION {
                    return Err(LoadError::UnsupportedVersion(header[4]));
                }
                let mut body = Vec::new();
                reader.read_to_end(&mut body)?;
                borsh::from_slice(&body).map_err(LoadError::Corrupt)
            }
        }
    }
}

/// Errors that can occur when loading a plan database.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The database file was not found.
    #[error("plan database not found")]
    NotFound,
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The YAML database could not be parsed.
    #[error("failed to parse YAML plan: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The binary database does not start with the expected header.
    #[error("not a plan database")]
    BadMagic,
    /// The binary database was written by an unknown format version.
    #[error("unsupported plan database version {0}")]
    UnsupportedVersion(u8),
    /// The binary payload could not be decoded.
    #[error("corrupt plan database: {0}")]
    Corrupt(#[source] io::Error),
}

/// Errors that can occur when saving a plan database.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The plan could not be serialized to YAML.
    #[error("failed to serialize plan: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Sanitizes a plan and writes it to `path`.
///
/// The format follows the file extension. Parent directories are created if
/// they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn save(plan: &mut Plan, path: &Path) -> Result<(), SaveError> {
    let record = plan.prep_to_save();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    Format::from_path(path).write(&record, &mut writer)?;
    writer.flush()?;

    tracing::debug!("Saved plan to {}", path.display());
    Ok(())
}

/// Loads a plan from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid plan
/// database.
pub fn load(path: &Path, config: Config) -> Result<Plan, LoadError> {
    let file = File::open(path).map_err(|io_error| match io_error.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound,
        _ => LoadError::Io(io_error),
    })?;
    let record = Format::from_path(path).read(&mut BufReader::new(file))?;

    tracing::debug!("Loaded plan from {}", path.display());
    Ok(Plan::post_load(record, config))
}

/// SHA-256 of the binary encoding of a record, as a hex string.
///
/// # Panics
///
/// Panics if borsh serialization fails (which should never happen for this
/// data structure).
#[must_use]
pub fn fingerprint(record: &PlanRecord) -> String {
    let encoded = borsh::to_vec(record).expect("this should never fail");
    let hash = Sha256::digest(encoded);
    format!("{hash:x}")
}

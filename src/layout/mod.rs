//! # Mapping Store
//!
//! Persistence of per-joystick bindings in a human-editable text file.
//!
//! A layout file holds one `Joystick <n> ["name"] { ... }` block per
//! controller. A block carrying a name is matched to a device by the name
//! the kernel reports; a block without one is matched by the device's
//! position in the configured device list (1-based).
//!
//! Layout I/O only happens when a device is opened, never on the event path.

pub mod parser;
pub mod types;
pub mod writer;

pub use parser::parse_layout;
pub use types::{AxisBinding, AxisMode, ButtonAction, ButtonBinding, Mapping};
pub use writer::write_layout;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::Result;

/// Layout file on disk.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    /// Creates a store for the given file. Nothing is read until
    /// [`load`](Self::load).
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the layout file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Mapping>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => parse_layout(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads the mapping for a joystick.
    ///
    /// # Arguments
    ///
    /// * `identity` - Device name reported by the kernel
    /// * `ordinal` - 1-based position of the device
    ///
    /// # Returns
    ///
    /// The block whose name equals `identity`, else the unnamed block with
    /// the same ordinal, else an empty mapping. A missing file yields an
    /// empty mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if any line of the file is malformed, or `Io`
    /// if the file exists but cannot be read.
    pub fn load(&self, identity: &str, ordinal: u32) -> Result<Mapping> {
        let mappings = self.read_all()?;

        let by_identity = mappings
            .iter()
            .position(|mapping| mapping.matches_identity(identity));
        let by_ordinal = || {
            mappings
                .iter()
                .position(|mapping| mapping.identity.is_none() && mapping.ordinal == ordinal)
        };

        match by_identity.or_else(by_ordinal) {
            Some(found) => {
                let mapping = mappings[found].clone();
                info!(
                    "Loaded layout for \"{}\" ({} axes, {} buttons bound)",
                    identity,
                    mapping.axes.len(),
                    mapping.buttons.len()
                );
                Ok(mapping)
            }
            None => {
                debug!("No layout for \"{}\" in {}", identity, self.path.display());
                Ok(Mapping::new(ordinal, Some(identity.to_string())))
            }
        }
    }

    /// Writes a mapping back, replacing the block it was loaded from.
    ///
    /// Other blocks are preserved. An empty mapping removes its block. The
    /// file is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the existing file cannot be parsed, or `Io`
    /// on any write failure.
    pub fn save(&self, mapping: &Mapping) -> Result<()> {
        let mut mappings = self.read_all()?;

        let same_block = |existing: &Mapping| match &mapping.identity {
            Some(identity) => existing.matches_identity(identity),
            None => existing.identity.is_none() && existing.ordinal == mapping.ordinal,
        };
        match mappings.iter().position(same_block) {
            Some(found) => mappings[found] = mapping.clone(),
            None => mappings.push(mapping.clone()),
        }

        self.write_atomic(&write_layout(&mappings))?;
        info!("Saved layout to {}", self.path.display());
        Ok(())
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use tempfile::TempDir;

    fn key_button(code: u16) -> ButtonBinding {
        ButtonBinding {
            action: Some(ButtonAction::Key(code)),
            ..ButtonBinding::default()
        }
    }

    fn store_with(text: &str) -> (TempDir, MappingStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.lyt");
        fs::write(&path, text).unwrap();
        (dir, MappingStore::new(path))
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_missing_file_yields_empty_mapping() {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("absent.lyt"));
        let mapping = store.load("Pad", 1).unwrap();
        assert!(mapping.is_empty());
        assert_eq!(mapping.identity.as_deref(), Some("Pad"));
    }

    #[test]
    fn test_identity_match_wins_over_ordinal() {
        let (_dir, store) = store_with(
            "Joystick 1 {\n Button 1: key 30\n}\nJoystick 2 \"Pad\" {\n Button 1: key 48\n}\n",
        );
        let mapping = store.load("Pad", 1).unwrap();
        assert_eq!(mapping.button(0), key_button(48));
    }

    #[test]
    fn test_ordinal_match_for_unnamed_block() {
        let (_dir, store) = store_with(
            "Joystick 1 \"Other\" {\n Button 1: key 30\n}\nJoystick 1 {\n Button 1: key 46\n}\n",
        );
        let mapping = store.load("Pad", 1).unwrap();
        assert_eq!(mapping.button(0), key_button(46));
        assert!(store.load("Pad", 2).unwrap().is_empty());
    }

    #[test]
    fn test_shipped_layout_parses() {
        let store = MappingStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config/layout.lyt"));
        let mapping = store.load("Any Controller", 1).unwrap();
        assert_eq!(mapping.axes.len(), 6);
        assert_eq!(mapping.buttons.len(), 4);
    }

    #[test]
    fn test_parse_error_fails_whole_load() {
        let (_dir, store) = store_with("Joystick 1 {\n Button 1: key 30\n Button 2 key\n}\n");
        match store.load("Pad", 1) {
            Err(BridgeError::ConfigInvalid { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected layout error, got {:?}", other),
        }
    }

    // ==================== Save Tests ====================

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("layout.lyt"));

        let mut mapping = Mapping::new(1, Some("Pad".to_string()));
        mapping.set_button(3, key_button(57));
        store.save(&mapping).unwrap();

        assert_eq!(store.load("Pad", 1).unwrap(), mapping);
    }

    #[test]
    fn test_save_replaces_block_and_keeps_others() {
        let (_dir, store) = store_with(
            "Joystick 1 \"Pad\" {\n Button 1: key 30\n}\nJoystick 2 {\n Button 2: key 31\n}\n",
        );

        let mut mapping = store.load("Pad", 1).unwrap();
        mapping.set_button(0, key_button(44));
        store.save(&mapping).unwrap();

        let all = parse_layout(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.load("Pad", 1).unwrap().button(0), key_button(44));
        assert_eq!(store.load("Anything", 2).unwrap().button(1), key_button(31));
    }

    #[test]
    fn test_saving_empty_mapping_drops_block() {
        let (_dir, store) = store_with("Joystick 1 \"Pad\" {\n Button 1: key 30\n}\n");
        store.save(&Mapping::new(1, Some("Pad".to_string()))).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(parse_layout(&text).unwrap().is_empty());
    }
}

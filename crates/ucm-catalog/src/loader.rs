//! Catalog loading for one card.
//!
//! `CatalogLoader::open` reads `<config_dir>/<card name>`. In the indexed
//! shape the first verb is parsed before `open` returns and the remaining
//! verbs on a named background thread; `CatalogHandle::wait_for_parsing`
//! joins it and publishes the full catalog.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};
use ucm_core::{Result, UcmError};

use crate::build::build_verb;
use crate::model::{Catalog, Descriptor, Verb, VerbId};
use crate::parser::{parse_document, Document, SectionKind};

/// Identity of a sound card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    pub name: String,
    pub number: u32,
}

impl CardInfo {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// Reads catalogs from a configuration directory.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    config_dir: PathBuf,
}

struct IndexEntry {
    name: String,
    file: String,
}

type Worker = JoinHandle<Result<Vec<Verb>>>;

impl CatalogLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Parse the primary verb (or the whole single-file catalog) and start
    /// the background parser for the rest.
    pub fn open(&self, card: &CardInfo) -> Result<CatalogHandle> {
        let master = self.config_dir.join(&card.name);
        let source = read_descriptor(&master)?;
        let doc = parse_document(&source, &card.name, card.number)?;

        if !doc.is_indexed() {
            let catalog = build_single(doc, card)?;
            info!(card = %card.name, verbs = catalog.len(), "catalog loaded (single file)");
            return Ok(CatalogHandle::from_catalog(catalog));
        }

        let index = index_entries(&doc, &card.name)?;
        let indexed: Vec<String> = index.iter().map(|e| e.name.clone()).collect();
        let mut entries = index.into_iter();
        let first = entries
            .next()
            .ok_or_else(|| UcmError::Config(format!("{}: no verbs defined", card.name)))?;
        let primary = Catalog {
            card: card.clone(),
            verbs: vec![load_verb_file(&self.config_dir, card, &first)?],
        };
        info!(card = %card.name, primary = %first.name, indexed = indexed.len(), "primary verb loaded");

        let rest: Vec<IndexEntry> = entries.collect();
        if rest.is_empty() {
            return Ok(CatalogHandle::from_catalog(primary));
        }

        let dir = self.config_dir.clone();
        let worker_card = card.clone();
        let worker = std::thread::Builder::new()
            .name(format!("ucm-parse-{}", card.number))
            .spawn(move || {
                rest.iter()
                    .map(|entry| load_verb_file(&dir, &worker_card, entry))
                    .collect::<Result<Vec<Verb>>>()
            })
            .map_err(|e| UcmError::Allocation(format!("cannot start catalog parser: {}", e)))?;

        Ok(CatalogHandle {
            primary: Arc::new(primary),
            full: OnceLock::new(),
            worker: Mutex::new(Some(worker)),
            indexed,
        })
    }

    /// Open and wait for the full catalog.
    pub fn load(&self, card: &CardInfo) -> Result<Catalog> {
        let handle = self.open(card)?;
        handle.wait_for_parsing().map(Catalog::clone)
    }
}

/// Parse a single-file catalog held in memory.
pub fn parse_catalog(source: &str, card: &CardInfo) -> Result<Catalog> {
    let doc = parse_document(source, &card.name, card.number)?;
    if doc.is_indexed() {
        return Err(UcmError::Config(format!(
            "{}: indexed catalogs must be opened from a directory",
            card.name
        )));
    }
    build_single(doc, card)
}

fn read_descriptor(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| UcmError::Config(format!("cannot read {}: {}", path.display(), e)))
}

fn split_sections(doc: &Document) -> (Vec<Descriptor>, Vec<Descriptor>) {
    let pick = |kind: SectionKind| -> Vec<Descriptor> {
        doc.sections()
            .filter(|s| s.kind == kind)
            .map(|s| s.descriptor.clone())
            .collect()
    };
    (pick(SectionKind::Device), pick(SectionKind::Modifier))
}

/// Single-file shape: verbs own the `SectionVerb`s that follow their
/// header; devices and modifiers are shared by every verb.
fn build_single(doc: Document, card: &CardInfo) -> Result<Catalog> {
    if let Some(stray) = doc.preamble.iter().find(|s| s.kind == SectionKind::Verb) {
        return Err(UcmError::config_at(
            &card.name,
            stray.line,
            "SectionVerb outside of SectionUseCase",
        ));
    }
    if doc.use_cases.is_empty() {
        return Err(UcmError::Config(format!("{}: no verbs defined", card.name)));
    }

    let (devices, modifiers) = split_sections(&doc);
    let mut seen = HashSet::new();
    let mut verbs = Vec::with_capacity(doc.use_cases.len());
    for uc in &doc.use_cases {
        if !seen.insert(uc.name.as_str()) {
            return Err(UcmError::config_at(
                &card.name,
                uc.line,
                format!("duplicate verb \"{}\"", uc.name),
            ));
        }
        let verb_sections = uc
            .sections
            .iter()
            .filter(|s| s.kind == SectionKind::Verb)
            .map(|s| s.descriptor.clone())
            .collect();
        verbs.push(build_verb(
            &uc.name,
            verb_sections,
            devices.clone(),
            modifiers.clone(),
            &card.name,
        )?);
    }
    Ok(Catalog {
        card: card.clone(),
        verbs,
    })
}

fn index_entries(doc: &Document, origin: &str) -> Result<Vec<IndexEntry>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(doc.use_cases.len());
    for uc in &doc.use_cases {
        let file = uc.file.clone().ok_or_else(|| {
            UcmError::config_at(origin, uc.line, format!("verb \"{}\" has no File", uc.name))
        })?;
        if !seen.insert(uc.name.as_str()) {
            return Err(UcmError::config_at(
                origin,
                uc.line,
                format!("duplicate verb \"{}\"", uc.name),
            ));
        }
        entries.push(IndexEntry {
            name: uc.name.clone(),
            file,
        });
    }
    Ok(entries)
}

fn load_verb_file(dir: &Path, card: &CardInfo, entry: &IndexEntry) -> Result<Verb> {
    let path = dir.join(&entry.file);
    let source = read_descriptor(&path)?;
    let doc = parse_document(&source, &entry.file, card.number)?;
    let verb_sections = doc
        .sections()
        .filter(|s| s.kind == SectionKind::Verb)
        .map(|s| s.descriptor.clone())
        .collect();
    let (devices, modifiers) = split_sections(&doc);
    let verb = build_verb(&entry.name, verb_sections, devices, modifiers, &entry.file)?;
    debug!(verb = %entry.name, file = %entry.file, "verb parsed");
    Ok(verb)
}

/// A card's catalog, possibly still being completed in the background.
pub struct CatalogHandle {
    primary: Arc<Catalog>,
    full: OnceLock<std::result::Result<Arc<Catalog>, String>>,
    worker: Mutex<Option<Worker>>,
    indexed: Vec<String>,
}

impl CatalogHandle {
    /// Wrap an already complete catalog; nothing is parsed in the background.
    pub fn from_catalog(catalog: Catalog) -> Self {
        let indexed = catalog.verb_names();
        let catalog = Arc::new(catalog);
        let full = OnceLock::new();
        let _ = full.set(Ok(Arc::clone(&catalog)));
        Self {
            primary: catalog,
            full,
            worker: Mutex::new(None),
            indexed,
        }
    }

    pub fn card(&self) -> &CardInfo {
        self.primary.card()
    }

    /// The catalog with the primary verb; always available.
    pub fn primary(&self) -> &Catalog {
        &self.primary
    }

    /// The full catalog once published, else the primary one.
    pub fn current(&self) -> &Catalog {
        match self.full.get() {
            Some(Ok(full)) => full.as_ref(),
            _ => self.primary.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.full.get().is_some()
    }

    /// Verb names in index order, known before background parsing ends.
    pub fn indexed_verbs(&self) -> &[String] {
        &self.indexed
    }

    /// Block until background parsing has finished.
    pub fn wait_for_parsing(&self) -> Result<&Catalog> {
        let published = self.full.get_or_init(|| {
            let Some(worker) = self.worker.lock().take() else {
                return Ok(Arc::clone(&self.primary));
            };
            match worker.join() {
                Ok(Ok(rest)) => {
                    let mut catalog = Catalog::clone(&self.primary);
                    catalog.verbs.extend(rest);
                    info!(card = %catalog.card.name, verbs = catalog.len(), "catalog complete");
                    Ok(Arc::new(catalog))
                }
                Ok(Err(e)) => {
                    warn!(card = %self.primary.card.name, error = %e, "background catalog parse failed");
                    Err(e.to_string())
                }
                Err(_) => Err("catalog parser thread panicked".to_string()),
            }
        });
        match published {
            Ok(catalog) => Ok(catalog.as_ref()),
            Err(msg) => Err(UcmError::Config(msg.clone())),
        }
    }

    /// Look up a verb, joining the background parser when the name is not
    /// in the catalog published so far.
    pub fn find_verb(&self, name: &str) -> Result<(&Catalog, VerbId)> {
        let current = self.current();
        if let Some(id) = current.verb_id(name) {
            return Ok((current, id));
        }
        if self.is_complete() || !self.indexed.iter().any(|v| v == name) {
            return Err(UcmError::UnknownVerb(name.to_string()));
        }
        let full = self.wait_for_parsing()?;
        full.verb_id(name)
            .map(|id| (full, id))
            .ok_or_else(|| UcmError::UnknownVerb(name.to_string()))
    }
}

impl Drop for CatalogHandle {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for CatalogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogHandle")
            .field("card", self.card())
            .field("indexed", &self.indexed)
            .field("complete", &self.is_complete())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scope;
    use std::fs;

    const SINGLE: &str = r#"
SectionUseCase."HiFi" {
    Comment "Music playback"
}
SectionVerb
    Name "HiFi"
    EnableSequence
        'SLIMBUS_0_RX Audio Mixer MultiMedia1':1:1
    EndSequence
EndSection
SectionVerb
    Name "HiFiSpeaker"
    PlaybackPCM 0
EndSection

SectionUseCase."Voice Call" {
}
SectionVerb
    Name "Voice Call"
EndSection

SectionDevice
    Name "Speaker"
    ACDBID 15:1
EndSection
SectionDevice
    Name "Handset"
    ACDBID 4:2
EndSection
SectionModifier
    Name "Play Music"
EndSection
"#;

    fn card() -> CardInfo {
        CardInfo::new("snd_soc_msm", 0)
    }

    #[test]
    fn test_parse_single_file() {
        let catalog = parse_catalog(SINGLE, &card()).unwrap();
        assert_eq!(catalog.verb_names(), vec!["HiFi", "Voice Call"]);

        let hifi = catalog.verb(catalog.verb_id("HiFi").unwrap());
        assert_eq!(hifi.device_names(), vec!["Speaker", "Handset"]);
        let speaker = hifi.device_id("Speaker").unwrap();
        let combo = hifi.combined(Scope::Verb, speaker).unwrap();
        assert_eq!(combo.playback_pcm.as_deref(), Some("hw:0,0"));

        let voice = catalog.verb(catalog.verb_id("Voice Call").unwrap());
        assert_eq!(voice.device_names(), vec!["Speaker", "Handset"]);
        assert_eq!(voice.modifier_names(), vec!["Play Music"]);
        assert!(voice.combined(Scope::Verb, speaker).is_none());
    }

    #[test]
    fn test_single_file_rejects_duplicate_verb() {
        let text = "SectionUseCase.\"HiFi\"\nSectionUseCase.\"HiFi\"\n";
        assert!(parse_catalog(text, &card()).is_err());
    }

    #[test]
    fn test_open_indexed_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("snd_soc_msm"),
            "SectionUseCase.\"HiFi\" {\n File \"HiFi\"\n}\nSectionUseCase.\"Voice Call\" {\n File \"VoiceCall\"\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("HiFi"),
            "SectionVerb\nName \"HiFi\"\nEndSection\nSectionDevice\nName \"Speaker\"\nEndSection\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("VoiceCall"),
            "SectionVerb\nName \"Voice Call\"\nEndSection\nSectionDevice\nName \"Earpiece\"\nEndSection\n",
        )
        .unwrap();

        let handle = CatalogLoader::new(dir.path()).open(&card()).unwrap();
        assert_eq!(handle.primary().verb_names(), vec!["HiFi"]);
        assert_eq!(handle.indexed_verbs(), ["HiFi", "Voice Call"]);

        let (catalog, id) = handle.find_verb("Voice Call").unwrap();
        assert_eq!(catalog.verb(id).device_names(), vec!["Earpiece"]);
        assert!(handle.is_complete());
        assert_eq!(handle.current().len(), 2);
        assert_eq!(handle.current().verb_id("HiFi"), handle.primary().verb_id("HiFi"));
    }

    #[test]
    fn test_background_failure_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("snd_soc_msm"),
            "SectionUseCase.\"HiFi\" {\n File \"HiFi\"\n}\nSectionUseCase.\"Voice Call\" {\n File \"Missing\"\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("HiFi"), "SectionVerb\nName \"HiFi\"\nEndSection\n").unwrap();

        let handle = CatalogLoader::new(dir.path()).open(&card()).unwrap();
        assert!(handle.find_verb("HiFi").is_ok());
        assert!(handle.wait_for_parsing().unwrap_err().is_config());
        assert!(handle.find_verb("Voice Call").is_err());
        assert!(handle.wait_for_parsing().is_err());
    }

    #[test]
    fn test_missing_primary_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("snd_soc_msm"),
            "SectionUseCase.\"HiFi\" {\n File \"HiFi\"\n}\n",
        )
        .unwrap();
        let err = CatalogLoader::new(dir.path()).open(&card()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_unknown_verb() {
        let catalog = CatalogHandle::from_catalog(parse_catalog(SINGLE, &card()).unwrap());
        assert!(matches!(
            catalog.find_verb("Karaoke"),
            Err(UcmError::UnknownVerb(_))
        ));
    }
}

//! Integration tests for opening cards from descriptor directories.
//!
//! Exercises ucm-catalog's two on-disk shapes through ucm-router's
//! platform configuration and card manager.

use std::path::Path;

use ucm_catalog::{Catalog, CatalogLoader, Scope};
use ucm_core::UcmError;
use ucm_router::{CardManager, CardProfile, NoCalibration, PlatformConfig};

use crate::fixtures::{card, init_tracing, mixer, write_indexed, write_single, CARD};

// ── Helpers ────────────────────────────────────────────────────

fn platform(dir: &Path) -> PlatformConfig {
    PlatformConfig {
        config_dir: dir.to_path_buf(),
        cards: vec![CardProfile::new(CARD, 0)],
        ..PlatformConfig::default()
    }
}

fn open(config: &PlatformConfig) -> Result<CardManager, UcmError> {
    init_tracing();
    CardManager::open(config, CARD, Box::new(mixer()), Box::new(NoCalibration))
}

fn assert_equivalent(a: &Catalog, b: &Catalog) {
    assert_eq!(a.verb_names(), b.verb_names());
    for name in a.verb_names() {
        let left = a.verb(a.verb_id(&name).unwrap());
        let right = b.verb(b.verb_id(&name).unwrap());
        assert_eq!(left.use_case(), right.use_case(), "{name}");
        assert_eq!(left.device_names(), right.device_names(), "{name}");
        assert_eq!(left.modifier_names(), right.modifier_names(), "{name}");
        for (id, device) in left.devices() {
            let other = right.device(right.device_id(&device.name).unwrap());
            assert_eq!(device, other, "{name}/{}", device.name);
            let other_id = right.device_id(&device.name).unwrap();
            assert_eq!(
                left.combined(Scope::Verb, id),
                right.combined(Scope::Verb, other_id),
                "{name}/{}",
                device.name
            );
        }
    }
}

// ── Catalog shapes ─────────────────────────────────────────────

#[test]
fn single_and_indexed_shapes_are_equivalent() {
    let single = tempfile::tempdir().unwrap();
    let indexed = tempfile::tempdir().unwrap();
    write_single(single.path());
    write_indexed(indexed.path());

    let a = CatalogLoader::new(single.path()).load(&card()).unwrap();
    let b = CatalogLoader::new(indexed.path()).load(&card()).unwrap();
    assert_equivalent(&a, &b);
}

#[test]
fn unterminated_section_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CARD),
        "SectionUseCase.\"HiFi\" {\n}\nSectionVerb\n    Name \"HiFi\"\nSectionDevice\n    Name \"Speaker\"\n",
    )
    .unwrap();

    let err = open(&platform(dir.path())).unwrap_err();
    assert!(err.is_config(), "{err:?}");
}

#[test]
fn missing_master_file_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let err = open(&platform(dir.path())).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn unknown_card_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_single(dir.path());
    let config = platform(dir.path());
    let err = CardManager::open(&config, "snd_soc_nope", Box::new(mixer()), Box::new(NoCalibration))
        .unwrap_err();
    assert!(err.is_config());
}

// ── Background parsing ─────────────────────────────────────────

#[test]
fn background_join_exposes_all_verbs() {
    let dir = tempfile::tempdir().unwrap();
    write_indexed(dir.path());
    let manager = open(&platform(dir.path())).unwrap();

    assert_eq!(manager.list("_verbs").unwrap(), vec!["HiFi", "Voice Call"]);
    assert!(manager.snapshot().catalog_complete);
    manager.set_verb("Voice Call").unwrap();
    manager.enable_device("Speaker").unwrap();
    assert_eq!(manager.get("_verb").unwrap(), "Voice Call");
}

#[test]
fn non_primary_verb_blocks_on_parse() {
    let dir = tempfile::tempdir().unwrap();
    write_indexed(dir.path());
    let manager = open(&platform(dir.path())).unwrap();

    // Primary verb routing works before anything joins the parser.
    manager.set_verb("HiFi").unwrap();
    manager.enable_device("Speaker").unwrap();
    manager.set_verb("Voice Call").unwrap();
    assert_eq!(manager.current_verb(), "Voice Call");
    assert_eq!(manager.enabled_devices(), vec!["Speaker"]);
    manager.wait_for_parsing().unwrap();
}

#[test]
fn verb_change_joins_the_parser_first() {
    let dir = tempfile::tempdir().unwrap();
    write_indexed(dir.path());
    let manager = open(&platform(dir.path())).unwrap();

    manager.set("_verb", "Voice Call").unwrap();
    let snapshot = manager.snapshot();
    assert!(snapshot.catalog_complete);
    assert_eq!(snapshot.verb, "Voice Call");
    assert!(matches!(manager.set_verb("Karaoke"), Err(UcmError::UnknownVerb(_))));
}

#[test]
fn brace_on_its_own_line_keeps_the_index() {
    let dir = tempfile::tempdir().unwrap();
    write_indexed(dir.path());
    let master = "SectionUseCase.\"HiFi\"\n{\n    File \"HiFi\"\n}\n\
                  SectionUseCase.\"Voice Call\"\n{\n    File \"VoiceCall\"\n}\n";
    std::fs::write(dir.path().join(CARD), master).unwrap();

    let manager = open(&platform(dir.path())).unwrap();
    assert_eq!(manager.list("_verbs").unwrap(), vec!["HiFi", "Voice Call"]);
    manager.set_verb("Voice Call").unwrap();
    manager.enable_device("Speaker").unwrap();
}

#[test]
fn platform_config_file_drives_open() {
    let dir = tempfile::tempdir().unwrap();
    write_single(dir.path());
    let path = dir.path().join("platform.json");
    platform(dir.path()).save_to_file(&path).unwrap();

    let config = PlatformConfig::load_from_file(&path).unwrap();
    let manager = open(&config).unwrap();
    assert_eq!(manager.get("_card").unwrap(), CARD);
    assert_eq!(manager.get("PlaybackPCM/Play Music").unwrap(), "hw:0,1");
    assert_eq!(manager.get_int("ACDBID/Handset").unwrap(), 4);
}

//! Integration tests for musx-export
//!
//! Runs the binary on generated inputs and checks the files it writes

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

use nether_musx::mus::write_mus;
use nether_musx::{DecoderConfig, MusCommand, MusEvent, MusxDecoder};

fn song() -> Vec<MusCommand> {
    let mut commands = vec![MusCommand::new(0, MusEvent::Controller { controller: 0, value: 19 }, 0)];
    for bar in 0..8u8 {
        let root = 48 + bar % 4 * 2;
        commands.push(MusCommand::new(0, MusEvent::PressKey { note: root, volume: 100 }, 0));
        commands.push(MusCommand::new(0, MusEvent::PressKey { note: root + 4, volume: 100 }, 0));
        commands.push(MusCommand::new(9, MusEvent::PressKey { note: 36, volume: 120 }, 70));
        commands.push(MusCommand::new(9, MusEvent::ReleaseKey { note: 36 }, 0));
        commands.push(MusCommand::new(0, MusEvent::ReleaseKey { note: root + 4 }, 0));
        commands.push(MusCommand::new(0, MusEvent::ReleaseKey { note: root }, 70));
    }
    commands.push(MusCommand::new(0, MusEvent::ScoreEnd, 0));
    commands
}

fn write_song(path: &Path) {
    std::fs::write(path, write_mus(&song()).expect("Failed to write MUS")).expect("Failed to save MUS");
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_musx-export"))
        .args(args)
        .output()
        .expect("Failed to run musx-export")
}

/// Test MUS -> MUSX conversion
#[test]
fn test_music_conversion() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mus_path = dir.path().join("song.mus");
    let musx_path = dir.path().join("song.musx");
    write_song(&mus_path);

    let out = run(&[
        "music",
        mus_path.to_str().unwrap(),
        "-o",
        musx_path.to_str().unwrap(),
        "--layout",
        "grouped",
    ]);
    assert!(out.status.success(), "musx-export music command failed");

    let bytes = std::fs::read(&musx_path).expect("Failed to read MUSX file");
    let mut decoder = MusxDecoder::new(&bytes, DecoderConfig::default()).unwrap();
    assert!(decoder.header().grouped);
    assert_eq!(decoder.decode_all().unwrap(), song());
}

/// Default output path swaps the extension
#[test]
fn test_music_default_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mus_path = dir.path().join("theme.mus");
    write_song(&mus_path);

    let out = run(&["music", mus_path.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(dir.path().join("theme.musx").exists());
}

#[test]
fn test_info_prints_tables() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mus_path = dir.path().join("song.mus");
    write_song(&mus_path);
    assert!(run(&["music", mus_path.to_str().unwrap()]).status.success());

    let out = run(&["info", dir.path().join("song.musx").to_str().unwrap()]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("MUSX v1"));
    assert!(text.contains("percussion-note"));
    assert!(text.contains(&format!("events: {}", song().len())));
}

#[test]
fn test_verify() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mus_path = dir.path().join("song.mus");
    write_song(&mus_path);

    for layout in ["auto", "sequential", "grouped"] {
        let out = run(&["verify", mus_path.to_str().unwrap(), "--layout", layout]);
        assert!(out.status.success(), "verify failed for {layout}");
    }
}

#[test]
fn test_blob_conversion() {
    let dir = tempdir().expect("Failed to create temp dir");
    let raw_path = dir.path().join("level.bin");
    let huff_path = dir.path().join("level.huff");
    let data: Vec<u8> = (0..2000u32).map(|i| (i % 7 * (i % 3)) as u8).collect();
    std::fs::write(&raw_path, &data).unwrap();

    let out = run(&[
        "blob",
        raw_path.to_str().unwrap(),
        "-o",
        huff_path.to_str().unwrap(),
        "--encoding",
        "flat",
    ]);
    assert!(out.status.success(), "musx-export blob command failed");

    let blob = std::fs::read(&huff_path).unwrap();
    assert!(blob.len() < data.len());
    assert_eq!(musx_export::blob::decode_blob(&blob).unwrap(), data);
}

#[test]
fn test_build_from_manifest() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::create_dir_all(dir.path().join("music")).unwrap();
    write_song(&dir.path().join("music/e1m1.mus"));
    std::fs::write(dir.path().join("palette.bin"), [1u8, 2, 3, 3, 3, 3, 2, 1]).unwrap();
    std::fs::write(
        dir.path().join("musx.toml"),
        r#"
[output]
dir = "out/"

[encoder]
max_code_length = 12

[[music]]
id = "e1m1"
path = "music/e1m1.mus"
layout = "sequential"

[[blobs]]
id = "palette"
path = "palette.bin"
"#,
    )
    .unwrap();

    let out = run(&["build", dir.path().join("musx.toml").to_str().unwrap()]);
    assert!(out.status.success(), "musx-export build command failed");

    let musx = std::fs::read(dir.path().join("out/e1m1.musx")).unwrap();
    let mut decoder = MusxDecoder::new(&musx, DecoderConfig::default()).unwrap();
    assert!(!decoder.header().grouped);
    assert_eq!(decoder.decode_all().unwrap(), song());

    let blob = std::fs::read(dir.path().join("out/palette.huff")).unwrap();
    assert_eq!(musx_export::blob::decode_blob(&blob).unwrap(), [1, 2, 3, 3, 3, 3, 2, 1]);
}

#[test]
fn test_rejects_bad_input() {
    let dir = tempdir().expect("Failed to create temp dir");
    let bad = dir.path().join("bad.mus");
    std::fs::write(&bad, b"RIFF....WAVEfmt ").unwrap();

    assert!(!run(&["music", bad.to_str().unwrap()]).status.success());
    assert!(!run(&["info", bad.to_str().unwrap()]).status.success());
    assert!(!run(&["music", bad.to_str().unwrap(), "--max-code-length", "0"]).status.success());
}

//! musx.toml parsing and build orchestration
//!
//! ```toml
//! [output]
//! dir = "build/"
//!
//! [encoder]
//! max_code_length = 12
//! layout = "auto"
//!
//! [[music]]
//! id = "e1m1"
//! path = "music/e1m1.mus"
//!
//! [[blobs]]
//! id = "palette"
//! path = "data/palette.bin"
//! encoding = "sentinel"
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use anyhow::{Context, Result};
use hashbrown::HashSet;
use nether_huff::TableEncoding;
use nether_musx::{EncoderConfig, LayoutChoice};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{BLOB_EXT, MUSX_EXT};

/// Root manifest structure
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub encoder: EncoderSection,
    #[serde(default)]
    pub music: Vec<MusicEntry>,
    #[serde(default)]
    pub blobs: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build/")
}

/// Encoder overrides; anything unset keeps the runtime defaults
#[derive(Debug, Default, Deserialize)]
pub struct EncoderSection {
    pub max_code_length: Option<u8>,
    pub max_decoder_words: Option<usize>,
    pub max_simultaneous_notes: Option<usize>,
    pub layout: Option<String>,
    pub table_encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MusicEntry {
    pub id: String,
    pub path: PathBuf,
    /// Per-song layout override
    #[serde(default)]
    pub layout: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlobEntry {
    pub id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Output counts from [`build_all`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub music: usize,
    pub blobs: usize,
    pub bytes_in: usize,
    pub bytes_out: usize,
}

impl EncoderSection {
    /// Apply overrides to the default encoder configuration
    pub fn to_config(&self) -> Result<EncoderConfig> {
        let mut config = EncoderConfig::default();
        if let Some(length) = self.max_code_length {
            config.max_code_length = length;
        }
        if let Some(words) = self.max_decoder_words {
            config.max_decoder_words = words;
        }
        if let Some(notes) = self.max_simultaneous_notes {
            config.max_simultaneous_notes = notes;
        }
        if let Some(layout) = &self.layout {
            config.layout = parse_layout(layout)?;
        }
        if let Some(encoding) = &self.table_encoding {
            config.table_encoding = parse_encoding(encoding)?;
        }
        config
            .validate()
            .context("Invalid [encoder] section in musx.toml")?;
        Ok(config)
    }
}

fn parse_layout(s: &str) -> Result<LayoutChoice> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

fn parse_encoding(s: &str) -> Result<TableEncoding> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

impl Manifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In manifest {}", path.display()))
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse musx.toml")
    }

    /// Check settings, ids and sources without building
    pub fn validate(&self, base_dir: &Path) -> Result<()> {
        self.encoder.to_config()?;

        let mut ids = HashSet::new();
        for entry in &self.music {
            if !ids.insert(entry.id.as_str()) {
                anyhow::bail!("Duplicate asset id '{}' in musx.toml", entry.id);
            }
            if let Some(layout) = &entry.layout {
                parse_layout(layout).with_context(|| format!("Music '{}'", entry.id))?;
            }
            let path = base_dir.join(&entry.path);
            if !path.exists() {
                anyhow::bail!("Music '{}' source not found: {:?}", entry.id, path);
            }
        }
        for entry in &self.blobs {
            if !ids.insert(entry.id.as_str()) {
                anyhow::bail!("Duplicate asset id '{}' in musx.toml", entry.id);
            }
            if let Some(encoding) = &entry.encoding {
                parse_encoding(encoding).with_context(|| format!("Blob '{}'", entry.id))?;
            }
            let path = base_dir.join(&entry.path);
            if !path.exists() {
                anyhow::bail!("Blob '{}' source not found: {:?}", entry.id, path);
            }
        }
        Ok(())
    }
}

/// Build every asset in `manifest`
pub fn build_all(
    manifest: &Manifest,
    base_dir: &Path,
    output_override: Option<&Path>,
) -> Result<BuildSummary> {
    manifest.validate(base_dir)?;
    let output_dir = match output_override {
        Some(dir) => dir.to_path_buf(),
        None => base_dir.join(&manifest.output.dir),
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {:?}", output_dir))?;

    let base_config = manifest.encoder.to_config()?;
    let mut summary = BuildSummary::default();

    for entry in &manifest.music {
        let input = base_dir.join(&entry.path);
        let output = output_dir.join(format!("{}.{}", entry.id, MUSX_EXT));
        tracing::info!("Converting music: {} -> {:?}", entry.id, output);

        let mut config = base_config.clone();
        if let Some(layout) = &entry.layout {
            config.layout = parse_layout(layout)?;
        }
        let encoding = crate::music::convert_mus(&input, &output, &config)
            .with_context(|| format!("Music '{}'", entry.id))?;
        summary.music += 1;
        summary.bytes_in += std::fs::metadata(&input)?.len() as usize;
        summary.bytes_out += encoding.bytes.len();
    }

    for entry in &manifest.blobs {
        let input = base_dir.join(&entry.path);
        let output = output_dir.join(format!("{}.{}", entry.id, BLOB_EXT));
        tracing::info!("Converting blob: {} -> {:?}", entry.id, output);

        let encoding = match &entry.encoding {
            Some(encoding) => parse_encoding(encoding)?,
            None => base_config.table_encoding,
        };
        let written = crate::blob::convert_blob(&input, &output, encoding)
            .with_context(|| format!("Blob '{}'", entry.id))?;
        summary.blobs += 1;
        summary.bytes_in += std::fs::metadata(&input)?.len() as usize;
        summary.bytes_out += written;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_minimal() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.music.is_empty());
        assert_eq!(manifest.output.dir, PathBuf::from("build/"));
        assert_eq!(manifest.encoder.to_config().unwrap(), EncoderConfig::default());
    }

    #[test]
    fn test_manifest_full() {
        let manifest = Manifest::parse(
            r#"
[output]
dir = "out/"

[encoder]
max_code_length = 11
max_simultaneous_notes = 48
layout = "grouped"
table_encoding = "flat"

[[music]]
id = "title"
path = "title.mus"
layout = "sequential"

[[blobs]]
id = "palette"
path = "palette.bin"
encoding = "sentinel"
"#,
        )
        .unwrap();

        let config = manifest.encoder.to_config().unwrap();
        assert_eq!(config.max_code_length, 11);
        assert_eq!(config.max_simultaneous_notes, 48);
        assert_eq!(config.layout, LayoutChoice::Grouped);
        assert_eq!(config.table_encoding, TableEncoding::Flat);
        assert_eq!(manifest.music[0].layout.as_deref(), Some("sequential"));
        assert_eq!(manifest.blobs[0].encoding.as_deref(), Some("sentinel"));
    }

    #[test]
    fn test_encoder_section_rejects_bad_values() {
        let manifest = Manifest::parse("[encoder]\nmax_code_length = 16\n").unwrap();
        assert!(manifest.encoder.to_config().is_err());

        let manifest = Manifest::parse("[encoder]\nlayout = \"diagonal\"\n").unwrap();
        assert!(manifest.encoder.to_config().is_err());
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let manifest = Manifest::parse(
            r#"
[[music]]
id = "same"
path = "a.mus"

[[blobs]]
id = "same"
path = "b.bin"
"#,
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mus"), b"").unwrap();
        std::fs::write(dir.path().join("b.bin"), b"").unwrap();
        let err = manifest.validate(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_validate_missing_source() {
        let manifest = Manifest::parse("[[blobs]]\nid = \"x\"\npath = \"missing.bin\"\n").unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(manifest.validate(dir.path()).is_err());
    }
}

use anyhow::{bail, Context, Result};
use binpak_core::format::archive::{Archive, ArchiveKind};
use binpak_core::Endian;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.yaml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl From<ByteOrder> for Endian {
    fn from(order: ByteOrder) -> Self {
        match order {
            ByteOrder::Little => Endian::Little,
            ByteOrder::Big => Endian::Big,
        }
    }
}

impl From<Endian> for ByteOrder {
    fn from(endian: Endian) -> Self {
        match endian {
            Endian::Little => ByteOrder::Little,
            Endian::Big => ByteOrder::Big,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: i32,
    pub file: PathBuf,
}

/// Everything needed to rebuild an unpacked archive.
///
/// Magics are plain strings when printable ASCII, `hex:` prefixed otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    pub magic: String,
    pub sub_magic: String,
    pub endian: ByteOrder,
    pub alignment: u16,
    #[serde(default)]
    pub unknown: u16,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

const HEX_PREFIX: &str = "hex:";

pub fn magic_to_string(magic: &[u8; 4]) -> String {
    let printable = magic.iter().all(|b| b.is_ascii_graphic() || *b == b' ');
    if printable && !magic.starts_with(HEX_PREFIX.as_bytes()) {
        magic.iter().map(|&b| b as char).collect()
    } else {
        format!("{HEX_PREFIX}{}", hex::encode(magic))
    }
}

pub fn parse_magic(s: &str) -> Result<[u8; 4]> {
    let mut out = [0u8; 4];
    if let Some(digits) = s.strip_prefix(HEX_PREFIX) {
        hex::decode_to_slice(digits, &mut out)
            .with_context(|| format!("invalid hex magic: {s:?}"))?;
        return Ok(out);
    }
    if s.len() != 4 {
        bail!("magic must be exactly 4 bytes: {s:?}");
    }
    out.copy_from_slice(s.as_bytes());
    Ok(out)
}

impl PackManifest {
    /// Describe `archive`, naming each entry's payload file.
    pub fn describe(archive: &Archive, file_for: impl Fn(usize, i32) -> PathBuf) -> Self {
        Self {
            magic: magic_to_string(&archive.magic),
            sub_magic: magic_to_string(&archive.sub_magic),
            endian: archive.endian.into(),
            alignment: archive.alignment,
            unknown: archive.unknown,
            entries: archive
                .entries()
                .iter()
                .enumerate()
                .map(|(i, e)| ManifestEntry {
                    id: e.id,
                    file: file_for(i, e.id),
                })
                .collect(),
        }
    }

    pub fn kind(&self) -> Result<ArchiveKind> {
        Ok(ArchiveKind::new(
            "manifest",
            parse_magic(&self.magic)?,
            parse_magic(&self.sub_magic)?,
            self.endian.into(),
        ))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing manifest {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = std::fs::File::create(path.as_ref())?;
        serde_yaml::to_writer(&mut writer, self)?;
        Ok(())
    }

    /// Rebuild the archive, resolving entry files against `base`.
    pub fn build(&self, base: &Path) -> Result<Archive> {
        let mut archive = Archive::new(&self.kind()?, self.alignment);
        archive.unknown = self.unknown;
        for entry in &self.entries {
            let path = base.join(&entry.file);
            let data = std::fs::read(&path)
                .with_context(|| format!("reading entry {} from {}", entry.id, path.display()))?;
            archive.push(entry.id, data);
        }
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_strings() {
        assert_eq!(parse_magic("PACK").unwrap(), *b"PACK");
        assert_eq!(magic_to_string(b"\x00\x01AB"), "hex:00014142");
        assert_eq!(parse_magic("hex:00014142").unwrap(), *b"\x00\x01AB");
        assert!(parse_magic("PAC").is_err());
        assert!(parse_magic("hex:0001").is_err());
    }

    #[test]
    fn malformed_hex_magic_is_an_error() {
        assert!(parse_magic("hex:a\u{e9}\u{e9}\u{e9}b").is_err());
        assert!(parse_magic("hex:+1+2+3+4").is_err());
        assert!(parse_magic("hex:0001020g").is_err());
    }

    #[test]
    fn magic_spelling_the_prefix_survives() {
        let text = magic_to_string(b"hex:");
        assert_eq!(text, "hex:6865783a");
        assert_eq!(parse_magic(&text).unwrap(), *b"hex:");
    }

    #[test]
    fn manifest_document() {
        let doc = r#"
magic: PACK
sub_magic: "0001"
endian: big
alignment: 16
entries:
  - id: 3
    file: 0000_3.bin
"#;
        let manifest: PackManifest = serde_yaml::from_str(doc).unwrap();
        assert_eq!(manifest.endian, ByteOrder::Big);
        assert_eq!(manifest.unknown, 0);
        assert_eq!(manifest.entries[0].file, PathBuf::from("0000_3.bin"));
        let kind = manifest.kind().unwrap();
        assert_eq!(kind.sub_magic, *b"0001");
        assert_eq!(kind.endian, Endian::Big);
    }
}

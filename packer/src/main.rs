use anyhow::{bail, Context, Result};
use binpak_core::format::archive::{sniff_any, Archive};
use binpak_core::format::record::{NamedRecord, NamedTableKind, RecordTable};
use binpak_core::sniff::{detect, Probe, Sniff};
use binpak_core::typed::{Schema, ValueTable};
use binpak_core::Endian;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod manifest;

use manifest::{magic_to_string, ByteOrder, PackManifest, MANIFEST_FILE};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect, unpack and rebuild offset-linked binary containers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the format of a file and print its layout
    Info { file: PathBuf },

    /// Extract every archive entry plus a manifest
    Unpack { archive: PathBuf, dir: PathBuf },

    /// Rebuild an archive from a manifest
    Pack { manifest: PathBuf, out: PathBuf },

    /// Decode a value blob with the first schema whose width matches
    Params {
        blob: PathBuf,

        #[arg(short, long = "schema", required = true)]
        schemas: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "little")]
        endian: ByteOrder,

        /// Assignment as `field=value`, may repeat
        #[arg(long = "set")]
        sets: Vec<String>,

        /// Where to write the edited blob
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn archive_le(data: &[u8]) -> bool {
    sniff_any(data, Endian::Little)
}

fn archive_be(data: &[u8]) -> bool {
    sniff_any(data, Endian::Big)
}

fn named_table(data: &[u8], endian: Endian) -> Option<NamedTableKind> {
    let version = data.get(4..8)?;
    let version = [version[0], version[1], version[2], version[3]];
    let version = match endian {
        Endian::Little => u32::from_le_bytes(version),
        Endian::Big => u32::from_be_bytes(version),
    };
    let kind = NamedTableKind::new("named table", version, endian);
    kind.sniff(data).then_some(kind)
}

fn named_le(data: &[u8]) -> bool {
    named_table(data, Endian::Little).is_some()
}

fn named_be(data: &[u8]) -> bool {
    named_table(data, Endian::Big).is_some()
}

const PROBES: [Probe; 4] = [
    Probe { name: "archive (little endian)", check: archive_le },
    Probe { name: "archive (big endian)", check: archive_be },
    Probe { name: "named table (little endian)", check: named_le },
    Probe { name: "named table (big endian)", check: named_be },
];

fn read_archive(path: &Path) -> Result<Archive> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let endian = if archive_le(&data) {
        Endian::Little
    } else if archive_be(&data) {
        Endian::Big
    } else {
        bail!("{} is not an archive", path.display());
    };
    Ok(Archive::read(&data, endian)?)
}

fn info(path: &Path) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let candidates: Vec<&dyn Sniff> = PROBES.iter().map(|p| p as &dyn Sniff).collect();
    let Some(found) = detect(&data, &candidates) else {
        bail!("{}: unrecognized format ({} bytes)", path.display(), data.len());
    };
    println!("{}: {}", path.display(), found.name());

    if archive_le(&data) || archive_be(&data) {
        let endian = if archive_le(&data) { Endian::Little } else { Endian::Big };
        let archive = Archive::read(&data, endian)?;
        println!(
            "magic {} / {}, alignment {}, unknown 0x{:04X}, {} entries, {} payload bytes",
            magic_to_string(&archive.magic),
            magic_to_string(&archive.sub_magic),
            archive.alignment,
            archive.unknown,
            archive.len(),
            archive.payload_size()
        );
        for entry in archive.entries() {
            println!(
                "  id {:>6}  offset 0x{:08X}  size 0x{:X}",
                entry.id,
                entry.offset().unwrap_or_default(),
                entry.len()
            );
        }
    } else {
        let endian = if named_le(&data) { Endian::Little } else { Endian::Big };
        let table = RecordTable::<NamedRecord>::from_bytes(&data, endian)?;
        println!("version {}, {} records", table.version, table.len());
        for record in &table {
            println!(
                "  id {:>6}  tag 0x{:X}  values {:?}  {}",
                record.id, record.tag, record.values, record.name
            );
        }
    }
    Ok(())
}

fn unpack(archive_path: &Path, dir: &Path) -> Result<()> {
    let archive = read_archive(archive_path)?;
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let manifest = PackManifest::describe(&archive, |i, id| PathBuf::from(format!("{i:04}_{id}.bin")));
    for (entry, item) in archive.entries().iter().zip(&manifest.entries) {
        std::fs::write(dir.join(&item.file), &entry.data)?;
    }
    manifest.save(dir.join(MANIFEST_FILE))?;

    log::info!("unpacked {} entries into {}", archive.len(), dir.display());
    Ok(())
}

fn pack(manifest_path: &Path, out: &Path) -> Result<()> {
    let manifest = PackManifest::load(manifest_path)?;
    let base = manifest_path.parent().unwrap_or(Path::new("."));
    let archive = manifest.build(base)?;
    let bytes = archive.write()?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;

    log::info!("packed {} entries, {} bytes", archive.len(), bytes.len());
    Ok(())
}

fn params(
    blob: &Path,
    schema_paths: &[PathBuf],
    endian: Endian,
    sets: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let schemas = schema_paths
        .iter()
        .map(|p| {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            Schema::from_yaml(&text).with_context(|| format!("parsing schema {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let data = std::fs::read(blob).with_context(|| format!("reading {}", blob.display()))?;
    let mut table = ValueTable::from_bytes(&data, endian);
    let Some(index) = table.apply_first(&schemas)? else {
        bail!("no schema matches a {} byte blob", data.len());
    };
    println!("schema {}", schemas[index].name);

    for set in sets {
        let Some((name, value)) = set.split_once('=') else {
            bail!("expected field=value, got {set:?}");
        };
        table.set_by_name(name.trim(), value)?;
    }

    for field in table.fields() {
        let descriptor = field.descriptor();
        let marker = if descriptor.check_editor_range(&field.value()) { "" } else { "  (out of editor range)" };
        println!(
            "  {:<24} {:<4} {}{}",
            descriptor.name, descriptor.field_type, field.value(), marker
        );
    }

    if let Some(out) = output {
        std::fs::write(out, table.to_bytes()).with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Info { file } => info(&file),
        Command::Unpack { archive, dir } => unpack(&archive, &dir),
        Command::Pack { manifest, out } => pack(&manifest, &out),
        Command::Params {
            blob,
            schemas,
            endian,
            sets,
            output,
        } => params(&blob, &schemas, endian.into(), &sets, output.as_deref()),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binpak_core::format::archive::ArchiveKind;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("packer-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn unpack_then_pack_reproduces_archive() -> Result<()> {
        let dir = scratch("roundtrip");
        let kind = ArchiveKind::new("test", *b"PACK", *b"\x00\x00\x01\x00", Endian::Big);
        let mut archive = Archive::new(&kind, 16);
        archive.push(10, vec![1, 2, 3]);
        archive.push(-1, Vec::new());
        let original = archive.write()?;

        let input = dir.join("in.pak");
        std::fs::write(&input, &original)?;
        unpack(&input, &dir.join("out"))?;

        let manifest = PackManifest::load(dir.join("out").join(MANIFEST_FILE))?;
        assert_eq!(manifest.sub_magic, "hex:00000100");
        assert_eq!(manifest.entries.len(), 2);

        let rebuilt = dir.join("re.pak");
        pack(&dir.join("out").join(MANIFEST_FILE), &rebuilt)?;
        assert_eq!(std::fs::read(&rebuilt)?, original);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn probes_tell_formats_apart() -> Result<()> {
        let mut table = RecordTable::new(9);
        table.push(NamedRecord::new("a", 1, 2));
        let bytes = table.to_bytes(Endian::Big)?;
        let candidates: Vec<&dyn Sniff> = PROBES.iter().map(|p| p as &dyn Sniff).collect();
        assert_eq!(
            detect(&bytes, &candidates).map(|s| s.name()),
            Some("named table (big endian)")
        );
        Ok(())
    }
}

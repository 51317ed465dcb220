//! C++ source generation for extracted resources.
//!
//! Every resource becomes one translation unit that embeds the file bytes
//! under C-linkage symbols derived from the declared name:
//!
//!   resman_<ident>_data   const unsigned char[]
//!   resman_<ident>_size   const unsigned long long
//!   resman_<ident>_type   const char[]  (declared type)
//!   resman_<ident>_path   const char[]  (declared path)
//!
//! An index unit adds a null-terminated `resman_resource_table` so the
//! resources can be enumerated without knowing their identifiers.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::CoreError;
use crate::resource::ResourceRecord;

/// File name of the generated index unit.
pub const INDEX_FILE: &str = "resman_index.cpp";

const UNIT_PREFIX: &str = "res_";
const HEADER: &str = "// Generated by resman. Do not edit.\n";
const BYTES_PER_LINE: usize = 16;

/// Map a declared name onto a valid C identifier.
pub fn sanitize_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Locate the file behind `record` in the search directories.
///
/// The first directory containing the file wins. An empty search list
/// resolves relative paths against the current directory.
pub fn resolve_resource(
    record: &ResourceRecord,
    search_paths: &[PathBuf],
) -> Result<PathBuf, CoreError> {
    let declared = Path::new(&record.source_path);
    let searched: Vec<PathBuf> = if declared.is_absolute() {
        Vec::new()
    } else if search_paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        search_paths.to_vec()
    };

    let found = if searched.is_empty() {
        declared.is_file().then(|| declared.to_path_buf())
    } else {
        searched
            .iter()
            .map(|dir| dir.join(declared))
            .find(|candidate| candidate.is_file())
    };

    found.ok_or_else(|| CoreError::ResourceNotFound {
        name: record.name.clone(),
        path: record.source_path.clone(),
        searched,
    })
}

/// Write one source file per record plus the index into `output_dir`.
///
/// Returns the written files in file-name order. Output is a pure function
/// of `records` and the resource contents: stale units from earlier runs
/// are removed and nothing time-dependent is emitted.
pub fn synthesize(
    records: &[ResourceRecord],
    output_dir: &Path,
    search_paths: &[PathBuf],
) -> Result<Vec<PathBuf>, CoreError> {
    let idents = assign_identifiers(records)?;

    let mut units = Vec::with_capacity(records.len());
    for (record, ident) in records.iter().zip(&idents) {
        let resolved = resolve_resource(record, search_paths)?;
        let bytes = fs::read(&resolved).map_err(|source| CoreError::io(&resolved, source))?;
        debug!(
            "embedding `{}` from {} ({} bytes)",
            record.name,
            resolved.display(),
            bytes.len()
        );
        units.push(EmbeddedUnit {
            record,
            ident,
            bytes,
        });
    }

    fs::create_dir_all(output_dir).map_err(|source| CoreError::io(output_dir, source))?;

    let width = index_width(units.len());
    let mut written = Vec::with_capacity(units.len() + 1);
    for (index, unit) in units.iter().enumerate() {
        let path = output_dir.join(unit_file_name(index, width, unit.ident));
        write_file(&path, &render_unit(unit))?;
        written.push(path);
    }
    let index_path = output_dir.join(INDEX_FILE);
    write_file(&index_path, &render_index(&units))?;
    written.push(index_path);

    remove_stale_units(output_dir, &written)?;
    written.sort();

    info!(
        "synthesized {} resource unit(s) into {}",
        units.len(),
        output_dir.display()
    );
    Ok(written)
}

struct EmbeddedUnit<'a> {
    record: &'a ResourceRecord,
    ident: &'a str,
    bytes: Vec<u8>,
}

fn assign_identifiers(records: &[ResourceRecord]) -> Result<Vec<String>, CoreError> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(records.len());
    let mut idents = Vec::with_capacity(records.len());
    for record in records {
        let ident = sanitize_identifier(&record.name);
        if let Some(first) = seen.get(&ident) {
            return Err(CoreError::NameCollision {
                ident,
                first: (*first).to_string(),
                second: record.name.clone(),
            });
        }
        seen.insert(ident.clone(), &record.name);
        idents.push(ident);
    }
    Ok(idents)
}

/// Digits needed so every unit index has the same width, at least four.
/// File-name order must match record order.
fn index_width(count: usize) -> usize {
    count.saturating_sub(1).to_string().len().max(4)
}

fn unit_file_name(index: usize, width: usize, ident: &str) -> String {
    format!("{UNIT_PREFIX}{index:0width$}_{ident}.cpp")
}

fn render_unit(unit: &EmbeddedUnit<'_>) -> String {
    let ident = unit.ident;
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str(&format!("// resource `{ident}`\n"));
    out.push_str("\nextern \"C\" {\n\n");

    out.push_str(&format!("extern const unsigned char resman_{ident}_data[] = {{\n"));
    if unit.bytes.is_empty() {
        out.push_str("    0x00,\n");
    }
    for chunk in unit.bytes.chunks(BYTES_PER_LINE) {
        out.push_str("   ");
        for byte in chunk {
            out.push_str(&format!(" 0x{byte:02x},"));
        }
        out.push('\n');
    }
    out.push_str("};\n");
    out.push_str(&format!(
        "extern const unsigned long long resman_{ident}_size = {}ULL;\n",
        unit.bytes.len()
    ));
    out.push_str(&format!(
        "extern const char resman_{ident}_type[] = {};\n",
        cpp_string(&unit.record.declared_type)
    ));
    out.push_str(&format!(
        "extern const char resman_{ident}_path[] = {};\n",
        cpp_string(&unit.record.source_path)
    ));
    out.push_str("\n}\n");
    out
}

fn render_index(units: &[EmbeddedUnit<'_>]) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\nextern \"C\" {\n\n");
    out.push_str(
        "struct resman_entry {\n    const char* name;\n    const char* type;\n    const char* path;\n    const unsigned char* data;\n    unsigned long long size;\n};\n\n",
    );

    for unit in units {
        let ident = unit.ident;
        out.push_str(&format!("extern const unsigned char resman_{ident}_data[];\n"));
        out.push_str(&format!("extern const char resman_{ident}_type[];\n"));
        out.push_str(&format!("extern const char resman_{ident}_path[];\n"));
    }
    if !units.is_empty() {
        out.push('\n');
    }

    out.push_str("extern const resman_entry resman_resource_table[] = {\n");
    for unit in units {
        let ident = unit.ident;
        out.push_str(&format!(
            "    {{ {}, resman_{ident}_type, resman_{ident}_path, resman_{ident}_data, {}ULL }},\n",
            cpp_string(&unit.record.name),
            unit.bytes.len()
        ));
    }
    out.push_str("    { nullptr, nullptr, nullptr, nullptr, 0ULL },\n};\n");
    out.push_str(&format!(
        "extern const unsigned long long resman_resource_count = {}ULL;\n",
        units.len()
    ));
    out.push_str("\n}\n");
    out
}

/// Quote `text` as a C++ narrow string literal.
fn cpp_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'?' => out.push_str("\\?"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\{byte:03o}")),
        }
    }
    out.push('"');
    out
}

fn write_file(path: &Path, contents: &str) -> Result<(), CoreError> {
    fs::write(path, contents).map_err(|source| CoreError::io(path, source))
}

fn remove_stale_units(output_dir: &Path, keep: &[PathBuf]) -> Result<(), CoreError> {
    let keep: HashSet<&Path> = keep.iter().map(PathBuf::as_path).collect();
    let entries = fs::read_dir(output_dir).map_err(|source| CoreError::io(output_dir, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| CoreError::io(output_dir, source))?;
        let path = entry.path();
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let generated = file_name.starts_with(UNIT_PREFIX) && file_name.ends_with(".cpp");
        if generated && path.is_file() && !keep.contains(path.as_path()) {
            debug!("removing stale unit {}", path.display());
            fs::remove_file(&path).map_err(|source| CoreError::io(&path, source))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, path: &str) -> ResourceRecord {
        ResourceRecord::new(name, "const resman::Resource<1>", path)
    }

    fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| {
                let entry = entry.expect("entry");
                (
                    entry.file_name().to_string_lossy().into_owned(),
                    fs::read(entry.path()).expect("read file"),
                )
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn sanitizes_identifiers() {
        assert_eq!(sanitize_identifier("icon"), "icon");
        assert_eq!(sanitize_identifier("ui::icon-big"), "ui__icon_big");
        assert_eq!(sanitize_identifier("9lives"), "_9lives");
        assert_eq!(sanitize_identifier("operator+"), "operator_");
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("naïve"), "na_ve");
    }

    #[test]
    fn escapes_cpp_strings() {
        assert_eq!(cpp_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(cpp_string("line\n"), "\"line\\012\"");
        assert_eq!(cpp_string("??="), "\"\\?\\?=\"");
    }

    #[test]
    fn unit_names_sort_in_record_order_past_ten_thousand() {
        assert_eq!(index_width(0), 4);
        assert_eq!(index_width(10_000), 4);
        assert_eq!(index_width(10_001), 5);

        let count = 12_000;
        let width = index_width(count);
        let names: Vec<_> = [0, 1_999, 9_999, 10_000, 11_999]
            .into_iter()
            .map(|index| unit_file_name(index, width, "r"))
            .collect();
        assert_eq!(names[0], "res_00000_r.cpp");
        assert_eq!(names[3], "res_10000_r.cpp");
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
    }

    #[test]
    fn embeds_resource_bytes_under_stable_symbols() {
        let assets = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(assets.path().join("assets")).expect("mkdir");
        fs::write(assets.path().join("assets/icon.png"), [0x89, b'P', b'N', b'G']).expect("write");
        let out = tempfile::tempdir().expect("tempdir");

        let written = synthesize(
            &[record("icon", "assets/icon.png")],
            out.path(),
            &[assets.path().to_path_buf()],
        )
        .expect("synthesize");

        assert_eq!(
            written,
            vec![
                out.path().join("res_0000_icon.cpp"),
                out.path().join(INDEX_FILE)
            ]
        );
        let unit = fs::read_to_string(&written[0]).expect("read unit");
        assert!(unit.contains("extern const unsigned char resman_icon_data[] = {"));
        assert!(unit.contains(" 0x89, 0x50, 0x4e, 0x47,"));
        assert!(unit.contains("resman_icon_size = 4ULL;"));
        assert!(unit.contains("resman_icon_type[] = \"const resman::Resource<1>\";"));
        assert!(unit.contains("resman_icon_path[] = \"assets/icon.png\";"));

        let index = fs::read_to_string(&written[1]).expect("read index");
        assert!(index.contains(
            "{ \"icon\", resman_icon_type, resman_icon_path, resman_icon_data, 4ULL },"
        ));
        assert!(index.contains("resman_resource_count = 1ULL;"));
    }

    #[test]
    fn empty_records_produce_an_empty_index() {
        let out = tempfile::tempdir().expect("tempdir");
        let written = synthesize(&[], out.path(), &[]).expect("synthesize");
        assert_eq!(written, vec![out.path().join(INDEX_FILE)]);
        let index = fs::read_to_string(&written[0]).expect("read index");
        assert!(index.contains("resman_resource_count = 0ULL;"));
    }

    #[test]
    fn empty_files_still_define_data() {
        let assets = tempfile::tempdir().expect("tempdir");
        fs::write(assets.path().join("empty.bin"), []).expect("write");
        let out = tempfile::tempdir().expect("tempdir");
        let written = synthesize(
            &[record("empty", "empty.bin")],
            out.path(),
            &[assets.path().to_path_buf()],
        )
        .expect("synthesize");
        let unit = fs::read_to_string(&written[0]).expect("read unit");
        assert!(unit.contains("resman_empty_data[] = {\n    0x00,\n};"));
        assert!(unit.contains("resman_empty_size = 0ULL;"));
    }

    #[test]
    fn first_search_path_match_wins() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        fs::write(second.path().join("a.txt"), "second").expect("write");
        fs::write(first.path().join("a.txt"), "first").expect("write");
        let search = [
            tempfile::tempdir().expect("tempdir").path().to_path_buf(),
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ];
        let resolved = resolve_resource(&record("a", "a.txt"), &search).expect("resolve");
        assert_eq!(resolved, first.path().join("a.txt"));
    }

    #[test]
    fn absolute_paths_bypass_search() {
        let assets = tempfile::tempdir().expect("tempdir");
        let file = assets.path().join("abs.bin");
        fs::write(&file, "x").expect("write");
        let resolved = resolve_resource(
            &record("abs", file.to_str().expect("utf-8 path")),
            &[PathBuf::from("/nonexistent")],
        )
        .expect("resolve");
        assert_eq!(resolved, file);
    }

    #[test]
    fn missing_resource_aborts_synthesis() {
        let assets = tempfile::tempdir().expect("tempdir");
        fs::write(assets.path().join("present.txt"), "ok").expect("write");
        let out = tempfile::tempdir().expect("tempdir");
        let err = synthesize(
            &[record("present", "present.txt"), record("gone", "gone.txt")],
            &out.path().join("src"),
            &[assets.path().to_path_buf()],
        )
        .unwrap_err();
        match err {
            CoreError::ResourceNotFound {
                name,
                path,
                searched,
            } => {
                assert_eq!(name, "gone");
                assert_eq!(path, "gone.txt");
                assert_eq!(searched, vec![assets.path().to_path_buf()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.path().join("src").exists(), "nothing should be written");
    }

    #[test]
    fn colliding_identifiers_are_rejected() {
        let assets = tempfile::tempdir().expect("tempdir");
        fs::write(assets.path().join("a.txt"), "a").expect("write");
        let out = tempfile::tempdir().expect("tempdir");
        let err = synthesize(
            &[record("ui::icon", "a.txt"), record("ui__icon", "a.txt")],
            out.path(),
            &[assets.path().to_path_buf()],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NameCollision { ref ident, ref first, ref second }
                if ident == "ui__icon" && first == "ui::icon" && second == "ui__icon"
        ));
    }

    #[test]
    fn rerun_is_byte_identical_and_drops_stale_units() {
        let assets = tempfile::tempdir().expect("tempdir");
        fs::write(assets.path().join("a.txt"), "alpha").expect("write");
        fs::write(assets.path().join("b.txt"), "beta").expect("write");
        let out = tempfile::tempdir().expect("tempdir");
        let search = [assets.path().to_path_buf()];
        let records = [record("a", "a.txt"), record("b", "b.txt")];

        synthesize(&records, out.path(), &search).expect("first run");
        let first = snapshot(out.path());
        synthesize(&records, out.path(), &search).expect("second run");
        assert_eq!(first, snapshot(out.path()));

        fs::write(out.path().join("notes.txt"), "keep me").expect("write");
        synthesize(&records[..1], out.path(), &search).expect("third run");
        let names: Vec<_> = snapshot(out.path()).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["notes.txt", "res_0000_a.cpp", INDEX_FILE]);
    }
}

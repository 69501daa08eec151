use anyhow::Context;
use kconvert_fmt::kconvert_core::{Attribute, NAME_PREFIX, SourceLocation, VariabilityModel};
use log::{debug, info, trace, warn};
use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

/// Prefix of the names of Kconfig files.
const KCONFIG_PREFIX: &str = "Kconfig";

// Matches `config FOO` and `menuconfig FOO`, unless commented out.
static CONFIG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^#]*config\s*([A-Za-z0-9_]+)$").unwrap());

/// Records in the model where its symbols are declared among the Kconfig files of the source tree.
///
/// Locations are relative to `source_tree`.
/// Kconfig files that cannot be read are skipped,
/// while directories that cannot be read are an error.
/// Returns the number of locations found.
pub fn add_source_locations(
    model: &mut VariabilityModel,
    source_tree: &Path,
) -> anyhow::Result<usize> {
    info!("scanning '{}' for symbol declarations", source_tree.display());
    let mut found = 0;
    scan_directory(model, source_tree, source_tree, &mut found)?;
    model
        .descriptor_mut()
        .add_attribute(Attribute::SourceLocations);
    info!("found {found} source locations");
    Ok(found)
}

fn scan_directory(
    model: &mut VariabilityModel,
    root: &Path,
    path: &Path,
    found: &mut usize,
) -> anyhow::Result<()> {
    for entry in fs::read_dir(path)
        .with_context(|| format!("failed to read directory '{}'", path.display()))?
    {
        let entry = entry.context("failed to read directory entry")?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            trace!("skipping '{}'", entry.path().display());
            continue;
        };
        let path = entry.path();
        if path.is_dir() {
            if !file_name.starts_with('.') {
                scan_directory(model, root, &path, found)?;
            }
        } else if file_name.starts_with(KCONFIG_PREFIX) && path.is_file() {
            match scan_file(model, root, &path) {
                Ok(count) => *found += count,
                Err(err) => warn!("skipping '{}': {err:#}", path.display()),
            }
        }
    }
    Ok(())
}

fn scan_file(model: &mut VariabilityModel, root: &Path, path: &Path) -> anyhow::Result<usize> {
    debug!("scanning '{}'", path.display());
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open file '{}'", path.display()))?;
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut found = 0;
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        // Help texts are not always valid UTF-8.
        let line = String::from_utf8_lossy(&line);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        let Some(captures) = CONFIG_REGEX.captures(line) else {
            continue;
        };
        let name = format!("{NAME_PREFIX}{}", &captures[1]);
        if model.contains(&name) {
            trace!("'{name}' declared at {}:{}", relative.display(), index + 1);
            let location = SourceLocation {
                file: relative.to_path_buf(),
                line: index + 1,
            };
            model.add_source_location(&name, location)?;
            found += 1;
        }
    }
    Ok(found)
}

/// Deletes every file next to `output_base` whose name starts with the name of `output_base`,
/// such as the `.dimacs` and `.rsf` files and whatever else the extraction tool left behind.
///
/// Failures are logged, not returned.
pub fn delete_output_files(output_base: &Path) {
    let Some(prefix) = output_base.file_name().and_then(|name| name.to_str()) else {
        warn!("invalid output base '{}'", output_base.display());
        return;
    };
    let dir = match output_base.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to read directory '{}': {err}", dir.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(prefix));
        if matches && path.is_file() {
            match fs::remove_file(&path) {
                Ok(()) => debug!("deleted '{}'", path.display()),
                Err(err) => warn!("failed to delete '{}': {err}", path.display()),
            }
        }
    }
}

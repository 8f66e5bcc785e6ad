//! Path resolution for manifest entries.
//!
//! All path arithmetic here is lexical: nothing touches the filesystem except
//! the caller's existence check. Inputs are resolved against the root
//! directory, outputs mirror the input's position under the root, and three
//! guards keep outputs where they belong:
//!
//! | Guard | Trigger | Result |
//! |---|---|---|
//! | Escape | input lies outside the root | output flattened to `<stem>.avif` |
//! | Collision | output would overwrite the input | `<stem>-compressed.avif` |
//! | Duplicate | an earlier entry claimed the output, or another entry reads from it | `<stem>-2.avif`, `<stem>-3.avif`, … |
//!
//! ```text
//! root/photos/a.jpg   --output-dir out  →  root/out/photos/a.avif
//! root/photos/a.jpg   (no output dir)   →  root/photos/a.avif
//! /elsewhere/b.png    --output-dir out  →  root/out/b.avif
//! root/c.avif         (no output dir)   →  root/c-compressed.avif
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

pub const OUTPUT_EXTENSION: &str = "avif";

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. Leading `..` segments of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Resolve a raw manifest path: absolute paths are normalized as-is,
/// relative ones are joined to `root` first.
pub fn resolve_input(root: &Path, raw: &str) -> PathBuf {
    let raw = Path::new(raw);
    if raw.is_absolute() {
        normalize(raw)
    } else {
        normalize(&root.join(raw))
    }
}

/// Lexical relative path from `base` to `path`. Both must be absolute and
/// normalized. May start with `..` when `path` is outside `base`.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push(Component::ParentDir);
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    if relative.as_os_str().is_empty() {
        relative.push(Component::CurDir);
    }
    relative
}

/// Relative path rendered with `/` separators, for reports.
pub fn display_relative(path: &Path, base: &Path) -> String {
    relative_to(path, base)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn escapes(relative: &Path) -> bool {
    matches!(relative.components().next(), Some(Component::ParentDir))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn with_file_name(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{stem}{suffix}.{OUTPUT_EXTENSION}"))
}

/// Compute where the AVIF for `input` goes, before collision handling.
///
/// With an output directory the input's position under `root` is mirrored
/// there; inputs outside `root` are flattened to their file name. Without
/// one, the output sits beside the input.
pub fn build_output_path(root: &Path, output_dir: Option<&Path>, input: &Path) -> PathBuf {
    let stem = stem_of(input);
    match output_dir {
        Some(output_dir) => {
            let relative = relative_to(input, root);
            let relative_dir = if escapes(&relative) {
                PathBuf::new()
            } else {
                relative.parent().map(Path::to_path_buf).unwrap_or_default()
            };
            with_file_name(&output_dir.join(relative_dir), &stem, "")
        }
        None => {
            let dir = input.parent().unwrap_or(Path::new(""));
            with_file_name(dir, &stem, "")
        }
    }
}

/// Rename `output` to `<stem>-compressed.avif` when it would overwrite `input`.
pub fn avoid_source_collision(input: &Path, output: PathBuf) -> PathBuf {
    if output != input {
        return output;
    }
    let dir = output.parent().unwrap_or(Path::new(""));
    with_file_name(dir, &stem_of(&output), "-compressed")
}

/// Output paths claimed so far in a run.
///
/// A second input mapping to an already-claimed output gets the first free
/// numeric suffix instead of silently overwriting the earlier result. The
/// same input claiming again gets its original output back. Paths that any
/// manifest entry reads from are never handed out as outputs.
#[derive(Debug, Default)]
pub struct OutputClaims {
    owners: HashMap<PathBuf, PathBuf>,
    sources: HashSet<PathBuf>,
}

impl OutputClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims that refuse to hand out any of `sources` as an output.
    pub fn with_sources(sources: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            owners: HashMap::new(),
            sources: sources.into_iter().collect(),
        }
    }

    /// Claim `output` for `input`.
    ///
    /// Returns the path actually assigned and whether it had to be renumbered.
    pub fn claim(&mut self, input: &Path, output: PathBuf) -> (PathBuf, bool) {
        let (assigned, renumbered) = if self.is_free(input, &output) {
            (output, false)
        } else {
            (self.next_free(input, &output), true)
        };
        self.owners.insert(assigned.clone(), input.to_path_buf());
        (assigned, renumbered)
    }

    fn is_free(&self, input: &Path, candidate: &Path) -> bool {
        !self.sources.contains(candidate)
            && self
                .owners
                .get(candidate)
                .is_none_or(|owner| owner == input)
    }

    fn next_free(&self, input: &Path, taken: &Path) -> PathBuf {
        let dir = taken.parent().unwrap_or(Path::new(""));
        let stem = stem_of(taken);
        (2u32..)
            .map(|n| with_file_name(dir, &stem, &format!("-{n}")))
            .find(|candidate| self.is_free(input, candidate))
            .unwrap_or_else(|| taken.to_path_buf())
    }
}

/// Paths computed for one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub absolute_input: PathBuf,
    pub absolute_output: PathBuf,
    /// The output was moved to a numbered name by [`OutputClaims`].
    pub renumbered: bool,
}

/// Compute the final output for an existing input: mirror or flatten it,
/// step around the source file, then claim a unique path for this run.
pub fn resolve_output(
    root: &Path,
    output_dir: Option<&Path>,
    absolute_input: PathBuf,
    claims: &mut OutputClaims,
) -> ResolvedPaths {
    let output = build_output_path(root, output_dir, &absolute_input);
    let output = avoid_source_collision(&absolute_input, output);
    let (absolute_output, renumbered) = claims.claim(&absolute_input, output);
    ResolvedPaths {
        absolute_input,
        absolute_output,
        renumbered,
    }
}

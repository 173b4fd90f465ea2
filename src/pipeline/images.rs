//! Image relocation: copy referenced images next to the generated LaTeX.
//!
//! The transpiler emits `\includegraphics{path}` verbatim, so relative image
//! paths must resolve from the output directory. Before transpiling, every
//! `![alt](path)` target is copied to `<target>/images/<file name>` and the
//! Markdown is rewritten to point there.

use crate::error::XtoxError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static RE_IMAGE_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\((.*?)\)").unwrap());

/// Name of the sub-directory images are copied into.
pub const IMAGES_DIR: &str = "images";

/// Ordered `(original path, relocated path)` pairs.
pub type ImageMapping = Vec<(String, String)>;

/// Check if an image target is remote rather than a file.
pub fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Copy every image referenced in `markdown` into `<target_dir>/images`.
///
/// Each target is looked up relative to `source_dir` first, then as given.
/// Images that cannot be found are logged and skipped. Remote targets are
/// left alone. A file referenced more than once is copied once.
///
/// An image that already is its destination (source and target directory
/// being the same place, possibly through a symlink) is not copied. Two
/// different files sharing a file name get numbered names (`x.png`,
/// `x-2.png`). Mapping keys are the targets exactly as written between the
/// parentheses, so [`update_image_paths`] finds them again.
///
/// # Errors
/// Creating the images directory or copying an existing image failed.
pub fn copy_images_to_output_dir(
    markdown: &str,
    source_dir: &Path,
    target_dir: &Path,
) -> Result<ImageMapping, XtoxError> {
    let images_dir = target_dir.join(IMAGES_DIR);

    // Resolve everything first so no copy can clobber another referenced image.
    let mut found_images: Vec<(String, PathBuf, OsString)> = Vec::new();
    for caps in RE_IMAGE_TARGET.captures_iter(markdown) {
        let raw = &caps[1];
        let target = raw.trim();
        if target.is_empty() || is_url(target) || found_images.iter().any(|(r, _, _)| r == raw)
        {
            continue;
        }

        let Some(found) = locate(target, source_dir) else {
            warn!("Image not found: {}", target);
            continue;
        };
        let Some(file_name) = Path::new(target).file_name() else {
            warn!("Image path has no file name: {}", target);
            continue;
        };
        let found =
            std::fs::canonicalize(&found).map_err(|e| XtoxError::from_read(&found, e))?;
        found_images.push((raw.to_string(), found, file_name.to_os_string()));
    }

    let sources: HashSet<PathBuf> = found_images.iter().map(|(_, f, _)| f.clone()).collect();
    let mut placed: HashMap<PathBuf, String> = HashMap::new();
    let mut taken: HashSet<OsString> = HashSet::new();
    let mut mapping = ImageMapping::new();

    for (raw, found, file_name) in found_images {
        if let Some(relocated) = placed.get(&found) {
            mapping.push((raw, relocated.clone()));
            continue;
        }

        std::fs::create_dir_all(&images_dir).map_err(|e| XtoxError::OutputWriteFailed {
            path: images_dir.clone(),
            source: e,
        })?;

        let (name, dest, already_there) =
            pick_destination(&images_dir, &file_name, &found, &sources, &taken);
        if name != file_name {
            warn!(
                "Image name {} is already used, relocating {} as {}",
                file_name.to_string_lossy(),
                found.display(),
                name.to_string_lossy()
            );
        }

        if already_there {
            debug!("Image {} is already in place", dest.display());
        } else {
            std::fs::copy(&found, &dest).map_err(|e| XtoxError::OutputWriteFailed {
                path: dest.clone(),
                source: e,
            })?;
            debug!("Copied image {} -> {}", found.display(), dest.display());
        }

        let relocated = format!("{}/{}", IMAGES_DIR, name.to_string_lossy());
        taken.insert(name);
        placed.insert(found, relocated.clone());
        mapping.push((raw, relocated));
    }

    Ok(mapping)
}

/// First free name in `images_dir` for `found`: `x.png`, `x-2.png`, ...
///
/// A name is free when nothing was placed under it in this run and it does
/// not resolve to another referenced image. Returns the name, its path and
/// whether that path already is `found` itself.
fn pick_destination(
    images_dir: &Path,
    file_name: &OsStr,
    found: &Path,
    sources: &HashSet<PathBuf>,
    taken: &HashSet<OsString>,
) -> (OsString, PathBuf, bool) {
    let mut n = 1;
    loop {
        let name = numbered_name(file_name, n);
        let dest = images_dir.join(&name);
        let existing = std::fs::canonicalize(&dest).ok();
        let same_file = existing.as_deref() == Some(found);
        let clobbers_source = existing.as_ref().is_some_and(|d| sources.contains(d));
        if same_file || (!taken.contains(&name) && !clobbers_source) {
            return (name, dest, same_file);
        }
        n += 1;
    }
}

fn numbered_name(file_name: &OsStr, n: usize) -> OsString {
    if n == 1 {
        return file_name.to_os_string();
    }
    let path = Path::new(file_name);
    let stem = path.file_stem().unwrap_or(file_name).to_string_lossy();
    match path.extension() {
        Some(ext) => OsString::from(format!("{stem}-{n}.{}", ext.to_string_lossy())),
        None => OsString::from(format!("{stem}-{n}")),
    }
}

fn locate(target: &str, source_dir: &Path) -> Option<PathBuf> {
    let relative = source_dir.join(target);
    if relative.is_file() {
        return Some(relative);
    }
    let as_given = PathBuf::from(target);
    as_given.is_file().then_some(as_given)
}

/// Rewrite `](old)` link targets to `](new)` for every mapping entry.
pub fn update_image_paths(markdown: &str, mapping: &[(String, String)]) -> String {
    mapping
        .iter()
        .fold(markdown.to_string(), |text, (old, new)| {
            text.replace(&format!("]({old})"), &format!("]({new})"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_found_images_and_skips_missing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("assets")).unwrap();
        std::fs::write(src.path().join("assets/plot.png"), b"png").unwrap();

        let md = "![Plot](assets/plot.png)\n![Gone](missing.png)\n![Web](https://x.org/a.png)";
        let mapping = copy_images_to_output_dir(md, src.path(), out.path()).unwrap();

        assert_eq!(
            mapping,
            vec![("assets/plot.png".to_string(), "images/plot.png".to_string())]
        );
        assert_eq!(
            std::fs::read(out.path().join("images/plot.png")).unwrap(),
            b"png"
        );
    }

    #[test]
    fn repeated_reference_maps_once() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.png"), b"x").unwrap();

        let mapping =
            copy_images_to_output_dir("![](a.png) and ![again](a.png)", src.path(), out.path())
                .unwrap();
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn no_images_no_directory() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mapping = copy_images_to_output_dir("plain text", src.path(), out.path()).unwrap();
        assert!(mapping.is_empty());
        assert!(!out.path().join(IMAGES_DIR).exists());
    }

    #[test]
    fn rewrites_targets() {
        let mapping = vec![("assets/plot.png".to_string(), "images/plot.png".to_string())];
        let md = "![Plot](assets/plot.png) and ![](assets/plot.png)";
        assert_eq!(
            update_image_paths(md, &mapping),
            "![Plot](images/plot.png) and ![](images/plot.png)"
        );
    }

    #[test]
    fn output_dir_equal_to_source_dir_keeps_image() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("images")).unwrap();
        std::fs::write(src.path().join("images/a.png"), b"PNGDATA").unwrap();

        let mapping =
            copy_images_to_output_dir("![x](images/a.png)", src.path(), src.path()).unwrap();

        assert_eq!(
            mapping,
            vec![("images/a.png".to_string(), "images/a.png".to_string())]
        );
        assert_eq!(
            std::fs::read(src.path().join("images/a.png")).unwrap(),
            b"PNGDATA"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_output_dir_keeps_image() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("images")).unwrap();
        std::fs::write(src.path().join("images/a.png"), b"PNGDATA").unwrap();
        let holder = tempfile::tempdir().unwrap();
        let link = holder.path().join("out");
        std::os::unix::fs::symlink(src.path(), &link).unwrap();

        let mapping = copy_images_to_output_dir("![x](images/a.png)", src.path(), &link).unwrap();

        assert_eq!(mapping[0].1, "images/a.png");
        assert_eq!(
            std::fs::read(src.path().join("images/a.png")).unwrap(),
            b"PNGDATA",
            "image must not be truncated by copying onto itself"
        );
    }

    #[test]
    fn same_file_name_from_two_dirs_gets_numbered() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("a")).unwrap();
        std::fs::create_dir(src.path().join("b")).unwrap();
        std::fs::write(src.path().join("a/x.png"), b"first").unwrap();
        std::fs::write(src.path().join("b/x.png"), b"second").unwrap();

        let mapping =
            copy_images_to_output_dir("![](a/x.png)\n![](b/x.png)", src.path(), out.path())
                .unwrap();

        assert_eq!(
            mapping,
            vec![
                ("a/x.png".to_string(), "images/x.png".to_string()),
                ("b/x.png".to_string(), "images/x-2.png".to_string()),
            ]
        );
        assert_eq!(std::fs::read(out.path().join("images/x.png")).unwrap(), b"first");
        assert_eq!(std::fs::read(out.path().join("images/x-2.png")).unwrap(), b"second");
    }

    #[test]
    fn padded_target_is_rewritten() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("assets")).unwrap();
        std::fs::write(src.path().join("assets/plot.png"), b"png").unwrap();

        let md = "![p]( assets/plot.png )";
        let mapping = copy_images_to_output_dir(md, src.path(), out.path()).unwrap();

        assert!(out.path().join("images/plot.png").is_file());
        assert_eq!(update_image_paths(md, &mapping), "![p](images/plot.png)");
    }

    #[test]
    fn numbered_names() {
        assert_eq!(numbered_name(OsStr::new("x.png"), 1), OsString::from("x.png"));
        assert_eq!(numbered_name(OsStr::new("x.png"), 3), OsString::from("x-3.png"));
        assert_eq!(numbered_name(OsStr::new("figure"), 2), OsString::from("figure-2"));
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.org/a.png"));
        assert!(!is_url("img/a.png"));
    }
}

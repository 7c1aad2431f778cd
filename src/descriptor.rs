//! Build descriptor rewriting.
//!
//! A build descriptor declares exactly one version property that the build
//! tool reads. Two layouts are understood:
//! - Java properties files (`version=1.2.3`, `version: 1.2.3`)
//! - Ant build files (`<property name="version" value="1.2.3"/>`)

use regex::Regex;
use std::ops::Range;
use std::path::Path;

use crate::domain::Tag;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;

/// Default name of the version property
pub const DEFAULT_VERSION_KEY: &str = "version";

/// Layout of a build descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    Properties,
    AntXml,
}

impl DescriptorFormat {
    /// Pick the layout from the file extension (`.xml` is Ant, anything else properties)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => DescriptorFormat::AntXml,
            _ => DescriptorFormat::Properties,
        }
    }
}

/// Property patterns for `key`; group 2 captures the value.
fn version_patterns(key: &str, format: DescriptorFormat) -> Result<Vec<Regex>> {
    let key = regex::escape(key);
    let patterns = match format {
        DescriptorFormat::Properties => vec![format!(r"(?m)^([ \t]*{}[ \t]*[=:][ \t]*)([^\s#]*)", key)],
        DescriptorFormat::AntXml => vec![
            format!(
                r#"(<property\b[^>]*?\bname\s*=\s*["']{}["'][^>]*?\bvalue\s*=\s*["'])([^"']*)["']"#,
                key
            ),
            format!(
                r#"(<property\b[^>]*?\bvalue\s*=\s*["'])([^"']*)["'][^>]*?\bname\s*=\s*["']{}["']"#,
                key
            ),
        ],
    };

    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| ReleaseError::config(format!("Invalid version key: {}", e)))
        })
        .collect()
}

/// Byte ranges of `<!-- ... -->` blocks; an unterminated comment runs to the end
fn comment_spans(content: &str) -> Result<Vec<Range<usize>>> {
    let re = Regex::new(r"(?s)<!--.*?(?:-->|\z)")
        .map_err(|e| ReleaseError::config(format!("Invalid comment pattern: {}", e)))?;
    Ok(re.find_iter(content).map(|m| m.range()).collect())
}

/// Byte range of the value of the first live `key` property in `content`.
///
/// In Ant files, properties inside XML comments are skipped.
fn locate_version(content: &str, key: &str, format: DescriptorFormat) -> Result<Option<Range<usize>>> {
    let comments = match format {
        DescriptorFormat::AntXml => comment_spans(content)?,
        DescriptorFormat::Properties => Vec::new(),
    };
    let commented = |offset: usize| comments.iter().any(|span| span.contains(&offset));

    let mut found: Option<Range<usize>> = None;
    for re in version_patterns(key, format)? {
        let live = re
            .captures_iter(content)
            .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(2)?.range())))
            .find(|(start, _)| !commented(*start));

        if let Some((_, value)) = live {
            if found.as_ref().map_or(true, |current| value.start < current.start) {
                found = Some(value);
            }
        }
    }

    Ok(found)
}

/// Replaces the value of the first `key` property in `content` with `version`.
///
/// Returns `None` when no such property exists. Separators, surrounding
/// whitespace, quoting and line endings are kept as they were.
pub fn rewrite_version(
    content: &str,
    key: &str,
    format: DescriptorFormat,
    version: &str,
) -> Result<Option<String>> {
    Ok(locate_version(content, key, format)?.map(|value| {
        let mut rewritten = String::with_capacity(content.len() + version.len());
        rewritten.push_str(&content[..value.start]);
        rewritten.push_str(version);
        rewritten.push_str(&content[value.end..]);
        rewritten
    }))
}

/// Reads the current value of the `key` property, if any
pub fn read_version(content: &str, key: &str, format: DescriptorFormat) -> Result<Option<String>> {
    Ok(locate_version(content, key, format)?.map(|value| content[value].to_string()))
}

/// Rewrites the version property of the descriptor at `path` to match `tag`.
///
/// The tag prefix is stripped (`v1.2.4` is written as `1.2.4`). Returns
/// whether the file content changed; applying the same tag twice is a no-op.
///
/// # Errors
/// * `DescriptorNotFound` - `path` does not exist in the work tree
/// * `PropertyNotFound` - the descriptor has no `key` property
pub fn apply_version<R: Repository + ?Sized>(
    repo: &mut R,
    path: &Path,
    key: &str,
    tag: &Tag,
) -> Result<bool> {
    let display_path = path.display().to_string();

    if !repo.file_exists(path) {
        return Err(ReleaseError::descriptor_not_found(display_path));
    }

    let content = repo.read_file(path)?;
    let format = DescriptorFormat::from_path(path);
    let version = tag.version_str();

    let current = read_version(&content, key, format)?
        .ok_or_else(|| ReleaseError::property_not_found(&display_path, key))?;
    if current == version {
        tracing::debug!(path = %display_path, "descriptor already at {}", tag);
        return Ok(false);
    }

    let rewritten = rewrite_version(&content, key, format, &version)?
        .ok_or_else(|| ReleaseError::property_not_found(&display_path, key))?;
    repo.write_file(path, &rewritten)?;
    tracing::debug!(path = %display_path, from = %current, "descriptor set to {}", version);
    Ok(true)
}

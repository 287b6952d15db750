//! Key-path edits on YAML documents
//!
//! A key-path addresses one value inside a document. Supported forms:
//!
//! - Dot notation: `spec.template.spec`
//! - Dotted indices: `spec.containers.0.image`
//! - Bracket indices: `spec.containers[0].image`
//! - Quoted keys: `metadata.annotations["example.com/rev"]`
//! - Escaped dots: `labels.app\.kubernetes\.io/name`
//!
//! A dotted segment made of digits addresses a sequence element when the
//! value it is applied to is a sequence, and a mapping key otherwise.
//!
//! Edits parse the document with `serde_yaml`, change the value tree and
//! serialize it again with a trailing newline. Comments and original
//! formatting are not preserved.

use log::debug;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// Represents a segment in a key-path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A named key for accessing mapping members
    Key(String),
    /// A numeric index for accessing sequence elements
    Index(usize),
}

/// Parse a key-path into segments
///
/// # Examples
///
/// ```
/// use yaml_updater::patch::{parse_path, PathSegment};
///
/// let segments = parse_path("containers[0].image");
/// assert_eq!(segments[1], PathSegment::Index(0));
/// ```
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    if path.trim().is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
            }
            '.' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                }

                match chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        chars.next();
                        let mut key = String::new();
                        let mut bracket_escaped = false;

                        while let Some(ch) = chars.next() {
                            if bracket_escaped {
                                key.push(ch);
                                bracket_escaped = false;
                            } else if ch == '\\' {
                                bracket_escaped = true;
                            } else if ch == quote && chars.peek() == Some(&']') {
                                chars.next();
                                break;
                            } else {
                                key.push(ch);
                            }
                        }

                        segments.push(PathSegment::Key(key));
                    }
                    _ => {
                        let mut content = String::new();
                        for next_ch in chars.by_ref() {
                            if next_ch == ']' {
                                break;
                            }
                            content.push(next_ch);
                        }

                        let content = content.trim();
                        if let Ok(idx) = content.parse::<usize>() {
                            segments.push(PathSegment::Index(idx));
                        } else if !content.is_empty() {
                            segments.push(PathSegment::Key(content.to_string()));
                        }
                    }
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Key(current));
    }

    segments
}

/// Set the value at `path` to the string `value`, creating missing
/// mappings and sequences along the way.
pub fn set_key(content: &[u8], path: &str, value: &str) -> Result<Vec<u8>> {
    let segments = checked_segments(path)?;
    let mut document = load(content, path)?;

    let target = navigate_create(&mut document, &segments, path)?;
    *target = YamlValue::String(value.to_string());

    dump(&document, path)
}

/// Remove the value at `path`. A path that does not exist leaves the
/// document unchanged.
pub fn remove_key(content: &[u8], path: &str) -> Result<Vec<u8>> {
    let segments = checked_segments(path)?;
    let mut document = load(content, path)?;

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| patch_error(path, "empty key-path"))?;

    let removed = match navigate_existing(&mut document, parents) {
        Some(YamlValue::Mapping(map)) => match last {
            PathSegment::Key(key) => map.shift_remove(key.as_str()).is_some(),
            PathSegment::Index(idx) => map.shift_remove(idx.to_string().as_str()).is_some(),
        },
        Some(YamlValue::Sequence(seq)) => match sequence_index(last) {
            Some(idx) if idx < seq.len() => {
                seq.remove(idx);
                true
            }
            _ => false,
        },
        _ => false,
    };

    if !removed {
        debug!("Key '{}' not present, nothing to remove", path);
    }

    dump(&document, path)
}

/// Look up the value at `path` and render it as a string.
///
/// Returns `Ok(None)` when the path does not exist. Non-string scalars are
/// rendered with their YAML representation.
pub fn get_key(content: &[u8], path: &str) -> Result<Option<String>> {
    let segments = checked_segments(path)?;
    let mut document = load(content, path)?;

    let rendered = match navigate_existing(&mut document, &segments) {
        None => None,
        Some(YamlValue::String(s)) => Some(s.clone()),
        Some(YamlValue::Bool(b)) => Some(b.to_string()),
        Some(YamlValue::Number(n)) => Some(n.to_string()),
        Some(YamlValue::Null) => Some(String::new()),
        Some(other) => Some(
            serde_yaml::to_string(other)
                .map_err(|e| patch_error(path, format!("failed to render value: {}", e)))?
                .trim_end()
                .to_string(),
        ),
    };
    Ok(rendered)
}

fn checked_segments(path: &str) -> Result<Vec<PathSegment>> {
    let segments = parse_path(path);
    if segments.is_empty() {
        return Err(patch_error(path, "empty key-path"));
    }
    Ok(segments)
}

fn load(content: &[u8], path: &str) -> Result<YamlValue> {
    let text = std::str::from_utf8(content)
        .map_err(|_| patch_error(path, "file content is not valid UTF-8"))?;
    if text.trim().is_empty() {
        return Ok(YamlValue::Null);
    }
    serde_yaml::from_str(text)
        .map_err(|e| patch_error(path, format!("failed to parse YAML: {}", e)))
}

fn dump(document: &YamlValue, path: &str) -> Result<Vec<u8>> {
    let mut serialized = serde_yaml::to_string(document)
        .map_err(|e| patch_error(path, format!("failed to serialize YAML: {}", e)))?;
    if !serialized.ends_with('\n') {
        serialized.push('\n');
    }
    Ok(serialized.into_bytes())
}

fn patch_error(path: &str, message: impl Into<String>) -> Error {
    Error::Patch {
        path: path.to_string(),
        message: message.into(),
    }
}

fn sequence_index(segment: &PathSegment) -> Option<usize> {
    match segment {
        PathSegment::Index(idx) => Some(*idx),
        PathSegment::Key(key) => key.parse().ok(),
    }
}

/// Largest number of null items padded in before a new sequence item.
const MAX_SEQUENCE_PADDING: usize = 64;

/// Walk `segments` from `value`, creating missing intermediate structures.
///
/// A missing node becomes a sequence when the next segment is an index and a
/// mapping otherwise.
fn navigate_create<'a>(
    value: &'a mut YamlValue,
    segments: &[PathSegment],
    path: &str,
) -> Result<&'a mut YamlValue> {
    let mut current = value;
    for segment in segments {
        if current.is_null() {
            *current = match segment {
                PathSegment::Index(_) => YamlValue::Sequence(Vec::new()),
                PathSegment::Key(_) => YamlValue::Mapping(Default::default()),
            };
        }

        current = match current {
            YamlValue::Sequence(seq) => {
                let idx = sequence_index(segment).ok_or_else(|| {
                    patch_error(path, format!("expected an index into a sequence, got {:?}", segment))
                })?;
                if idx > seq.len().saturating_add(MAX_SEQUENCE_PADDING) {
                    return Err(patch_error(
                        path,
                        format!("index {} out of range for a sequence of {} items", idx, seq.len()),
                    ));
                }
                while seq.len() <= idx {
                    seq.push(YamlValue::Null);
                }
                &mut seq[idx]
            }
            YamlValue::Mapping(map) => {
                let key = match segment {
                    PathSegment::Key(key) => key.clone(),
                    PathSegment::Index(idx) => idx.to_string(),
                };
                map.entry(YamlValue::String(key)).or_insert(YamlValue::Null)
            }
            other => {
                return Err(patch_error(
                    path,
                    format!(
                        "cannot descend into {} at {:?}",
                        type_name(other),
                        segment
                    ),
                ))
            }
        };
    }
    Ok(current)
}

/// Walk `segments` from `value` without creating anything.
fn navigate_existing<'a>(
    value: &'a mut YamlValue,
    segments: &[PathSegment],
) -> Option<&'a mut YamlValue> {
    let mut current = value;
    for segment in segments {
        current = match current {
            YamlValue::Sequence(seq) => seq.get_mut(sequence_index(segment)?)?,
            YamlValue::Mapping(map) => match segment {
                PathSegment::Key(key) => map.get_mut(key.as_str())?,
                PathSegment::Index(idx) => map.get_mut(idx.to_string().as_str())?,
            },
            _ => return None,
        };
    }
    Some(current)
}

fn type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a bool",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_simple_dot_notation() {
        assert_eq!(
            parse_path("foo.bar.baz"),
            vec![
                PathSegment::Key("foo".to_string()),
                PathSegment::Key("bar".to_string()),
                PathSegment::Key("baz".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_path_mixed() {
        assert_eq!(
            parse_path("servers[0].host"),
            vec![
                PathSegment::Key("servers".to_string()),
                PathSegment::Index(0),
                PathSegment::Key("host".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_path_quoted_key() {
        let segments = parse_path(r#"annotations["example.com/rev"]"#);
        assert_eq!(segments[1], PathSegment::Key("example.com/rev".to_string()));
    }

    #[test]
    fn test_parse_path_escaped_dot() {
        let segments = parse_path(r"labels.app\.kubernetes\.io/name");
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("labels".to_string()),
                PathSegment::Key("app.kubernetes.io/name".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_path_empty() {
        assert!(parse_path("").is_empty());
        assert!(parse_path("  ").is_empty());
    }

    #[test]
    fn test_set_key_replaces_value() {
        let updated = set_key(b"test:\n  image: old-image\n", "test.image", "repo:production").unwrap();
        assert_eq!(String::from_utf8(updated).unwrap(), "test:\n  image: repo:production\n");
    }

    #[test]
    fn test_set_key_dotted_index() {
        let content = b"spec:\n  containers:\n  - name: app\n    image: app:1\n  - name: sidecar\n    image: proxy:1\n";
        let updated = set_key(content, "spec.containers.1.image", "proxy:2").unwrap();
        assert_eq!(get_key(&updated, "spec.containers.1.image").unwrap().as_deref(), Some("proxy:2"));
        assert_eq!(get_key(&updated, "spec.containers[0].image").unwrap().as_deref(), Some("app:1"));
    }

    #[test]
    fn test_set_key_creates_missing_structure() {
        let updated = set_key(b"", "a.b.c", "v").unwrap();
        assert_eq!(String::from_utf8(updated).unwrap(), "a:\n  b:\n    c: v\n");

        let updated = set_key(b"", "items[1].name", "second").unwrap();
        assert_eq!(get_key(&updated, "items.1.name").unwrap().as_deref(), Some("second"));
        assert_eq!(get_key(&updated, "items.0").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_set_key_index_far_past_end_fails() {
        match set_key(b"a: []\n", "a.[4000000000000]", "v") {
            Err(Error::Patch { path, message }) => {
                assert_eq!(path, "a.[4000000000000]");
                assert!(message.contains("index 4000000000000 out of range"));
            }
            other => panic!("expected Patch error, got {:?}", other),
        }

        let updated = set_key(b"a:\n- x\n", "a.1", "y").unwrap();
        assert_eq!(get_key(&updated, "a.1").unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn test_set_key_numeric_mapping_key() {
        let updated = set_key(b"ports:\n  '80': http\n", "ports.80", "web").unwrap();
        assert_eq!(get_key(&updated, "ports.80").unwrap().as_deref(), Some("web"));
    }

    #[test]
    fn test_set_key_into_scalar_fails() {
        let result = set_key(b"foo: 42\n", "foo.bar", "x");
        match result {
            Err(Error::Patch { path, message }) => {
                assert_eq!(path, "foo.bar");
                assert!(message.contains("cannot descend"));
            }
            other => panic!("expected Patch error, got {:?}", other),
        }
    }

    #[test]
    fn test_set_key_empty_path_fails() {
        assert!(set_key(b"a: 1\n", "", "x").is_err());
    }

    #[test]
    fn test_set_key_invalid_yaml_fails() {
        let result = set_key(b"a: [unclosed", "a", "x");
        assert!(matches!(result, Err(Error::Patch { .. })));
    }

    #[test]
    fn test_remove_key() {
        let updated = remove_key(b"test:\n  image: old-image\n  tag: v1\n", "test.image").unwrap();
        assert_eq!(String::from_utf8(updated.clone()).unwrap(), "test:\n  tag: v1\n");
        assert_eq!(get_key(&updated, "test.image").unwrap(), None);
    }

    #[test]
    fn test_remove_sequence_item() {
        let updated = remove_key(b"items:\n- a\n- b\n- c\n", "items.1").unwrap();
        assert_eq!(get_key(&updated, "items.1").unwrap().as_deref(), Some("c"));
        assert_eq!(get_key(&updated, "items.2").unwrap(), None);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let content = b"test:\n  image: old-image\n";
        let updated = remove_key(content, "test.missing.deep").unwrap();
        assert_eq!(updated, content.to_vec());
    }

    #[test]
    fn test_get_key_renders_scalars() {
        let content = b"replicas: 3\nenabled: true\nnested:\n  a: b\n";
        assert_eq!(get_key(content, "replicas").unwrap().as_deref(), Some("3"));
        assert_eq!(get_key(content, "enabled").unwrap().as_deref(), Some("true"));
        assert_eq!(get_key(content, "nested").unwrap().as_deref(), Some("a: b"));
        assert_eq!(get_key(content, "absent").unwrap(), None);
    }
}

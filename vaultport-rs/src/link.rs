//! Rendering cross-document references.

use crate::config::LinkStyle;
use crate::registry::LinkTarget;

/// Render a reference to `target` as it should appear in a property value.
///
/// `from` is the vault path of the referring document; markdown links to
/// documents are rewritten relative to it. Query files keep their
/// vault-absolute path and are embedded rather than referenced.
pub fn render_link(
    target: &LinkTarget,
    label: Option<&str>,
    from: Option<&str>,
    style: LinkStyle,
) -> String {
    let path = target.path();
    match style {
        LinkStyle::Wikilink => match target {
            LinkTarget::Document(_) => format!("[[{}]]", strip_md(path)),
            LinkTarget::QueryFile(_) => format!("![[{}]]", path),
        },
        LinkStyle::Markdown => {
            let label = label.unwrap_or_else(|| file_stem(path));
            match target {
                LinkTarget::Document(_) => {
                    let relative = match from {
                        Some(from) => relative_path(from, path),
                        None => path.to_string(),
                    };
                    format!("[{}]({})", label, encode_path(&relative))
                }
                LinkTarget::QueryFile(_) => format!("![{}]({})", label, encode_path(path)),
            }
        }
    }
}

/// Extract the link destination from a rendered reference.
///
/// Returns `None` for plain text.
/// e.g., "[[Notes/A]]" -> Some("Notes/A"), "![[Q.base]]" -> Some("Q.base")
pub fn link_destination(text: &str) -> Option<String> {
    let text = text.trim();
    let unembedded = text.strip_prefix('!').unwrap_or(text);

    if let Some(inner) = unembedded
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
    {
        let target = inner.split('|').next().unwrap_or(inner);
        return Some(target.to_string());
    }

    if unembedded.starts_with('[') && unembedded.ends_with(')') {
        let open = unembedded.find("](")?;
        let url = &unembedded[open + 2..unembedded.len() - 1];
        return urlencoding::decode(url).ok().map(|s| s.into_owned());
    }

    None
}

fn strip_md(path: &str) -> &str {
    path.strip_suffix(".md").unwrap_or(path)
}

fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment == ".." {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of `to` relative to the folder containing `from`.
pub fn relative_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut parts: Vec<&str> = from.split('/').filter(|p| !p.is_empty()).collect();
        parts.pop();
        parts
    };
    let to_parts: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    // Keep the file name even if it equals a folder name.
    let common = common.min(to_parts.len().saturating_sub(1));

    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend_from_slice(&to_parts[common..]);
    parts.join("/")
}

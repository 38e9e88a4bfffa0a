//! Content-Type to file extension guessing.

const EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    ("application/zip", ".zip"),
    ("application/x-zip-compressed", ".zip"),
    ("application/gzip", ".gz"),
    ("application/x-tar", ".tar"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/vnd.ms-powerpoint", ".ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/rtf", ".rtf"),
    ("application/json", ".json"),
    ("application/x-ipynb+json", ".ipynb"),
    ("application/octet-stream", ".bin"),
    ("text/plain", ".txt"),
    ("text/html", ".html"),
    ("text/csv", ".csv"),
    ("text/markdown", ".md"),
    ("text/x-python", ".py"),
    ("text/x-c", ".c"),
    ("text/x-java-source", ".java"),
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/svg+xml", ".svg"),
    ("audio/mpeg", ".mp3"),
    ("video/mp4", ".mp4"),
];

/// Extension (with the leading dot) for a Content-Type header value.
/// Parameters such as `charset` are ignored.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// `name` with `extension` appended, unless it already ends with it
/// (compared case-insensitively).
pub fn file_name_for(name: &str, extension: &str) -> String {
    let stem = match name.len().checked_sub(extension.len()) {
        Some(cut)
            if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(extension) =>
        {
            &name[..cut]
        }
        _ => name,
    };
    format!("{}{}", stem, extension)
}

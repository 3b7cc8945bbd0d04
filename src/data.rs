pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Suffixes accepted for uploads. Checked against the file name only.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Returns the lowercased extension when `name` ends in an accepted image
/// suffix.
pub fn image_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| *allowed == ext)
        .then_some(ext)
}

/// Splits raw `language` form values into an ordered, de-duplicated list.
pub fn normalize_languages<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut langs: Vec<String> = Vec::new();
    for value in values {
        for raw in value.as_ref().split(',') {
            let lang = raw.trim();
            if lang.is_empty() || langs.iter().any(|seen| seen == lang) {
                continue;
            }
            langs.push(lang.to_string());
        }
    }
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_image_suffixes_case_insensitively() {
        assert_eq!(image_extension("receipt.png").as_deref(), Some("png"));
        assert_eq!(image_extension("SCAN.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("photo.final.Jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension(".png").as_deref(), Some("png"));
    }

    #[test]
    fn rejects_other_suffixes() {
        assert_eq!(image_extension("notes.txt"), None);
        assert_eq!(image_extension("archive.png.zip"), None);
        assert_eq!(image_extension("png"), None);
        assert_eq!(image_extension(""), None);
    }

    #[test]
    fn languages_keep_request_order_without_duplicates() {
        let langs = normalize_languages(["fr", " de , es", "", "fr", "ja,"]);
        assert_eq!(langs, vec!["fr", "de", "es", "ja"]);
    }
}

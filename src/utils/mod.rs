/// Replace characters that are unsafe in a course directory name with '-'.
pub fn sanitize_course_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '-',
            _ => c,
        })
        .collect()
}

/// Make a resource title safe to use as a file stem.
///
/// Dots and whitespace are replaced too, so the extension appended later is
/// the only dot in the final name.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '\\' | '/' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' | '.' => '_',
            c if c.is_whitespace() => '_',
            _ => c,
        })
        .collect()
}

const FALLBACK_EXTENSION: &str = "file";

/// Last dot-delimited segment of the original filename; a name without any
/// dot is its own extension.
pub fn file_extension(original_filename: &str) -> &str {
    match original_filename.trim().rsplit('.').next() {
        Some(ext) if !ext.is_empty() => ext,
        _ => FALLBACK_EXTENSION,
    }
}

/// `{save_path}/{course}/Resources/{title}.{ext}`
pub fn resource_destination(
    save_path: &str,
    course_name: &str,
    title: &str,
    original_filename: &str,
) -> String {
    format!(
        "{}/{}/Resources/{}.{}",
        save_path,
        course_name,
        sanitize_title(title),
        file_extension(original_filename)
    )
}

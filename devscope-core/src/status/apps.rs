//! Installed package listing
//!
//! Input is `pm list packages` output, one `package:<name>` per line.

const PACKAGE_PREFIX: &str = "package:";

/// Package names, sorted
///
/// # Example
///
/// ```rust
/// use devscope_core::status::apps::parse_installed_apps;
///
/// let apps = parse_installed_apps("package:com.b\n\npackage:com.a");
/// assert_eq!(apps, vec!["com.a", "com.b"]);
/// ```
pub fn parse_installed_apps(text: &str) -> Vec<String> {
    parse_lines(text.lines())
}

/// Package names whose raw line contains `term`, case-insensitively
///
/// The match runs against the raw line, so a term such as `package:` matches
/// every entry. The term is used as typed; a blank term is the same as
/// [`parse_installed_apps`].
pub fn filter_installed_apps(text: &str, term: &str) -> Vec<String> {
    if term.trim().is_empty() {
        return parse_installed_apps(text);
    }
    let needle = term.to_lowercase();

    parse_lines(
        text.lines()
            .filter(|line| line.to_lowercase().contains(&needle)),
    )
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut apps: Vec<String> = lines
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(strip_prefix)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    apps.sort();
    apps
}

fn strip_prefix(line: &str) -> &str {
    match line.get(..PACKAGE_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PACKAGE_PREFIX) => {
            line[PACKAGE_PREFIX.len()..].trim()
        }
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_sort() {
        let text = "package:org.mozilla.firefox\r\npackage:com.android.chrome\n\n  \npackage:com.whatsapp\n";
        assert_eq!(
            parse_installed_apps(text),
            vec!["com.android.chrome", "com.whatsapp", "org.mozilla.firefox"]
        );
    }

    #[test]
    fn test_prefix_case_insensitive() {
        assert_eq!(
            parse_installed_apps("PACKAGE:com.a\nPackage:com.b\ncom.c"),
            vec!["com.a", "com.b", "com.c"]
        );
    }

    #[test]
    fn test_filter_case_insensitive() {
        let text = "package:com.android.Chrome\npackage:com.whatsapp\npackage:org.chromium.webview";
        assert_eq!(
            filter_installed_apps(text, "CHROM"),
            vec!["com.android.Chrome", "org.chromium.webview"]
        );
        assert!(filter_installed_apps(text, "telegram").is_empty());
    }

    #[test]
    fn test_filter_term_not_trimmed() {
        let text = "package:com.whatsapp\npackage:com.whatsapp.w4b";
        assert_eq!(filter_installed_apps(text, "whatsapp."), vec!["com.whatsapp.w4b"]);
        // Raw lines have no trailing space, so a padded term finds nothing
        assert!(filter_installed_apps(text, " whatsapp ").is_empty());
    }

    #[test]
    fn test_empty_term_returns_all() {
        let text = "package:b\npackage:a";
        assert_eq!(filter_installed_apps(text, "  "), parse_installed_apps(text));
    }

    #[test]
    fn test_multibyte_line_does_not_panic() {
        assert_eq!(parse_installed_apps("пакет:приложение"), vec!["пакет:приложение"]);
    }
}

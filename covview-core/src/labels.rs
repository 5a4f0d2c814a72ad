//! Label and link text shared by the chart builders

/// Maximum characters of a child name shown on the heat-map axis
pub const MAX_AXIS_LABEL_CHARS: usize = 70;

/// Format a 0-100 percentage with two decimals
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Turn an element name into a relative link segment
///
/// ASCII letters and digits are kept, everything else becomes `_`.
pub fn url_segment(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Undo the XML escaping applied to element names in the view model
///
/// Names such as `&lt;init&gt;` or `&amp;lt;init&amp;gt;` display as `<init>`.
pub fn unescape_xml(name: &str) -> String {
    name.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Cut long axis labels, appending `...`
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() > max_chars {
        let head: String = label.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(75.0), "75.00%");
        assert_eq!(format_percentage(66.666), "66.67%");
    }

    #[test]
    fn test_url_segment() {
        assert_eq!(url_segment("io.jenkins/Foo$Bar"), "io_jenkins_Foo_Bar");
        assert_eq!(url_segment("<init>"), "_init_");
    }

    #[test]
    fn test_unescape_xml() {
        assert_eq!(unescape_xml("&lt;init&gt;"), "<init>");
        assert_eq!(unescape_xml("&amp;lt;init&amp;gt;"), "<init>");
    }

    #[test]
    fn test_truncate_label() {
        let long = "x".repeat(80);
        let cut = truncate_label(&long, MAX_AXIS_LABEL_CHARS);
        assert_eq!(cut.len(), 73);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_label("short", MAX_AXIS_LABEL_CHARS), "short");
    }
}

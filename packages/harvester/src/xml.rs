//! XML utility functions for navigating law search API responses.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use ftclaw_harvester::xml::get_tag_name;
///
/// let xml = r#"<LawSearch><law>text</law></LawSearch>"#;
/// let doc = Document::parse(xml).unwrap();
/// let law = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(law), "law");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all descendant elements with the given tag name, in document order.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use ftclaw_harvester::xml::find_descendants;
///
/// let xml = r#"<root><law/><page><law/></page><other/></root>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(find_descendants(doc.root_element(), "law").count(), 2);
/// ```
pub fn find_descendants<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants()
        .filter(move |d| d.is_element() && get_tag_name(*d) == tag)
}

/// Get the text content of a node, trimmed.
///
/// Concatenates all descendant text so CDATA sections and mixed content
/// are both covered.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|d| d.is_text())
        .filter_map(|d| d.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text of the first child among `tags` that is present and non-empty.
///
/// `tags` are tried in priority order.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use ftclaw_harvester::xml::first_child_text;
///
/// let xml = r#"<law><시행일자></시행일자><시행일>20250101</시행일></law>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(
///     first_child_text(doc.root_element(), &["시행일자", "시행일"]).as_deref(),
///     Some("20250101")
/// );
/// ```
pub fn first_child_text(node: Node<'_, '_>, tags: &[&str]) -> Option<String> {
    tags.iter()
        .filter_map(|tag| find_child(node, tag))
        .map(get_text)
        .find(|t| !t.is_empty())
}

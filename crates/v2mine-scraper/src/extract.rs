//! Pulling share links and server detail links out of listing pages.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;
use v2mine_core::RawEntry;

/// Longest display name kept after `#`.
const MAX_NAME_CHARS: usize = 200;

/// Share links in attribute values or text. The optional fragment (the
/// display name) may contain spaces but stops at quotes and markup.
static URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:vless|vmess|trojan|ss)://[^\s'"<>()\[\]{}#]+(?:#[^\r\n'"<>]{0,200})?"#,
    )
    .expect("valid share link pattern")
});

/// Another share link starting inside a display name.
static NEXT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:vless|vmess|trojan|ss)://").expect("valid next link pattern")
});

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Every share link in `html`, in document order, cleaned. Exact
/// duplicates are collapsed to their first occurrence.
///
/// A link in an `<a href>` takes its display name from the anchor text when
/// the text carries a longer `#name` than the href.
#[must_use]
pub fn extract_uris(html: &str) -> Vec<RawEntry> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    let mut record = |link: &str| {
        let Ok(entry) = RawEntry::new(link) else {
            return;
        };
        if seen.insert(entry.as_str().to_string()) {
            entries.push(entry);
        }
    };

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) => {
                let anchor_text = ElementRef::wrap(node)
                    .filter(|_| element.name() == "a")
                    .map(|anchor| anchor.text().collect::<Vec<_>>().join(" "));

                for (name, value) in element.attrs() {
                    for link in share_links(value) {
                        match (&anchor_text, name) {
                            (Some(text), "href") => record(&with_text_name(link, text)),
                            _ => record(link),
                        }
                    }
                }
            }
            Node::Text(text) => {
                for link in share_links(&**text) {
                    record(link);
                }
            }
            _ => {}
        }
    }

    entries
}

/// Raw share-link matches in `text`. A display name ends where whitespace
/// is followed by the next link.
fn share_links(text: &str) -> Vec<&str> {
    let mut links = Vec::new();
    let mut pos = 0;

    while let Some(found) = URI_PATTERN.find_at(text, pos) {
        let end = NEXT_LINK
            .find(found.as_str())
            .map_or(found.end(), |next| found.start() + next.start());
        links.push(&text[found.start()..end]);
        pos = end;
    }

    links
}

/// `link` renamed after the `#name` in `anchor_text`, if that name is longer
/// than the one the link already has.
fn with_text_name(link: &str, anchor_text: &str) -> String {
    let Some((_, after_hash)) = anchor_text.split_once('#') else {
        return link.to_string();
    };

    let name: String = after_hash
        .chars()
        .take(MAX_NAME_CHARS)
        .take_while(|c| *c != '\n' && *c != '\r')
        .collect();
    let name = NEXT_LINK.find(&name).map_or(name.as_str(), |next| &name[..next.start()]);
    let name = name
        .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '"', '\''])
        .trim();

    let (base, current) = link.split_once('#').unwrap_or((link, ""));
    if name.chars().count() > current.chars().count() {
        format!("{base}#{name}")
    } else {
        link.to_string()
    }
}

/// Links to per-server detail pages: `<a href>` targets on the same host as
/// `page_url` whose path matches `pattern`, resolved and deduplicated in
/// document order.
#[must_use]
pub fn server_links(html: &str, page_url: &Url, pattern: &Regex) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .filter(|url| url.host_str() == page_url.host_str())
        .filter(|url| pattern.is_match(url.path()))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(entries: &[RawEntry]) -> Vec<&str> {
        entries.iter().map(RawEntry::as_str).collect()
    }

    #[test]
    fn test_extract_from_attributes_and_text_in_order() {
        let html = r#"
            <html><body>
              <button data-config="vless://id1@a.example:443?type=ws#A">copy</button>
              <pre>trojan://pw@b.example:443</pre>
              <p>Try (vmess://eyJhZGQiOiJjIn0=).</p>
              <textarea>ss://YWVzLTI1Ni1nY206eA@d.example:8388#D</textarea>
            </body></html>
        "#;

        let entries = extract_uris(html);
        assert_eq!(
            texts(&entries),
            vec![
                "vless://id1@a.example:443?type=ws#A",
                "trojan://pw@b.example:443",
                "vmess://eyJhZGQiOiJjIn0=",
                "ss://YWVzLTI1Ni1nY206eA@d.example:8388#D",
            ]
        );
    }

    #[test]
    fn test_trailing_punctuation_and_case() {
        let html = "<p>Use VLESS://id@h.example:443, or trojan://pw@h.example:8443!</p>";
        let entries = extract_uris(html);
        assert_eq!(
            texts(&entries),
            vec!["VLESS://id@h.example:443", "trojan://pw@h.example:8443"]
        );
    }

    #[test]
    fn test_links_sharing_a_line_are_split() {
        let html = "<p>vless://a@one.example:443#Germany trojan://pw@two.example:443#France</p>";
        let entries = extract_uris(html);
        assert_eq!(
            texts(&entries),
            vec![
                "vless://a@one.example:443#Germany",
                "trojan://pw@two.example:443#France",
            ]
        );
    }

    #[test]
    fn test_name_with_spaces_is_kept() {
        let html = "<li>ss://YWVzLTI1Ni1nY206eA@d.example:8388#DE Frankfurt 01 vmess://eyJhZGQiOiJjIn0=</li>";
        let entries = extract_uris(html);
        assert_eq!(
            texts(&entries),
            vec![
                "ss://YWVzLTI1Ni1nY206eA@d.example:8388#DE Frankfurt 01",
                "vmess://eyJhZGQiOiJjIn0=",
            ]
        );
    }

    #[test]
    fn test_anchor_text_names_href_link() {
        let html = r#"
            <a href="vless://id@h.example:443">vless://id@h.example:443#Tokyo 02</a>
            <a href="trojan://pw@t.example:443#Long name">#short</a>
            <a href="vless://id@plain.example:443">copy</a>
        "#;
        let entries = extract_uris(html);
        assert_eq!(
            texts(&entries),
            vec![
                "vless://id@h.example:443#Tokyo 02",
                "trojan://pw@t.example:443#Long name",
                "vless://id@plain.example:443",
            ]
        );
    }

    #[test]
    fn test_with_text_name() {
        assert_eq!(
            with_text_name("vless://id@h:1#A", "see #Amsterdam."),
            "vless://id@h:1#Amsterdam"
        );
        assert_eq!(with_text_name("vless://id@h:1#Amsterdam", "#A"), "vless://id@h:1#Amsterdam");
        assert_eq!(with_text_name("vless://id@h:1", "no name here"), "vless://id@h:1");
    }

    #[test]
    fn test_duplicates_and_unknown_schemes() {
        let html = r#"
            <a href="vless://id@h.example:443">vless://id@h.example:443</a>
            <p>ssr://abc hysteria2://x@h:1 http://not-a-proxy.example</p>
        "#;
        let entries = extract_uris(html);
        assert_eq!(texts(&entries), vec!["vless://id@h.example:443"]);
    }

    #[test]
    fn test_entities_are_decoded_in_attributes() {
        let html = r#"<input value="vless://id@h.example:443?type=ws&amp;security=tls">"#;
        let entries = extract_uris(html);
        assert_eq!(
            texts(&entries),
            vec!["vless://id@h.example:443?type=ws&security=tls"]
        );
    }

    #[test]
    fn test_server_links() {
        let html = r#"
            <a href="/servers/12/">one</a>
            <a href="/servers/12/#top">one again</a>
            <a href="https://www.v2nodes.com/servers/34">two</a>
            <a href="https://elsewhere.example/servers/56/">foreign</a>
            <a href="/servers/abc/">not numeric</a>
            <a href="/about">about</a>
        "#;
        let page = Url::parse("https://www.v2nodes.com/?page=1").expect("url");
        let pattern = Regex::new(r"^/servers/\d+/?$").expect("regex");

        let links: Vec<String> = server_links(html, &page, &pattern)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            links,
            vec![
                "https://www.v2nodes.com/servers/12/".to_string(),
                "https://www.v2nodes.com/servers/34".to_string(),
            ]
        );
    }
}

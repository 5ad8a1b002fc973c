//! Feed transports: fetch a configured feed URL and hand back parsed entries.

pub mod rss;

pub use rss::{parse_feed, RssTransport};

use scraper::Html;

/// Text content of an HTML fragment with whitespace collapsed. Feed
/// descriptions often wrap the lead paragraph in thumbnail markup.
pub fn plain_text(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return collapse_whitespace(fragment);
    }
    let document = Html::parse_fragment(fragment);
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_markup() {
        let html = r#"<a href="https://vnexpress.net/a"><img src="x.jpg"></a></br>Hà Nội ghi nhận   15 ca mắc sởi &amp; rubella"#;
        assert_eq!(plain_text(html), "Hà Nội ghi nhận 15 ca mắc sởi & rubella");
    }

    #[test]
    fn test_plain_text_passthrough() {
        assert_eq!(plain_text("  Tin  y tế\n mới "), "Tin y tế mới");
        assert_eq!(plain_text(""), "");
    }
}

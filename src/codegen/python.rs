//! Python + BeautifulSoup scraper generation.
//!
//! The generated script fetches the page with `requests`, re-runs every
//! saved selector through `soup.select` and collects the same fields the
//! user kept when picking: text, checked attributes and checked children.

use crate::selection::SelectionRecord;
use chrono::{DateTime, SecondsFormat, Utc};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const IMPORTS: &str = "import requests
from bs4 import BeautifulSoup
import json
from typing import Dict, List, Optional

";

const SCRAPE_HEADER: &str = r#"def scrape_website(url: str) -> Dict:
    """Scrape website using predefined selectors"""
    html_content = get_html_content(url)
    if not html_content:
        return {"error": "Failed to fetch HTML content"}

    soup = BeautifulSoup(html_content, 'html.parser')
    scraped_data = []

"#;

/// Generate a standalone scraping script for `selections` taken on `page_url`
pub fn generate(selections: &[SelectionRecord], page_url: &str, timestamp: DateTime<Utc>) -> String {
    let mut script = String::new();
    script.push_str(IMPORTS);
    script.push_str(&fetcher());
    script.push_str(SCRAPE_HEADER);

    for record in selections {
        script.push_str(&extraction(record));
    }

    script.push_str(&footer(timestamp));
    script.push_str(&entry_point(page_url));
    script
}

fn fetcher() -> String {
    format!(
        r#"def get_html_content(url: str) -> Optional[str]:
    """Fetch HTML content from the given URL"""
    try:
        headers = {{
            'User-Agent': {}
        }}
        response = requests.get(url, headers=headers)
        response.raise_for_status()
        return response.text
    except requests.RequestException as e:
        print(f"Error fetching URL: {{e}}")
        return None

"#,
        single_quoted(USER_AGENT)
    )
}

fn extraction(record: &SelectionRecord) -> String {
    let mut code = String::new();
    let elements = format!("{}_elements", identifier(&record.label));

    code.push_str(&format!("    # Extract {} elements\n", comment_text(&record.label)));
    code.push_str(&format!("    {} = soup.select({})\n", elements, single_quoted(&record.selector)));
    code.push_str(&format!("    for element in {}:\n", elements));
    code.push_str(&format!(
        "        item = {{\"label\": {}, \"selector\": {}}}\n",
        double_quoted(&record.label),
        double_quoted(&record.selector)
    ));

    if record.value.is_some() {
        code.push_str("        # Extract text content\n");
        code.push_str("        text_content = element.get_text(strip=True)\n");
        code.push_str("        if text_content:\n");
        code.push_str("            item[\"value\"] = text_content\n");
    }

    if !record.attributes.is_empty() {
        code.push_str("        # Extract attributes\n");
        code.push_str("        item[\"attributes\"] = {}\n");
        for name in record.attributes.keys() {
            let variable = format!("{}_attr", identifier(name));
            code.push_str(&format!("        {} = element.get({})\n", variable, single_quoted(name)));
            code.push_str(&format!("        if {}:\n", variable));
            code.push_str(&format!("            item[\"attributes\"][{}] = {}\n", double_quoted(name), variable));
        }
    }

    if !record.children.is_empty() {
        code.push_str("        # Extract children\n");
        code.push_str("        item[\"children\"] = []\n");
        for child in &record.children {
            let variable = format!("child_{}", identifier(&child.tag_name));
            code.push_str(&format!("        {} = element.select_one({})\n", variable, single_quoted(&child.tag_name)));
            code.push_str(&format!("        if {}:\n", variable));
            code.push_str("            item[\"children\"].append({\n");
            code.push_str(&format!("                \"tagName\": {},\n", double_quoted(&child.tag_name)));
            code.push_str(&format!("                \"text\": {}.get_text(strip=True)\n", variable));
            code.push_str("            })\n");
        }
    }

    code.push_str("        scraped_data.append(item)\n\n");
    code
}

fn footer(timestamp: DateTime<Utc>) -> String {
    format!(
        r#"    return {{
        "url": url,
        "timestamp": {},
        "selections": scraped_data
    }}

"#,
        double_quoted(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    )
}

fn entry_point(page_url: &str) -> String {
    format!(
        r#"if __name__ == "__main__":
    # Target URL
    url = {}

    print(f"Scraping: {{url}}")
    result = scrape_website(url)

    # Save results to JSON file
    if "error" not in result:
        output_file = "scraped_data.json"
        with open(output_file, 'w', encoding='utf-8') as f:
            json.dump(result, f, indent=2, ensure_ascii=False)
        print(f"Scraping completed! Data saved to {{output_file}}")
        print(f"Found {{len(result['selections'])}} items")
    else:
        print(f"Scraping failed: {{result['error']}}")
"#,
        double_quoted(page_url)
    )
}

/// Python identifier: every character outside `[A-Za-z0-9_]` becomes `_`,
/// and a leading digit gets a `_` prefix
pub fn identifier(name: &str) -> String {
    let mut ident = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        ident.push('_');
    }
    ident.extend(name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }));
    ident
}

fn single_quoted(value: &str) -> String {
    quoted(value, '\'')
}

fn double_quoted(value: &str) -> String {
    quoted(value, '"')
}

fn quoted(value: &str, quote: char) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push(quote);
    for c in value.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c == quote => {
                literal.push('\\');
                literal.push(c);
            }
            c => literal.push(c),
        }
    }
    literal.push(quote);
    literal
}

fn comment_text(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ChildSnapshot;
    use chrono::TimeZone;
    use indexmap::IndexMap;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn record(label: &str, selector: &str) -> SelectionRecord {
        SelectionRecord {
            identifier_path: format!("{}:nth-child(1)", selector),
            label: label.to_string(),
            selector: selector.to_string(),
            tag_name: "a".to_string(),
            text: "Text".to_string(),
            html: "<a>Text</a>".to_string(),
            value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
            timestamp: at(),
        }
    }

    #[test]
    fn test_script_skeleton() {
        let script = generate(&[record("title", "h1")], "https://example.com/list", at());

        assert!(script.starts_with("import requests\nfrom bs4 import BeautifulSoup\n"));
        assert!(script.contains("def get_html_content(url: str) -> Optional[str]:"));
        assert!(script.contains("'User-Agent': 'Mozilla/5.0"));
        assert!(script.contains("def scrape_website(url: str) -> Dict:"));
        assert!(script.contains("\"timestamp\": \"2024-05-06T07:08:09.000Z\""));
        assert!(script.contains("if __name__ == \"__main__\":"));
        assert!(script.contains("    url = \"https://example.com/list\"\n"));
        assert!(script.contains("output_file = \"scraped_data.json\""));
    }

    #[test]
    fn test_extraction_block_minimal() {
        let script = generate(&[record("title", "h1")], "https://example.com", at());

        assert!(script.contains("    # Extract title elements\n"));
        assert!(script.contains("    title_elements = soup.select('h1')\n"));
        assert!(script.contains("    for element in title_elements:\n"));
        assert!(script.contains("        item = {\"label\": \"title\", \"selector\": \"h1\"}\n"));
        assert!(script.contains("        scraped_data.append(item)\n"));
        assert!(!script.contains("text_content"));
        assert!(!script.contains("item[\"attributes\"]"));
        assert!(!script.contains("item[\"children\"]"));
    }

    #[test]
    fn test_extraction_block_with_options() {
        let mut record = record("product link", "div#main > a.link");
        record.value = Some("Text".to_string());
        record.attributes.insert("href".to_string(), "/p/1".to_string());
        record.attributes.insert("data-id".to_string(), "1".to_string());
        record.children.push(ChildSnapshot {
            index: 0,
            tag_name: "span".to_string(),
            text: "Price".to_string(),
        });

        let script = generate(&[record], "https://example.com", at());

        assert!(script.contains("    product_link_elements = soup.select('div#main > a.link')\n"));
        assert!(script.contains("            item[\"value\"] = text_content\n"));
        assert!(script.contains("        href_attr = element.get('href')\n"));
        assert!(script.contains("        data_id_attr = element.get('data-id')\n"));
        assert!(script.contains("            item[\"attributes\"][\"data-id\"] = data_id_attr\n"));
        assert!(script.contains("        child_span = element.select_one('span')\n"));
        assert!(script.contains("                \"tagName\": \"span\",\n"));
        assert!(script.contains("                \"text\": child_span.get_text(strip=True)\n"));
    }

    #[test]
    fn test_blocks_follow_selection_order() {
        let script = generate(
            &[record("first", "h1"), record("second", "h2")],
            "https://example.com",
            at(),
        );
        let first = script.find("first_elements").unwrap();
        let second = script.find("second_elements").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_literals_are_escaped() {
        let script = generate(
            &[record("it's \"quoted\"", "a[title='x']")],
            "https://example.com/?q=\"x\"",
            at(),
        );

        assert!(script.contains("it_s__quoted__elements = soup.select('a[title=\\'x\\']')"));
        assert!(script.contains("\"label\": \"it's \\\"quoted\\\"\""));
        assert!(script.contains("url = \"https://example.com/?q=\\\"x\\\"\""));
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("price-tag 2"), "price_tag_2");
        assert_eq!(identifier("ok_name"), "ok_name");
        assert_eq!(identifier("héllo"), "h_llo");
        assert_eq!(identifier("2nd price"), "_2nd_price");
    }

    #[test]
    fn test_names_starting_with_digit() {
        let mut record = record("2nd price", "h1");
        record.attributes.insert("1x".to_string(), "a.png".to_string());

        let script = generate(&[record], "https://example.com", at());

        assert!(script.contains("    _2nd_price_elements = soup.select('h1')\n"));
        assert!(script.contains("    for element in _2nd_price_elements:\n"));
        assert!(script.contains("        _1x_attr = element.get('1x')\n"));
        assert!(script.contains("\"label\": \"2nd price\""));
    }
}

//! Offline scans over captured snapshot fixtures.
//!
//! Run with: cargo test --test scan

use std::path::PathBuf;

use regex::Regex;

use eoka_scan::{scan, DomSnapshot, Error, Overlay, ScanReport};

fn fixture(name: &str) -> DomSnapshot {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect();
    let json = std::fs::read_to_string(&path).expect("Failed to read fixture");
    DomSnapshot::from_json(&json).expect("Failed to parse fixture")
}

fn scan_fixture(name: &str) -> (DomSnapshot, ScanReport) {
    let doc = fixture(name);
    let report = scan(&doc, &doc, false, &mut Overlay::new()).expect("Failed to scan");
    (doc, report)
}

#[test]
fn test_storefront_elements() {
    let (_, report) = scan_fixture("storefront.json");

    let summary: Vec<(&str, &str)> = report
        .interactive_elements
        .iter()
        .map(|e| (e.tag_name.as_str(), e.xpath.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a", "/body/header[1]/nav[1]/a[1]"),
            ("a", "/body/header[1]/nav[1]/a[2]"),
            ("input", "/body/header[1]/input[1]"),
            ("button", "/body/main[1]/div[1]/button[1]"),
            ("button", "/body/main[1]/div[2]/button[1]"),
            ("span", "/body/main[1]/span[1]"),
            ("div", "/body/main[1]/div[6]"),
        ]
    );

    assert_eq!(report.current_url, "https://shop.example.com/");
    assert_eq!(report.available_tabs.len(), 1);
    assert_eq!(report.available_tabs[0].title, "Example Shop");
}

#[test]
fn test_storefront_selectors() {
    let (_, report) = scan_fixture("storefront.json");
    let selectors: Vec<&str> = report
        .interactive_elements
        .iter()
        .map(|e| e.selector.as_str())
        .collect();

    assert_eq!(selectors[0], "a:nth-child(1)");
    assert_eq!(selectors[2], "#search");
    // three cards share the class list, so the parent card disambiguates
    assert_eq!(selectors[3], "div:nth-child(1) > button:nth-child(2)");
    assert_eq!(selectors[4], "div:nth-child(2) > button:nth-child(2)");
    assert_eq!(selectors[5], "span[role=\"tab\"]:nth-child(5)");
    assert_eq!(selectors[6], ".chip");
}

#[test]
fn test_storefront_descriptor_details() {
    let (_, report) = scan_fixture("storefront.json");

    let deals = report.get(1).expect("Deals link");
    assert_eq!(deals.text, "Deals");
    assert_eq!(deals.attributes.class, "nav-link");

    let search = report.get(2).expect("search box");
    assert_eq!(search.attributes.id, "search");
    assert_eq!(search.attributes.kind, "search");
    assert_eq!(search.coordinates.x, 400.0);
    assert_eq!(search.coordinates.y, 15.0);

    // bare <button> reports its default type
    let cart = report.get(3).expect("add to cart");
    assert_eq!(cart.attributes.kind, "submit");
    assert_eq!(cart.text, "Add to cart");

    assert_eq!(report.find_by_text("reviews"), Some(5));
    assert_eq!(report.find_by_text("Close"), None);
}

#[test]
fn test_locators_round_trip() {
    let xpath_shape = Regex::new(r"^/body(/[a-z0-9-]+\[\d+\])*$").unwrap();

    for name in ["storefront.json", "scrolled.json"] {
        let (doc, report) = scan_fixture(name);
        for el in &report.interactive_elements {
            assert!(xpath_shape.is_match(&el.xpath), "{}: {}", name, el.xpath);

            let node = doc
                .resolve_xpath(&el.xpath)
                .unwrap_or_else(|| panic!("{}: {} does not resolve", name, el.xpath));
            let matched = doc.select(&el.selector).expect("generated selector parses");
            assert!(
                matched.contains(&node),
                "{}: {} misses {}",
                name,
                el.selector,
                el.xpath
            );
            if el.selector.starts_with('#') {
                assert_eq!(matched, vec![node]);
            }
        }
    }
}

#[test]
fn test_indices_are_contiguous() {
    for name in ["storefront.json", "scrolled.json"] {
        let (_, report) = scan_fixture(name);
        let indices: Vec<usize> = report.interactive_elements.iter().map(|e| e.index).collect();
        assert_eq!(indices, (0..report.len()).collect::<Vec<_>>(), "{}", name);
        assert!(report
            .interactive_elements
            .iter()
            .all(|e| e.is_visible && e.is_in_viewport));
    }
}

#[test]
fn test_scrolled_page() {
    let doc = fixture("scrolled.json");
    let mut overlay = Overlay::new();
    let report = scan(&doc, &doc, true, &mut overlay).expect("Failed to scan");

    // the anchor scrolled above the viewport and the clipped button are left out
    let tags: Vec<&str> = report
        .interactive_elements
        .iter()
        .map(|e| e.tag_name.as_str())
        .collect();
    assert_eq!(tags, vec!["a", "textarea"]);

    let install = &report.interactive_elements[0];
    assert_eq!(install.xpath, "/body/article[1]/p[1]/a[1]");
    assert_eq!(install.selector, "p:nth-child(3) > a:nth-child(1)");
    assert_eq!(install.coordinates.y, 42.0);

    let feedback = &report.interactive_elements[1];
    assert_eq!(
        feedback.selector,
        "textarea[name=\"feedback\"][aria-label=\"Feedback\"]:nth-child(4)"
    );
    assert_eq!(feedback.attributes.aria_label, "Feedback");
    assert_eq!(feedback.text, "");

    // overlays are placed in document coordinates
    let marks: Vec<_> = overlay.marks().collect();
    assert_eq!(marks.len(), 2);
    assert_eq!(marks[0].index, 0);
    assert_eq!(marks[0].left, 120.0);
    assert_eq!(marks[0].top, 542.0);
    assert_eq!(marks[0].label_top(), 522.0);
    assert_eq!(marks[1].top, 620.0);
}

#[test]
fn test_rescan_is_stable() {
    let doc = fixture("storefront.json");
    let mut overlay = Overlay::new();

    let first = scan(&doc, &doc, true, &mut overlay).expect("Failed to scan");
    let second = scan(&doc, &doc, true, &mut overlay).expect("Failed to scan");
    assert_eq!(first, second);
    assert_eq!(overlay.len(), second.len());

    // the rendered script carries exactly one box per element
    let js = overlay.render_js();
    assert_eq!(js.matches("\"i\":").count(), second.len());
}

#[test]
fn test_report_serialises_with_wire_names() {
    let (_, report) = scan_fixture("storefront.json");
    let value = serde_json::to_value(&report).unwrap();

    let first = &value["interactive_elements"][0];
    assert_eq!(first["tag_name"], "a");
    assert_eq!(first["highlight_index"], 0);
    assert_eq!(first["css_selector"], "a:nth-child(1)");
    assert_eq!(first["attributes"]["aria-label"], "");
    assert_eq!(value["available_tabs"][0]["url"], "https://shop.example.com/");

    let list = report.element_list();
    assert_eq!(list.lines().count(), 7);
    assert!(list.starts_with("[0] <a> \"Home\" a:nth-child(1)\n"), "{}", list);
    assert!(list.contains("[2] <input type=\"search\"> #search"), "{}", list);
    assert!(list.contains("role=\"tab\""), "{}", list);
}

#[test]
fn test_snapshot_without_body() {
    let err = DomSnapshot::from_json(r#"{"url": "about:blank", "title": "", "nodes": []}"#)
        .unwrap_err();
    assert!(matches!(err, Error::DomUnavailable(_)), "{:?}", err);

    let err = DomSnapshot::from_json("{\"nodes\": 3}").unwrap_err();
    assert!(matches!(err, Error::Snapshot(_)), "{:?}", err);
}

use pagemark::dom::{Document, ElementSpec, NodeId};
use pagemark::inspect::{elements_in_area, CHROME_MARKER, MAX_AREA_ELEMENTS};
use pagemark::models::{normalize_area, Rect};

#[test]
fn test_normalize_area_handles_all_drag_directions() {
    // down-right, down-left, up-right, up-left
    let cases = [
        (10.0, 10.0, 110.0, 60.0),
        (110.0, 10.0, 10.0, 60.0),
        (10.0, 60.0, 110.0, 10.0),
        (110.0, 60.0, 10.0, 10.0),
    ];
    for (x1, y1, x2, y2) in cases {
        let area = normalize_area(x1, y1, x2, y2);
        assert_eq!(area.x, 10.0);
        assert_eq!(area.y, 10.0);
        assert_eq!(area.width, 100.0);
        assert_eq!(area.height, 50.0);
        assert!(area.width >= 0.0 && area.height >= 0.0);
    }
}

fn three_sibling_page() -> (Document, Vec<NodeId>) {
    let mut doc = Document::new();
    let body = doc.body();
    let section = doc.append(
        body,
        ElementSpec::new("section").rect(Rect::new(0.0, 0.0, 500.0, 300.0)),
    );
    let divs = vec![
        doc.append(section, ElementSpec::new("div").rect(Rect::new(10.0, 10.0, 100.0, 60.0))),
        doc.append(section, ElementSpec::new("div").rect(Rect::new(120.0, 10.0, 100.0, 60.0))),
        doc.append(section, ElementSpec::new("div").rect(Rect::new(230.0, 10.0, 100.0, 60.0))),
    ];
    (doc, divs)
}

#[test]
fn test_drag_over_three_siblings_returns_exactly_those() {
    let (doc, divs) = three_sibling_page();

    // 120×80 drag touching all three columns; the parent section
    // intersects too but is dropped as an ancestor of the hits.
    let area = Rect::new(100.0, 15.0, 150.0, 80.0);
    let found = elements_in_area(&doc, &area, &[]);
    assert_eq!(found, divs);

    // A narrower drag only reports what it actually touches.
    let narrow = Rect::new(20.0, 15.0, 80.0, 40.0);
    assert_eq!(elements_in_area(&doc, &narrow, &[]), vec![divs[0]]);
}

#[test]
fn test_empty_region_resolves_to_no_elements() {
    let mut doc = Document::new();
    let body = doc.body();
    // An empty block collapses to zero height, so it is skipped by the
    // zero-area check and the drag selects nothing.
    doc.append(
        body,
        ElementSpec::new("section").rect(Rect::new(0.0, 0.0, 500.0, 0.0)),
    );

    let area = Rect::new(50.0, 50.0, 120.0, 80.0);
    assert!(elements_in_area(&doc, &area, &[]).is_empty());
}

#[test]
fn test_ancestors_of_results_are_dropped() {
    let mut doc = Document::new();
    let body = doc.body();
    let outer = doc.append(
        body,
        ElementSpec::new("div").rect(Rect::new(0.0, 0.0, 200.0, 200.0)),
    );
    let inner = doc.append(
        outer,
        ElementSpec::new("span").rect(Rect::new(10.0, 10.0, 50.0, 20.0)),
    );

    let area = Rect::new(0.0, 0.0, 100.0, 100.0);
    let found = elements_in_area(&doc, &area, &[]);
    assert_eq!(found, vec![inner]);
}

#[test]
fn test_hidden_and_out_of_flow_elements_are_skipped() {
    let mut doc = Document::new();
    let body = doc.body();
    doc.append(
        body,
        ElementSpec::new("div")
            .style("display", "none")
            .rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
    );
    doc.append(
        body,
        ElementSpec::new("div")
            .style("visibility", "hidden")
            .rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
    );
    doc.append(
        body,
        ElementSpec::new("div")
            .out_of_flow()
            .rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
    );
    let fixed = doc.append(
        body,
        ElementSpec::new("div")
            .out_of_flow()
            .style("position", "fixed")
            .rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
    );

    let area = Rect::new(0.0, 0.0, 50.0, 50.0);
    let found = elements_in_area(&doc, &area, &[]);
    assert_eq!(found, vec![fixed]);
}

#[test]
fn test_chrome_subtree_never_selected() {
    let mut doc = Document::new();
    let body = doc.body();
    let toolbar = doc.append(
        body,
        ElementSpec::new("div")
            .attr(CHROME_MARKER, "true")
            .rect(Rect::new(0.0, 0.0, 300.0, 300.0)),
    );
    doc.append(
        toolbar,
        ElementSpec::new("button").rect(Rect::new(10.0, 10.0, 40.0, 40.0)),
    );
    let excluded_root = doc.append(
        body,
        ElementSpec::new("div").rect(Rect::new(0.0, 0.0, 300.0, 300.0)),
    );
    doc.append(
        excluded_root,
        ElementSpec::new("p").rect(Rect::new(5.0, 5.0, 60.0, 20.0)),
    );

    let area = Rect::new(0.0, 0.0, 200.0, 200.0);
    let found = elements_in_area(&doc, &area, &[excluded_root]);
    assert!(found.is_empty());
}

#[test]
fn test_results_are_capped() {
    let mut doc = Document::new();
    let body = doc.body();
    for i in 0..70 {
        doc.append(
            body,
            ElementSpec::new("div").rect(Rect::new(i as f64, 0.0, 10.0, 10.0)),
        );
    }

    let area = Rect::new(0.0, 0.0, 100.0, 10.0);
    let found = elements_in_area(&doc, &area, &[]);
    assert_eq!(found.len(), MAX_AREA_ELEMENTS);
}

use gridplate_core::storage::parse_workbook_content;
use gridplate_core::{
    Axis, Group, Rect, Renderer, RhaiEvaluator, TemplateConfig, TransformErrorKind, Workbook,
};
use pretty_assertions::assert_eq;

fn render_with(config: &TemplateConfig, template: &str, json: &str) -> gridplate_core::Result<Workbook> {
    let mut workbook = parse_workbook_content(template)?;
    let evaluator = RhaiEvaluator::new();
    let bindings = evaluator
        .parse_json(json)
        .map_err(|e| gridplate_core::GridplateError::Data(e.to_string()))?;
    Renderer::new(config, &evaluator).render(&mut workbook, &bindings)?;
    Ok(workbook)
}

fn render(template: &str, json: &str) -> Workbook {
    render_with(&TemplateConfig::default(), template, json).expect("render")
}

/// Non-empty cells of a sheet as `(A1, display)` pairs, row-major.
fn cells(workbook: &Workbook, sheet: &str) -> Vec<(String, String)> {
    workbook
        .sheet(sheet)
        .expect("sheet")
        .sorted_cells()
        .into_iter()
        .filter(|(_, cell)| !cell.value.is_empty())
        .map(|(pos, cell)| (pos.to_a1(), cell.value.display()))
        .collect()
}

fn expect(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(cell, value)| (cell.to_string(), value.to_string()))
        .collect()
}

const ITEMS: &str = r#"{"items": [
    {"name": "a", "price": 1},
    {"name": "b", "price": 2},
    {"name": "c", "price": 3.5}
]}"#;

#[test]
fn test_loop_repeats_block_and_shifts_trailing_content() {
    let workbook = render(
        r#"
A1: "Name"
B1: "Price"
A2: "<t:forEach items='${items}' var='item'>${item.name}"
B2: "${item.price}</t:forEach>"
A3: "Total"
B3: "$[SUM(B2)]"
"#,
        ITEMS,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "Name"),
            ("B1", "Price"),
            ("A2", "a"),
            ("B2", "1"),
            ("A3", "b"),
            ("B3", "2"),
            ("A4", "c"),
            ("B4", "3.5"),
            ("A5", "Total"),
            ("B5", "=SUM(B2:B4)"),
        ])
    );
}

#[test]
fn test_formula_in_loop_sees_only_its_iteration() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${items}' var='item' />${item.name}?@right=2"
B1: "${item.price}"
C1: "$[B1*2]"
A2: "Sum"
C2: "$[SUM(C1)]"
"#,
        r#"{"items": [{"name": "a", "price": 1}, {"name": "b", "price": 2}]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "a"),
            ("B1", "1"),
            ("C1", "=B1*2"),
            ("A2", "b"),
            ("B2", "2"),
            ("C2", "=B2*2"),
            ("A3", "Sum"),
            ("C3", "=SUM(C1:C2)"),
        ])
    );
}

#[test]
fn test_nested_loops_remap_per_outer_iteration() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${groups}' var='g'>${g.name}"
A2: "<t:forEach items='${g.items}' var='it'>${it}</t:forEach>"
A3: "$[SUM(A2)]"
B3: "</t:forEach>"
"#,
        r#"{"groups": [{"name": "G1", "items": [1, 2]}, {"name": "G2", "items": [3]}]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "G1"),
            ("A2", "1"),
            ("A3", "2"),
            ("A4", "=SUM(A2:A3)"),
            ("A5", "G2"),
            ("A6", "3"),
            ("A7", "=SUM(A6)"),
        ])
    );
}

const UNEVEN: &str = r#"{"scores": [1, 2], "names": ["a", "b", "c"]}"#;

#[test]
fn test_past_end_clear_blanks_cells() {
    let workbook = render(
        r#"
A1: "<t:multiForEach collections='${scores}, ${names}' vars='score, name' pastEndAction='clear'>${score}"
A2: "${name}</t:multiForEach>"
A3: "end"
"#,
        UNEVEN,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "1"),
            ("A2", "a"),
            ("A3", "2"),
            ("A4", "b"),
            ("A6", "c"),
            ("A7", "end"),
        ])
    );
}

#[test]
fn test_past_end_remove_closes_gaps() {
    let workbook = render(
        r#"
A1: "<t:multiForEach collections='${scores}, ${names}' vars='score, name' pastEndAction='remove'>${score}"
A2: "${name}</t:multiForEach>"
A3: "end"
"#,
        UNEVEN,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "1"),
            ("A2", "a"),
            ("A3", "2"),
            ("A4", "b"),
            ("A5", "c"),
            ("A6", "end"),
        ])
    );
}

#[test]
fn test_past_end_remove_keeps_everything_below() {
    let workbook = render(
        r#"
A1: "<t:multiForEach collections='${scores}, ${names}' vars='score, name' pastEndAction='remove'>${score}"
A2: "${name}</t:multiForEach>"
A3: "e1"
A4: "e2"
A5: "e3"
A6: "e4"
"#,
        UNEVEN,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "1"),
            ("A2", "a"),
            ("A3", "2"),
            ("A4", "b"),
            ("A5", "c"),
            ("A6", "e1"),
            ("A7", "e2"),
            ("A8", "e3"),
            ("A9", "e4"),
        ])
    );
}

#[test]
fn test_past_end_remove_along_columns() {
    let workbook = render(
        r#"
A1: "<t:multiForEach collections='${scores}, ${names}' vars='score, name' pastEndAction='remove' copyRight='true'>${score}"
B1: "${name}</t:multiForEach>"
C1: "tail"
"#,
        r#"{"scores": [1], "names": ["p", "q"]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "1"), ("B1", "p"), ("C1", "q"), ("D1", "tail")])
    );
}

#[test]
fn test_empty_collection_removes_block() {
    let workbook = render(
        r#"
A1: "Header"
A2: "<t:forEach items='${items}' var='item'>${item}</t:forEach>"
A3: "Footer"
"#,
        r#"{"items": []}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "Header"), ("A2", "Footer")])
    );
}

#[test]
fn test_empty_collection_clips_merge_reaching_into_block() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${items}' var='item'>${item}"
A2: "</t:forEach>"
A3: "x"
A4: "y"
merge: A2:A4
"#,
        r#"{"items": []}"#,
    );
    assert_eq!(
        workbook.sheet("Sheet1").unwrap().merged,
        vec![Rect { top: 0, bottom: 1, left: 0, right: 0 }]
    );
    assert_eq!(cells(&workbook, "Sheet1"), expect(&[("A1", "x"), ("A2", "y")]));
}

#[test]
fn test_removed_reference_uses_default_value() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${items}' var='item'>${item}</t:forEach>"
A2: "$[SUM(A1||0)]"
A3: "$[A1+1]"
"#,
        r#"{"items": []}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "=SUM(0)"), ("A2", "=#REF!+1")])
    );
}

#[test]
fn test_empty_fixed_collection_clears_block() {
    let workbook = render(
        r#"
A1: "Header"
A2: "<t:forEach items='${items}' var='item' fixed='true'>${item}</t:forEach>"
A3: "Footer"
"#,
        r#"{"items": []}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "Header"), ("A3", "Footer")])
    );
}

#[test]
fn test_fixed_loop_overwrites_reserved_rows() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${items}' var='item' fixed='true'>${item}</t:forEach>"
A2: "reserved"
A3: "footer"
"#,
        r#"{"items": ["x", "y"]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "x"), ("A2", "y"), ("A3", "footer")])
    );
}

#[test]
fn test_fixed_loop_rejects_growing_iteration() {
    let err = render_with(
        &TemplateConfig::default(),
        r#"
A1: "<t:forEach items='${groups}' var='g' fixed='true'><t:forEach items='${g}' var='x'>${x}</t:forEach></t:forEach>"
A2: "footer"
"#,
        r#"{"groups": [[1, 2]]}"#,
    )
    .unwrap_err();
    assert!(matches!(
        err.transform_kind(),
        Some(TransformErrorKind::StructuralEdit(_))
    ));
    assert!(err.to_string().starts_with("Sheet1!A1:"));
}

#[test]
fn test_fixed_size_config_reaches_nested_implicit_loops() {
    let template = r#"
A1: "${rows.name}"
B1: "${rows.tags}"
A2: "reserved"
B2: "kept"
A3: "footer"
"#;
    let data = r#"{"rows": [
        {"name": "x", "tags": ["t1", "t2"]},
        {"name": "y", "tags": ["t3"]}
    ]}"#;
    let config = TemplateConfig {
        fixed_size: vec!["rows".to_string()],
        ..TemplateConfig::default()
    };
    let workbook = render_with(&config, template, data).unwrap();
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "x"),
            ("B1", "t1"),
            ("A2", "y"),
            ("B2", "t3"),
            ("A3", "footer"),
        ])
    );

    // Without the setting the nested collection grows the sheet.
    let grown = render(template, data);
    assert_eq!(cells(&grown, "Sheet1").last(), Some(&("A5".to_string(), "footer".to_string())));
}

#[test]
fn test_extra_rows_metadata_extends_block() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${items}' var='item' />${item}?@extraRows=1"
A2: "-"
A3: "end"
"#,
        r#"{"items": ["a", "b"]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "a"), ("A2", "-"), ("A3", "b"), ("A4", "-"), ("A5", "end")])
    );
}

#[test]
fn test_left_and_right_metadata_widen_block() {
    let workbook = render(
        r#"
A1: "${item}"
B1: "<t:forEach items='${items}' var='item' />${item}!?@left=1;right=1"
C1: "${item}?"
A2: "end"
"#,
        r#"{"items": [1, 2]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "1"),
            ("B1", "1!"),
            ("C1", "1?"),
            ("A2", "2"),
            ("B2", "2!"),
            ("C2", "2?"),
            ("A3", "end"),
        ])
    );
}

#[test]
fn test_copy_right_repeats_columns() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${months}' var='m' copyRight='true'>${m}</t:forEach>"
A2: "below"
"#,
        r#"{"months": ["Jan", "Feb", "Mar"]}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "Jan"), ("B1", "Feb"), ("C1", "Mar"), ("A2", "below")])
    );
}

#[test]
fn test_if_tag_keeps_or_removes_block() {
    let template = r#"
A1: "<t:if test='${show}'>Shown ${value}</t:if>"
A2: "after"
"#;
    let shown = render(template, r#"{"show": true, "value": 5}"#);
    assert_eq!(
        cells(&shown, "Sheet1"),
        expect(&[("A1", "Shown 5"), ("A2", "after")])
    );

    let hidden = render(template, r#"{"show": false, "value": 5}"#);
    assert_eq!(cells(&hidden, "Sheet1"), expect(&[("A1", "after")]));

    let cleared = render(
        r#"
A1: "<t:if test='${show}' elseAction='clear'>Shown</t:if>"
A2: "after"
"#,
        r#"{"show": false}"#,
    );
    assert_eq!(cells(&cleared, "Sheet1"), expect(&[("A2", "after")]));
}

#[test]
fn test_group_tag_and_metadata_add_groups() {
    let workbook = render(
        r#"
A1: "<t:group groupDir='rows' collapse='true'>${a}"
A2: "${b}</t:group>"
A3: "<t:forEach items='${items}' var='item'>${item}?@groupDir=rows"
A4: "</t:forEach>"
"#,
        r#"{"a": 1, "b": 2, "items": ["x", "y"]}"#,
    );
    let sheet = workbook.sheet("Sheet1").unwrap();
    assert_eq!(
        sheet.groups,
        vec![
            Group { axis: Axis::Rows, start: 0, end: 1, collapsed: true },
            Group { axis: Axis::Rows, start: 2, end: 5, collapsed: false },
        ]
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "1"), ("A2", "2"), ("A3", "x"), ("A5", "y")])
    );
}

#[test]
fn test_implicit_collection_loops_over_referencing_cells() {
    let workbook = render(
        r#"
A1: "Name"
B1: "Qty"
A2: "${order.lines.name}"
B2: "${order.lines.qty}"
A3: "Done"
"#,
        r#"{"order": {"lines": [{"name": "x", "qty": 1}, {"name": "y", "qty": 2}]}}"#,
    );
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[
            ("A1", "Name"),
            ("B1", "Qty"),
            ("A2", "x"),
            ("B2", "1"),
            ("A3", "y"),
            ("B3", "2"),
            ("A4", "Done"),
        ])
    );
}

#[test]
fn test_no_implicit_renders_collection_as_text() {
    let template = "A1: \"${tags}\"\nA2: \"end\"\n";
    let data = r#"{"tags": ["a", "b"]}"#;

    let looped = render(template, data);
    assert_eq!(
        cells(&looped, "Sheet1"),
        expect(&[("A1", "a"), ("A2", "b"), ("A3", "end")])
    );

    let config = TemplateConfig {
        no_implicit: vec!["tags".to_string()],
        ..TemplateConfig::default()
    };
    let plain = render_with(&config, template, data).unwrap();
    assert_eq!(
        cells(&plain, "Sheet1"),
        expect(&[("A1", "a, b"), ("A2", "end")])
    );
}

#[test]
fn test_formula_across_sheets() {
    let workbook = render(
        r#"
[Summary]
A1: "$[SUM(Data!B1)]"
[Data]
A1: "<t:forEach items='${items}' var='item'>${item.name}"
B1: "${item.price}</t:forEach>"
"#,
        ITEMS,
    );
    assert_eq!(
        cells(&workbook, "Summary"),
        expect(&[("A1", "=SUM(Data!B1:B3)")])
    );
    assert_eq!(cells(&workbook, "Data").len(), 6);
}

#[test]
fn test_merged_regions_follow_iterations() {
    let workbook = render(
        r#"
A1: "<t:forEach items='${items}' var='item'>${item.name}"
B1: "</t:forEach>"
A2: "foot"
merge: A1:B1
merge: A2:B2
"#,
        ITEMS,
    );
    let mut merged = workbook.sheet("Sheet1").unwrap().merged.clone();
    merged.sort_by_key(|m| m.top);
    let rows: Vec<Rect> = (0..4)
        .map(|row| Rect { top: row, bottom: row, left: 0, right: 1 })
        .collect();
    assert_eq!(merged, rows);
    assert_eq!(
        cells(&workbook, "Sheet1"),
        expect(&[("A1", "a"), ("A2", "b"), ("A3", "c"), ("A4", "foot")])
    );
}

#[test]
fn test_typed_values_and_interpolation() {
    let workbook = render(
        r#"
A1: "${count}"
A2: "${ratio}"
A3: "${flag}"
A4: "${count} items"
A5: "${missing_prop.x}"
"#,
        r#"{"count": 3, "ratio": 0.25, "flag": true, "missing_prop": {}}"#,
    );
    let sheet = workbook.sheet("Sheet1").unwrap();
    use gridplate_core::{CellPos, CellValue, GridStore};
    let value = |row| sheet.get_cell(CellPos::new(row, 0)).unwrap().value;
    assert_eq!(value(0), CellValue::Number(3.0));
    assert_eq!(value(1), CellValue::Number(0.25));
    assert_eq!(value(2), CellValue::Bool(true));
    assert_eq!(value(3), CellValue::Text("3 items".to_string()));
    assert_eq!(value(4), CellValue::Empty);
}

#[test]
fn test_unknown_variable_reports_cell() {
    let err = render_with(&TemplateConfig::default(), "[Report]\nB2: \"${nope}\"", "{}")
        .unwrap_err();
    assert!(matches!(
        err.transform_kind(),
        Some(TransformErrorKind::UnknownVariable(_))
    ));
    assert!(err.to_string().starts_with("Report!B2:"));
}

#[test]
fn test_missing_end_tag_is_error() {
    let err = render_with(
        &TemplateConfig::default(),
        "A1: \"<t:forEach items='${items}' var='item'>${item}\"",
        ITEMS,
    )
    .unwrap_err();
    assert!(matches!(
        err.transform_kind(),
        Some(TransformErrorKind::TagAttribute(m)) if m.contains("missing end tag")
    ));
}

#[test]
fn test_nesting_limit() {
    let config = TemplateConfig {
        max_depth: 2,
        ..TemplateConfig::default()
    };
    let err = render_with(
        &config,
        r#"
A1: "<t:forEach items='${groups}' var='g'><t:forEach items='${g}' var='x'>${x}</t:forEach></t:forEach>"
"#,
        r#"{"groups": [[1]]}"#,
    )
    .unwrap_err();
    assert!(matches!(
        err.transform_kind(),
        Some(TransformErrorKind::NestingTooDeep(2))
    ));
}

#[test]
fn test_custom_syntax() {
    let config = TemplateConfig {
        tag_namespace: "jt".to_string(),
        expression_begin: "{{".to_string(),
        expression_end: "}}".to_string(),
        ..TemplateConfig::default()
    };
    let workbook = render_with(
        &config,
        "A1: \"<jt:forEach items='{{rows}}' var='r'>{{r}}</jt:forEach>\"",
        r#"{"rows": [7, 8]}"#,
    )
    .unwrap();
    assert_eq!(cells(&workbook, "Sheet1"), expect(&[("A1", "7"), ("A2", "8")]));
}

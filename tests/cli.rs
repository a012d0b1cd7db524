// Drives the built binary end to end.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn gridplate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gridplate"))
        .args(args)
        .arg("--no-default-config")
        .output()
        .expect("run gridplate")
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path.to_string_lossy().into_owned()
}

const TEMPLATE: &str = r#"[Invoice]
A1: "Item"
B1: "Price"
A2: "<t:forEach items='${lines}' var='line'>${line.name}"
B2: "${line.price}</t:forEach>"
A3: "Total"
B3: "$[SUM(B2)]"
"#;

const DATA: &str = r#"{"lines": [{"name": "Tea", "price": 3}, {"name": "Cake", "price": 4.5}]}"#;

#[test]
fn test_renders_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "invoice.grd", TEMPLATE);
    let data = write(dir.path(), "data.json", DATA);

    let output = gridplate(&[&template, "-d", &data]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "# Gridplate Workbook",
            "[Invoice]",
            r#"A1: "Item""#,
            r#"B1: "Price""#,
            r#"A2: "Tea""#,
            "B2: 3",
            r#"A3: "Cake""#,
            "B3: 4.5",
            r#"A4: "Total""#,
            "B4: =SUM(B2:B3)",
        ]
    );
}

#[test]
fn test_markdown_output_and_functions() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "t.grd", "A1: \"${shout(name)}\"\n");
    let data = write(dir.path(), "d.json", r#"{"name": "hi"}"#);
    let functions = write(dir.path(), "f.rhai", "fn shout(s) { s.to_upper() + \"!\" }\n");
    let out = dir.path().join("out.md");

    let output = gridplate(&[
        &template,
        "-d",
        &data,
        "-f",
        &functions,
        "-o",
        &out.to_string_lossy(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let md = fs::read_to_string(&out).unwrap();
    assert!(md.starts_with("# Sheet1\n"));
    assert!(md.contains("| 1 | HI! |"));
}

#[test]
fn test_config_changes_syntax() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "t.grd", "A1: \"{{greeting}}\"\n");
    let data = write(dir.path(), "d.json", r#"{"greeting": "hello"}"#);
    let config = write(
        dir.path(),
        "config.toml",
        "expression_begin = \"{{\"\nexpression_end = \"}}\"\n",
    );

    let output = gridplate(&[&template, "-d", &data, "-c", &config]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains(r#"A1: "hello""#));
}

#[test]
fn test_missing_config_warns_but_renders() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "t.grd", "A1: 1\n");
    let missing = dir.path().join("nope.toml");

    let output = gridplate(&[&template, "-c", &missing.to_string_lossy()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Warning: Config file not found"));
}

#[test]
fn test_unknown_variable_fails_with_cell() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "t.grd", "[Report]\nC4: \"${missing}\"\n");

    let output = gridplate(&[&template]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Report!C4:"), "{}", stderr);
}

#[test]
fn test_usage_errors() {
    let output = gridplate(&[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: gridplate"));

    let output = gridplate(&["--bogus"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown option: --bogus"));
}

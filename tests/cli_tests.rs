use clap::Parser;
use std::fs;
use std::process::Command;
use tempfile::TempDir;
use xtools::TransformError;
use xtools::cli::{Args, run};

const FORM: &str = r##"<form xmlns:xt="http://ki.ujep.cz/ns/xtools" xmlns:tag="http://ki.ujep.cz/ns/xtags" xmlns:ak="http://ki.ujep.cz/ns/akreditace">
<ak:osoba id="g"><ak:jméno>Eva Malá</ak:jméno><ak:tituly>doc. Ing. CSc.</ak:tituly></ak:osoba>
<section id="base"><h2>Garant</h2><p><xt:string idref="g|aname"/></p></section>
<section xt:extends="#base"><h2>Zástupce</h2></section>
<ul tag:list="people"><li>x</li></ul>
<style>p { color: red }</style>
</form>"##;

fn write_input(dir: &TempDir, name: &str, text: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_full_pipeline_to_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "form.xml", FORM);
    let output = dir.path().join("out.xml");
    let args = Args::try_parse_from([
        "xtools",
        input.as_str(),
        "-n",
        "ak=http://ki.ujep.cz/ns/akreditace",
        "-o",
        output.to_str().unwrap(),
        "--destyle",
        "-q",
    ])
    .unwrap();

    run(&args).unwrap();
    let xml = fs::read_to_string(&output).unwrap();

    assert_eq!(xml.matches("doc. Ing. Eva Malá, CSc.</a>").count(), 2);
    assert!(xml.contains("<h2>Zástupce</h2><p>"));
    assert!(xml.contains(r#"<ul class="tag_list" data-tag="people">"#));
    assert!(!xml.contains("<tag:"));
    assert!(!xml.contains("<style"));
}

#[test]
fn test_config_file_supplies_namespaces() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "form.xml", FORM);
    let config = write_input(
        &dir,
        "xtools.json",
        r#"{"namespaces": {"ak": "http://ki.ujep.cz/ns/akreditace"}, "destyle": true}"#,
    );
    let output = dir.path().join("out.xml");
    let args = Args::try_parse_from([
        "xtools",
        input.as_str(),
        "--config",
        config.as_str(),
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();

    run(&args).unwrap();
    let xml = fs::read_to_string(&output).unwrap();
    assert!(xml.contains("doc. Ing. Eva Malá, CSc."));
    assert!(!xml.contains("<style"));
}

#[test]
fn test_without_builtins_aname_is_unknown() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "form.xml", FORM);
    let output = dir.path().join("out.xml");
    let args = Args::try_parse_from([
        "xtools",
        input.as_str(),
        "-n",
        "ak=http://ki.ujep.cz/ns/akreditace",
        "-o",
        output.to_str().unwrap(),
        "--no-builtins",
    ])
    .unwrap();

    let err = run(&args).unwrap_err();
    assert!(matches!(err, TransformError::Evaluation { .. }));
    assert!(!output.exists());
}

#[test]
fn test_extends_cycle_is_reported_with_locations() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "cycle.xml",
        r##"<form xmlns:xt="http://ki.ujep.cz/ns/xtools">
<a id="a" xt:extends="#b"/>
<b id="b" xt:extends="#a"/>
</form>"##,
    );
    let args = Args::try_parse_from(["xtools", input.as_str()]).unwrap();

    let err = run(&args).unwrap_err();
    assert!(matches!(err, TransformError::Cycle(_)));
    let message = err.to_string();
    assert!(message.starts_with("cycle in extends:"));
    assert!(message.contains("cycle.xml:2]"));
    assert!(message.contains("cycle.xml:3]"));
}

#[test]
fn test_missing_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.xml");
    let args = Args::try_parse_from(["xtools", missing.to_str().unwrap()]).unwrap();
    assert!(matches!(run(&args), Err(TransformError::Dom(_))));
}

#[test]
fn test_resolved_queries_are_logged_to_stderr_only() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "form.xml", FORM);
    let xtools = |quiet: bool| {
        let mut command = Command::new(env!("CARGO_BIN_EXE_xtools"));
        command
            .arg(&input)
            .args(["-n", "ak=http://ki.ujep.cz/ns/akreditace"])
            .env_remove("RUST_LOG")
            .env("RUST_LOG_STYLE", "never");
        if quiet {
            command.arg("-q");
        }
        command.output().unwrap()
    };

    let out = xtools(false);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert_eq!(stdout.matches("doc. Ing. Eva Malá, CSc.</a>").count(), 2);
    assert!(!stdout.contains("xtools::query"));
    assert!(!stdout.contains("f:aname("));
    let logged: Vec<&str> = stderr
        .lines()
        .filter(|line| line.contains("xtools::query"))
        .collect();
    assert!(logged.iter().any(|line| line.ends_with("//*[@id='base']")));
    assert!(logged.iter().any(|line| line.ends_with("f:aname(//*[@id='g'])")));

    let quiet = xtools(true);
    assert!(quiet.status.success());
    assert!(!String::from_utf8(quiet.stderr).unwrap().contains("xtools::query"));
}

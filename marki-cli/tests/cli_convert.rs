use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

#[allow(deprecated)]
fn marki() -> Result<Command, Box<dyn std::error::Error>> {
    Ok(Command::cargo_bin("marki")?)
}

#[test]
fn convert_directory_writes_html_tree() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("markdown");
    let out = dir.path().join("html");
    write(&src.join("index.md"), "---\ntitle: Home\n---\n# Home\n")?;
    write(
        &src.join("docs/guide.md"),
        "# Guide\n\n```rust\nfn main() {}\n```\n",
    )?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(&out)
        .arg("dracula")
        .current_dir(dir.path())
        .assert()
        .success();

    let index = fs::read_to_string(out.join("index.html"))?;
    assert!(index.contains(r#"name="title" content="Home""#));
    let guide = fs::read_to_string(out.join("docs/guide.html"))?;
    assert!(guide.contains("<span"));
    Ok(())
}

#[test]
fn convert_single_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("README.md");
    let out = dir.path().join("site/README.html");
    write(&src, "# Readme\n\nSome *text*.\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(&out)
        .current_dir(dir.path())
        .assert()
        .success();

    let html = fs::read_to_string(&out)?;
    assert!(html.contains("<em>text</em>"));
    Ok(())
}

#[test]
fn convert_rejects_file_source_with_directory_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("README.md");
    write(&src, "# Readme\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path())
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a file path"));
    Ok(())
}

#[test]
fn convert_rejects_directory_source_with_file_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("markdown");
    fs::create_dir_all(&src)?;
    let out = dir.path().join("taken.html");
    write(&out, "")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(&out)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a directory"));
    Ok(())
}

#[test]
fn convert_rejects_missing_source() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    marki()?
        .arg("convert")
        .arg(dir.path().join("missing"))
        .arg(dir.path().join("out"))
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn convert_rejects_unknown_theme() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("markdown");
    write(&src.join("index.md"), "# Home\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path().join("html"))
        .arg("not-a-theme")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid theme"));

    assert!(!dir.path().join("html/index.html").exists());
    Ok(())
}

#[test]
fn watch_requires_directory_source() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("README.md");
    write(&src, "# Readme\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path().join("README.html"))
        .arg("--watch")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires <SRC> to be a directory"));
    Ok(())
}

#[test]
fn failing_document_is_reported_and_siblings_are_written() -> Result<(), Box<dyn std::error::Error>>
{
    let dir = tempdir()?;
    let src = dir.path().join("markdown");
    let out = dir.path().join("html");
    write(&src.join("a.md"), "# A\n")?;
    write(&src.join("broken.md"), "---\ntitle: [unclosed\n---\n# Broken\n")?;
    write(&src.join("c.md"), "# C\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(&out)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.md"))
        .stderr(predicate::str::contains("1 of 3"));

    assert!(out.join("a.html").exists());
    assert!(out.join("c.html").exists());
    assert!(!out.join("broken.html").exists());
    Ok(())
}

#[test]
fn convert_reads_roots_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(
        &dir.path().join("marki.yml"),
        "source: notes\noutput: public\ntheme: nord\n",
    )?;
    write(&dir.path().join("notes/hello.md"), "# Hello\n")?;

    marki()?
        .arg("convert")
        .current_dir(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("public/hello.html").exists());
    Ok(())
}

#[test]
fn themes_lists_default_theme() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    marki()?
        .arg("themes")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("dracula (default)"))
        .stdout(predicate::str::contains("nord"));
    Ok(())
}

#[test]
fn convert_refuses_to_overwrite_source() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("a.md");
    write(&src, "# keep me\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(&src)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("same file"));

    assert_eq!(fs::read_to_string(&src)?, "# keep me\n");
    Ok(())
}

#[test]
fn convert_single_file_checks_source_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("notes.txt");
    write(&src, "plain\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path().join("notes.html"))
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(".md extension"));

    assert!(!dir.path().join("notes.html").exists());
    Ok(())
}

#[test]
fn convert_accepts_non_utf8_documents() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let src = dir.path().join("markdown");
    fs::create_dir_all(&src)?;
    fs::write(src.join("latin1.md"), b"# Caf\xe9\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path().join("html"))
        .current_dir(dir.path())
        .assert()
        .success();

    let html = fs::read_to_string(dir.path().join("html/latin1.html"))?;
    assert!(html.contains("Caf\u{fffd}"));
    Ok(())
}

#[test]
fn command_line_theme_overrides_bad_config_theme() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(&dir.path().join("marki.yml"), "theme: neon\n")?;
    let src = dir.path().join("markdown");
    write(&src.join("index.md"), "# Home\n")?;

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path().join("html"))
        .arg("nord")
        .current_dir(dir.path())
        .assert()
        .success();

    marki()?
        .arg("convert")
        .arg(&src)
        .arg(dir.path().join("html"))
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid theme"));
    Ok(())
}

#[test]
fn themes_marks_configured_theme() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(&dir.path().join("marki.yml"), "theme: nord\n")?;

    marki()?
        .arg("themes")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("dracula (default)"))
        .stdout(predicate::str::contains("nord (configured)"));
    Ok(())
}

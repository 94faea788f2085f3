use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

const CATALOG: &str = "\
# Game art prompts

### Oak Shield
**ID:** `oak_shield`
**Category:** shields

```
A round oak shield with iron rim
```

### Iron Dagger
**ID:** `iron_dagger`
**Category:** weapons

```
A short iron dagger, pixel art
```

### Bronze Sword
**ID:** `bronze_sword`
**Category:** weapons

```
A bronze sword with a leather grip
```
";

fn write_catalog(dir: &Path) {
    fs::write(dir.join("image_prompts.md"), CATALOG).expect("catalog should write");
}

fn run_artgen(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_artgen"))
        .current_dir(cwd)
        .args(args)
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("artgen command should run")
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_artgen(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).contains("Usage"));
}

#[test]
fn unknown_flag_fails_with_usage() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_artgen(dir.path(), &["--bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("--bogus"));
}

#[test]
fn edit_requires_an_instruction() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());
    let output = run_artgen(dir.path(), &["--edit", "iron_dagger"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn list_filters_by_category_sorted_by_id() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["--list", "weapons"]);
    assert!(output.status.success(), "stderr={}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Available prompts (3 total):"));
    assert!(stdout.contains("## WEAPONS (2)"));
    assert!(!stdout.contains("oak_shield"));
    assert!(!stdout.contains("SHIELDS"));

    let bronze = stdout.find("bronze_sword: Bronze Sword").expect("bronze listed");
    let iron = stdout.find("iron_dagger: Iron Dagger").expect("iron listed");
    assert!(bronze < iron, "entries should be sorted by id");
}

#[test]
fn list_without_filter_orders_categories() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["--list"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    let shields = stdout.find("## SHIELDS (1)").expect("shields listed");
    let weapons = stdout.find("## WEAPONS (2)").expect("weapons listed");
    assert!(shields < weapons);
}

#[test]
fn list_json_is_stable() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let first = run_artgen(dir.path(), &["--list", "--json"]);
    let second = run_artgen(dir.path(), &["--list", "--json"]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout, "json output should be stable");

    let parsed: Value = serde_json::from_slice(&first.stdout).expect("json should parse");
    assert_eq!(parsed["total"], 3);
    let weapons = parsed["categories"]["weapons"]
        .as_array()
        .expect("weapons should be an array");
    let ids: Vec<&str> = weapons
        .iter()
        .filter_map(|entry| entry["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["bronze_sword", "iron_dagger"]);
}

#[test]
fn info_prints_the_entry() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["--info", "iron_dagger"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("### Iron Dagger"));
    assert!(stdout.contains("**ID:** `iron_dagger`"));
    assert!(stdout.contains("**Category:** weapons"));
    assert!(stdout.contains("A short iron dagger, pixel art"));
}

#[test]
fn info_for_unknown_id_reports_without_failing() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["--info", "mithril_axe"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stderr_of(&output).contains("Unknown item ID 'mithril_axe'"));
}

#[test]
fn missing_catalog_fails() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_artgen(dir.path(), &["--list"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Prompts file not found"));
}

#[test]
fn generate_unknown_id_fails_with_hint() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["mithril_axe"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Unknown item ID 'mithril_axe'"));
    assert!(stderr.contains("Use --list to see available items"));
}

#[test]
fn generate_without_credential_fails_before_backup() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());
    let sprite_dir = dir.path().join("assets/sprites/weapons");
    fs::create_dir_all(&sprite_dir).expect("sprite dir should create");
    fs::write(sprite_dir.join("iron_dagger.webp"), b"current").expect("sprite should write");

    let output = run_artgen(dir.path(), &["iron_dagger"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("GEMINI_API_KEY"));
    assert_eq!(
        fs::read(sprite_dir.join("iron_dagger.webp")).expect("sprite should remain"),
        b"current"
    );
}

#[test]
fn edit_without_sprite_reports_missing_asset_before_credential() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["--json", "--edit", "iron_dagger", "add a gem"]);
    assert_eq!(output.status.code(), Some(1));
    let envelope: Value = serde_json::from_slice(&output.stderr).expect("envelope should parse");
    assert_eq!(envelope["error"]["code"], "ART_NO_EXISTING_ASSET");
    assert_eq!(envelope["error"]["kind"], "no_existing_asset");
    assert!(!dir.path().join("assets").exists(), "nothing should be written");
}

#[test]
fn json_errors_use_the_envelope() {
    let dir = tempdir().expect("tempdir should create");
    write_catalog(dir.path());

    let output = run_artgen(dir.path(), &["--json", "iron_dagger"]);
    assert_eq!(output.status.code(), Some(1));
    let envelope: Value = serde_json::from_slice(&output.stderr).expect("envelope should parse");
    assert_eq!(envelope["ok"], false);
    assert_eq!(envelope["error"]["code"], "ART_MISSING_CREDENTIAL");
    assert_eq!(envelope["error"]["kind"], "missing_credential");
}

#[test]
fn project_flag_and_config_file_relocate_paths() {
    let dir = tempdir().expect("tempdir should create");
    let project = dir.path().join("game");
    fs::create_dir_all(project.join("docs")).expect("project should create");
    fs::write(project.join("docs/prompts.md"), CATALOG).expect("catalog should write");
    fs::write(project.join("artgen.yaml"), "catalog: docs/prompts.md\n").expect("config should write");

    let output = run_artgen(
        dir.path(),
        &["--project", project.to_str().expect("utf-8 path"), "--info", "oak_shield"],
    );
    assert!(output.status.success(), "stderr={}", stderr_of(&output));
    assert!(stdout_of(&output).contains("A round oak shield with iron rim"));
}

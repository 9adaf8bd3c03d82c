//! Integration tests for the pcbpop CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use pcbpop::core::scene::ManifestStore;
use pcbpop::core::SceneStore;
use pcbpop::entities::{PlacementInstruction, Side, Visibility};

/// Helper to get a pcbpop command isolated from the user's environment
fn pcbpop(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pcbpop").unwrap();
    cmd.current_dir(tmp.path())
        .env_remove("MODEL_LIBRARY_PATHS")
        .env_remove("PCBPOP_PRESET")
        .env_remove("RUST_LOG")
        .env("HOME", tmp.path().join("home"))
        .env("XDG_CONFIG_HOME", tmp.path().join("home/.config"));
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A board project with two model libraries:
///
/// - `lib_a`: `0603_res` and its marked variant
/// - `lib_b`: a shadowed `0603_res`, `0402_cap`, the `USB_C` main model
///   with one sub-model, and a mechanical bracket
fn setup_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    write(root, "board.kicad_pro", "{}\n");
    write(
        root,
        "pcbpop.yaml",
        "default:\n  SETTINGS:\n    MODEL_LIBRARY_PATHS: [lib_a, lib_b]\n\
         marked:\n  EFFECTS:\n    SHOW_MARKINGS: true\n",
    );

    write(
        root,
        "fab/board-top-pos.csv",
        "Ref,Val,Package,PosX,PosY,Rot,Side\n\
         R1,10k,0603_res,10,5,90,top\n\
         C1,100n,0402_cap,4,8,0,bottom\n\
         U1,MCU,QFN32,25,20,0,top\n\
         J1,USB,USB_C_RAW,25,2,180,top\n\
         A1,Bracket,BRACKET,0,0,0,top\n",
    );
    write(
        root,
        "fab/board-override.csv",
        "Ref,Package,Override,PosX,PosY,Rot,Side\n\
         J1,USB_C_RAW,USB_C,,1,,\n",
    );
    write(
        root,
        "doc/board-BOM-populated.csv",
        "Reference,Manufacturer,MPN\n\
         R1,Yageo,RC0603\n\
         C1,Murata,GRM155\n",
    );

    write(root, "lib_a/passives/0603_res.blend", "");
    write(root, "lib_a/passives/0603_res-yageo-rc0603.blend", "");
    write(root, "lib_b/0603_res.blend", "");
    write(root, "lib_b/0402_cap.blend", "");
    write(root, "lib_b/connectors/USB_C.blend", "");
    write(
        root,
        "lib_b/connectors/USB_C.props.yaml",
        "PRIO: 0\n1_MODEL_NAME: USB_C_SHIELD\n1_USB_C_SHIELD_POS: [0, 1.5, 0]\n",
    );
    write(root, "lib_b/connectors/USB_C_SHIELD.blend", "");
    write(root, "lib_b/BRACKET.blend", "");
    write(root, "lib_b/BRACKET.props.yaml", "PRIO: 1\n");

    tmp
}

fn create_board(tmp: &TempDir) {
    pcbpop(tmp)
        .args(["board", "--width", "50", "--height", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created board"));
}

fn scene(tmp: &TempDir) -> Vec<PlacementInstruction> {
    let store = ManifestStore::open(&tmp.path().join("fab/board.scene.yaml")).unwrap();
    store.placed().to_vec()
}

fn find<'a>(placed: &'a [PlacementInstruction], name: &str) -> &'a PlacementInstruction {
    placed
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("{name} not in scene"))
}

fn assert_vec(actual: [f64; 3], expected: [f64; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

// ============================================================================
// Basic Commands
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    pcbpop(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("populate"))
        .stdout(predicate::str::contains("library"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    pcbpop(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pcbpop"));
}

#[test]
fn test_reimport_conflicts_with_regenerate() {
    let tmp = TempDir::new().unwrap();
    pcbpop(&tmp)
        .args(["populate", "--reimport", "--regenerate"])
        .assert()
        .failure();
}

// ============================================================================
// Template and Config Commands
// ============================================================================

#[test]
fn test_template_placement_headers() {
    let tmp = TempDir::new().unwrap();
    pcbpop(&tmp)
        .args(["template", "placement"])
        .assert()
        .success()
        .stdout("Ref,Package,PosX,PosY,Rot,Side,Val\n");
}

#[test]
fn test_template_uses_configured_aliases() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "pcbpop.yaml",
        "default:\n  ALIASES:\n    bom:\n      part_number: [\"Mfr Part\"]\n",
    );
    pcbpop(&tmp)
        .args(["template", "bom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mfr Part"));
}

#[test]
fn test_config_init_then_unchanged() {
    let tmp = TempDir::new().unwrap();
    pcbpop(&tmp)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(tmp.path().join("pcbpop.yaml").is_file());

    pcbpop(&tmp)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));
}

#[test]
fn test_config_show_json() {
    let tmp = setup_project();
    let output = pcbpop(&tmp)
        .args(["config", "show", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["SETTINGS"]["FAB_DIR"], "fab");
    assert_eq!(value["SETTINGS"]["MODEL_LIBRARY_PATHS"][1], "lib_b");
}

#[test]
fn test_unknown_preset_fails() {
    let tmp = setup_project();
    pcbpop(&tmp)
        .args(["--config", "nope", "template", "placement"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

// ============================================================================
// Library Command
// ============================================================================

#[test]
fn test_library_find_prefers_first_library() {
    let tmp = setup_project();
    pcbpop(&tmp)
        .args(["library", "find", "0603_res"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lib_a"));
}

#[test]
fn test_library_find_shows_submodels() {
    let tmp = setup_project();
    pcbpop(&tmp)
        .args(["library", "find", "USB_C"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main model"))
        .stdout(predicate::str::contains("USB_C_SHIELD"));
}

#[test]
fn test_library_find_missing_fails() {
    let tmp = setup_project();
    pcbpop(&tmp)
        .args(["library", "find", "SOT23"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SOT23"));
}

#[test]
fn test_library_list_marks_shadowed() {
    let tmp = setup_project();
    pcbpop(&tmp)
        .args(["library", "list", "--filter", "0603", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0603_res,1,"))
        .stdout(predicate::str::contains("shadowed"));
}

// ============================================================================
// Populate Command
// ============================================================================

#[test]
fn test_populate_without_board_fails() {
    let tmp = setup_project();
    pcbpop(&tmp).arg("populate").assert().failure();
}

#[test]
fn test_populate_writes_scene() {
    let tmp = setup_project();
    create_board(&tmp);

    pcbpop(&tmp)
        .arg("populate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Components placed:"))
        .stdout(predicate::str::contains("U1"))
        .stdout(predicate::str::contains("model not found"));

    let placed = scene(&tmp);
    let names: Vec<&str> = placed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["R1:10k", "C1:100n", "J1:USB", "J1:USB_1_submodel"]
    );

    // Board 50 x 40, origin offset (-25, -20)
    let r1 = find(&placed, "R1:10k");
    assert_eq!(r1.asset, "0603_res");
    assert!(r1.library.ends_with("lib_a"));
    assert_eq!(r1.side, Side::Top);
    assert_vec(r1.position, [-15.0, -15.0, 1.6]);
    assert_vec(r1.rotation, [0.0, 0.0, 90.0]);

    let c1 = find(&placed, "C1:100n");
    assert_eq!(c1.side, Side::Bottom);
    assert_vec(c1.position, [-29.0, -12.0, 0.0]);
    assert_vec(c1.rotation, [180.0, 0.0, 0.0]);

    // Override replaced the footprint and moved the part 1 mm in Y
    let j1 = find(&placed, "J1:USB");
    assert_eq!(j1.asset, "USB_C");
    assert_vec(j1.position, [0.0, -17.0, 1.6]);

    let shield = find(&placed, "J1:USB_1_submodel");
    assert_eq!(shield.asset, "USB_C_SHIELD");
    assert_eq!(shield.parent.as_deref(), Some("J1"));
    assert_eq!(shield.visibility, Visibility::Normal);
}

#[test]
fn test_populate_twice_reports_already_imported() {
    let tmp = setup_project();
    create_board(&tmp);
    pcbpop(&tmp).arg("populate").assert().success();
    let before = fs::read_to_string(tmp.path().join("fab/board.scene.yaml")).unwrap();

    pcbpop(&tmp)
        .arg("populate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Components already imported"));

    let after = fs::read_to_string(tmp.path().join("fab/board.scene.yaml")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_reimport_without_changes_is_a_no_op() {
    let tmp = setup_project();
    create_board(&tmp);
    pcbpop(&tmp).arg("populate").assert().success();
    let before = scene(&tmp);

    pcbpop(&tmp)
        .args(["populate", "--reimport"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scene is up to date"));

    assert_eq!(scene(&tmp), before);
}

#[test]
fn test_reimport_replaces_changed_component() {
    let tmp = setup_project();
    create_board(&tmp);
    pcbpop(&tmp).arg("populate").assert().success();

    // C1 becomes a resistor
    write(
        tmp.path(),
        "fab/board-top-pos.csv",
        "Ref,Val,Package,PosX,PosY,Rot,Side\n\
         R1,10k,0603_res,10,5,90,top\n\
         C1,100n,0603_res,4,8,0,bottom\n",
    );
    pcbpop(&tmp)
        .args(["populate", "--reimport"])
        .assert()
        .success();

    let placed = scene(&tmp);
    let c1: Vec<_> = placed.iter().filter(|p| p.reference == "C1").collect();
    assert_eq!(c1.len(), 1);
    assert_eq!(c1[0].asset, "0603_res");
    // Components absent from the new table stay in the scene
    assert!(placed.iter().any(|p| p.name == "J1:USB"));
}

#[test]
fn test_show_mechanical_places_bracket() {
    let tmp = setup_project();
    create_board(&tmp);
    pcbpop(&tmp)
        .args(["populate", "--mechanical", "true"])
        .assert()
        .success();

    let placed = scene(&tmp);
    let bracket = find(&placed, "A1:Bracket");
    assert_eq!(bracket.visibility, Visibility::Mechanical);
}

#[test]
fn test_marked_preset_uses_marked_model() {
    let tmp = setup_project();
    create_board(&tmp);
    pcbpop(&tmp)
        .args(["--config", "marked", "populate"])
        .assert()
        .success();

    let placed = scene(&tmp);
    assert_eq!(find(&placed, "R1:10k").asset, "0603_res-yageo-rc0603");
    // No marked model for C1; the generic one is used
    assert_eq!(find(&placed, "C1:100n").asset, "0402_cap");
}

#[test]
fn test_dry_run_json_leaves_scene_empty() {
    let tmp = setup_project();
    create_board(&tmp);

    let output = pcbpop(&tmp)
        .args(["populate", "--dry-run", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["dry_run"], true);
    assert_eq!(value["report"]["placed"], 3);
    assert_eq!(value["report"]["rows_processed"], 5);
    assert_eq!(value["instructions"].as_array().unwrap().len(), 4);

    assert!(scene(&tmp).is_empty());
}

#[test]
fn test_library_paths_from_environment_come_first() {
    let tmp = setup_project();
    write(tmp.path(), "env_lib/0603_res.blend", "");
    create_board(&tmp);

    pcbpop(&tmp)
        .env("MODEL_LIBRARY_PATHS", tmp.path().join("env_lib"))
        .arg("populate")
        .assert()
        .success();

    let placed = scene(&tmp);
    assert!(find(&placed, "R1:10k").library.ends_with("env_lib"));
}

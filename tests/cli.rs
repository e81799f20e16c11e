use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn roomsync(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("roomsync").unwrap();
    cmd.env("HOME", home).env("RUST_LOG", "roomsync=warn");
    cmd
}

fn write_schedule(dir: &Path) -> PathBuf {
    let path = dir.join("schedule.xlsx");
    let mut wb = rust_xlsxwriter::Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("宿泊予定表").unwrap();
    ws.write_string(0, 0, "日付").unwrap();
    ws.write_string(0, 2, "顧客名").unwrap();
    ws.write_string(0, 3, "区分").unwrap();
    // 2026-02-01, 2026-03-01, 2026-11-01
    for (row, (serial, name)) in [(46054.0, "Kondo"), (46082.0, "Fujii"), (46327.0, "Ogawa")]
        .iter()
        .enumerate()
    {
        let r = row as u32 + 1;
        ws.write_number(r, 0, *serial).unwrap();
        ws.write_string(r, 2, *name).unwrap();
        ws.write_string(r, 3, "一般").unwrap();
        ws.write_number(r, 4, 7500.0).unwrap();
        ws.write_number(r, 5, 2.0).unwrap();
    }
    wb.save(&path).unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    roomsync(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("purge"));
}

#[test]
fn extract_missing_source_fails_fast() {
    let home = tempfile::tempdir().unwrap();
    roomsync(home.path())
        .args(["extract", "/nonexistent/2026.xlsx", "--sheet", "S", "--from", "2026", "--to", "2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source file not found"));
}

#[test]
fn unknown_layout_fails_fast() {
    let home = tempfile::tempdir().unwrap();
    let file = write_schedule(home.path());
    roomsync(home.path())
        .arg("extract")
        .arg(&file)
        .args(["--sheet", "宿泊予定表", "--from", "2026", "--to", "2026", "--layout", "wide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown column layout: wide"));
}

#[test]
fn purge_requires_confirmation() {
    let home = tempfile::tempdir().unwrap();
    roomsync(home.path())
        .args(["purge", "--from", "2023", "--to", "2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("without --yes"));
}

#[test]
fn dry_run_extracts_without_store() {
    let home = tempfile::tempdir().unwrap();
    let file = write_schedule(home.path());
    roomsync(home.path())
        .arg("sync")
        .arg(&file)
        .args(["--sheet", "宿泊予定表", "--from", "2026-01", "--to", "2026-09", "--layout", "short", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("2026-02-01 to 2026-03-01"))
        .stdout(predicate::str::contains("¥30,000"));
}

#[test]
fn sync_without_settings_makes_no_remote_call() {
    let home = tempfile::tempdir().unwrap();
    let file = write_schedule(home.path());
    roomsync(home.path())
        .arg("sync")
        .arg(&file)
        .args(["--sheet", "宿泊予定表", "--from", "2026", "--to", "2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("roomsync init"));
}

#[test]
fn missing_sheet_fails_before_upload() {
    let home = tempfile::tempdir().unwrap();
    let file = write_schedule(home.path());
    roomsync(home.path())
        .arg("sync")
        .arg(&file)
        .args(["--sheet", "Sheet1", "--from", "2026", "--to", "2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown sheet: Sheet1"));
}

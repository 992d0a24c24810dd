//! End-to-end runs of the ffbundle subcommands against temporary bundles.

#![allow(clippy::expect_used)]

use clap::Parser;
use ffbundle_cli::{Cli, run};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::tempdir;

/// Run `ffbundle <args>` on the bundle at `data`, returning stdout.
fn ffbundle(data: &Path, args: &[&str]) -> anyhow::Result<String> {
    let data = data.to_str().expect("utf-8 temp path");
    let mut argv = vec!["ffbundle", "--data", data];
    argv.extend_from_slice(args);

    let cli = Cli::try_parse_from(argv)?;
    let mut out = Vec::new();
    run(cli, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

fn tree(root: &Path) {
    std::fs::create_dir_all(root.join("docs")).expect("mkdir");
    std::fs::write(root.join("a"), "a").expect("write");
    std::fs::write(root.join("docs/readme.txt"), "read me\n").expect("write");
    std::fs::write(root.join("z"), "zz").expect("write");
}

#[test]
fn test_pack_list_cat_extract() {
    let dir = tempdir().expect("Failed to create temp dir");
    let src = dir.path().join("src");
    tree(&src);
    let data = dir.path().join("b.data");

    let output = ffbundle(&data, &["pack", src.to_str().expect("utf-8"), "--sort"]).expect("pack");
    assert!(output.starts_with("Packed 3 files (11 bytes)"));
    assert!(dir.path().join("b.ffindex").exists());

    let listing = ffbundle(&data, &["list"]).expect("list");
    assert_eq!(listing, "a\ndocs/readme.txt\nz\n");

    let long = ffbundle(&data, &["list", "--long"]).expect("list --long");
    assert!(long.lines().all(|line| line.split('\t').count() == 3));

    let content = ffbundle(&data, &["cat", "docs/readme.txt"]).expect("cat");
    assert_eq!(content, "read me\n");

    let out_dir = dir.path().join("out");
    ffbundle(&data, &["extract", out_dir.to_str().expect("utf-8")]).expect("extract");
    assert_eq!(
        std::fs::read_to_string(out_dir.join("docs/readme.txt")).expect("read"),
        "read me\n"
    );
    assert_eq!(std::fs::read_to_string(out_dir.join("z")).expect("read"), "zz");
}

#[test]
fn test_add_unlink_compact_stats() {
    let dir = tempdir().expect("Failed to create temp dir");
    let data = dir.path().join("b.data");
    let input = dir.path().join("input.txt");
    std::fs::write(&input, "hello").expect("write");

    ffbundle(&data, &["add", "one", input.to_str().expect("utf-8")]).expect("add one");
    ffbundle(&data, &["add", "two", input.to_str().expect("utf-8")]).expect("add two");
    let err = ffbundle(&data, &["add", "two", input.to_str().expect("utf-8")])
        .expect_err("duplicate add");
    assert!(format!("{err:#}").contains("already exists"));

    ffbundle(&data, &["unlink", "one"]).expect("unlink");
    let stats = ffbundle(&data, &["stats", "--json"]).expect("stats");
    let stats: serde_json::Value = serde_json::from_str(&stats).expect("json");
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["reclaimable_bytes"], 7);

    let compacted = ffbundle(&data, &["compact"]).expect("compact");
    assert!(compacted.contains("(7 reclaimed)"));
    assert_eq!(ffbundle(&data, &["cat", "two"]).expect("cat"), "hello");
    assert_eq!(ffbundle(&data, &["verify"]).expect("verify"), "OK: 1 entries checked\n");
}

#[test]
fn test_merge_and_verify_failure() {
    let dir = tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("first.data");
    let second = dir.path().join("second.data");
    let input = dir.path().join("input.txt");
    std::fs::write(&input, "x").expect("write");

    ffbundle(&first, &["add", "a", input.to_str().expect("utf-8")]).expect("add");
    ffbundle(&second, &["add", "b", input.to_str().expect("utf-8")]).expect("add");

    let merged = ffbundle(
        &first,
        &[
            "merge",
            "--other-data",
            second.to_str().expect("utf-8"),
            "--other-index",
            dir.path().join("second.ffindex").to_str().expect("utf-8"),
        ],
    )
    .expect("merge");
    assert_eq!(merged, "Merged 1 entries (3 bytes) at offset 3\n");
    assert_eq!(ffbundle(&first, &["cat", "b"]).expect("cat"), "x");

    std::fs::write(&first, b"x\n\0xyz").expect("corrupt data");
    let err = ffbundle(&first, &["verify"]).expect_err("verify should fail");
    assert!(err.to_string().contains("1 problem(s)"));
}

#[test]
fn test_bench_reports_reads() {
    let dir = tempdir().expect("Failed to create temp dir");
    let src = dir.path().join("src");
    tree(&src);
    let data = dir.path().join("b.data");
    ffbundle(&data, &["pack", src.to_str().expect("utf-8")]).expect("pack");

    let report = ffbundle(&data, &["bench", "--reads", "30", "--json"]).expect("bench");
    let report: serde_json::Value = serde_json::from_str(&report).expect("json");
    assert_eq!(report["files"], 3);
    assert_eq!(report["reads"], 30);
    assert_eq!(report["bytes"], 110);
}

#[test]
fn test_cat_streams_binary_payload() {
    let dir = tempdir().expect("Failed to create temp dir");
    let data = dir.path().join("b.data");
    let input = dir.path().join("blob.bin");
    let payload: Vec<u8> = (0..=255u8).chain(*b"\n\0\n\0").collect();
    std::fs::write(&input, &payload).expect("write");

    ffbundle(&data, &["add", "blob", input.to_str().expect("utf-8")]).expect("add");

    let cli = Cli::try_parse_from([
        "ffbundle",
        "--data",
        data.to_str().expect("utf-8"),
        "cat",
        "blob",
    ])
    .expect("parse");
    let mut out = Vec::new();
    run(cli, &mut out).expect("cat");
    assert_eq!(out, payload);
}

mod common;

use assert_cmd::Command;
use block_file_types::chain::{chain_request, ChainRequest};
use block_file_types::encode_entry;
use common::{block, head_info_response, serve_http, submit_ok_response};
use predicates::prelude::*;
use prost::Message;
use tempfile::TempDir;

fn cmd(basedir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("koinos-block-file").unwrap();
    cmd.arg("--basedir").arg(basedir.path());
    cmd
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--nb-blocks-per-call"));
}

#[test]
fn test_help_says_legacy_method_name_is_not_json_rpc() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("JSON-RPC"));
}

#[test]
fn test_unknown_log_level_exits_with_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--log-level", "verbose"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("verbose"));
}

#[test]
fn test_zero_batch_size_exits_with_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--nb-blocks-per-call", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nb-blocks-per-call"));
}

#[test]
fn test_replay_of_missing_file_exits_with_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--mode", "replay", "--exit-on-completion"])
        .arg("--block-file-path")
        .arg(dir.path().join("missing.dat"))
        .assert()
        .code(1);

    let log = dir.path().join("block_file/logs/block_file.log");
    assert!(log.exists());
    let contents = std::fs::read_to_string(log).unwrap();
    assert!(contents.contains("Starting with options"));
    assert!(contents.contains("missing.dat"));
}

#[test]
fn test_archive_with_nothing_irreversible_creates_empty_file() {
    let dir = TempDir::new().unwrap();
    let block_file = dir.path().join("blocks.dat");
    let (endpoint, server) = serve_http(1, |_| head_info_response(0).encode_to_vec());

    cmd(&dir)
        .args(["--mode", "archive", "--exit-on-completion", "--instance-id", "test1"])
        .arg("--rpc")
        .arg(&endpoint)
        .arg("--block-file-path")
        .arg(&block_file)
        .assert()
        .success();

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/chain");
    assert!(block_file.exists());
    assert_eq!(std::fs::metadata(&block_file).unwrap().len(), 0);
}

#[test]
fn test_replay_over_http_submits_from_start_height() {
    let dir = TempDir::new().unwrap();
    let block_file = dir.path().join("blocks.dat");
    let entries: String = (1..=3).map(|h| encode_entry(&block(h))).collect();
    std::fs::write(&block_file, entries).unwrap();

    let (endpoint, server) = serve_http(1, |_| submit_ok_response().encode_to_vec());

    cmd(&dir)
        .args(["-m", "process", "-o", "json-rpc", "-s", "3", "--exit-on-completion"])
        .arg("--rpc")
        .arg(&endpoint)
        .arg("--block-file-path")
        .arg(&block_file)
        .assert()
        .success();

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/chain");
    let request = ChainRequest::decode(requests[0].body.as_slice()).unwrap();
    match request.request {
        Some(chain_request::Request::SubmitBlock(req)) => {
            assert_eq!(req.block, Some(block(3)));
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

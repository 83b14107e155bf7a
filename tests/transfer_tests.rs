//! Archive and replay loops against an in-memory node.

mod common;

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Cursor, Write};

use block_file_transport::test_utils::ScriptedTransport;
use block_file_transport::Service;
use block_file_types::decode_entry;
use common::{block, FakeNode};
use koinos_block_file::archive::{archive_blocks, ArchiveOptions};
use koinos_block_file::replay::replay_blocks;
use koinos_block_file::rpc::BlockRpc;
use koinos_block_file::{Error, RpcError};

fn block_store_calls(rpc: &BlockRpc<ScriptedTransport>) -> usize {
    rpc.transport()
        .calls()
        .iter()
        .filter(|call| call.service == Service::BlockStore)
        .count()
}

async fn archive_to_vec(node: &FakeNode, start_height: u64, batch_size: u32) -> Vec<u8> {
    let rpc = BlockRpc::new(node.transport());
    let mut out = Vec::new();
    archive_blocks(
        &rpc,
        &mut out,
        ArchiveOptions {
            start_height,
            batch_size,
        },
    )
    .await
    .unwrap();
    out
}

#[tokio::test]
async fn test_nothing_irreversible_archives_nothing() {
    let node = FakeNode::new(10, 0);
    let rpc = BlockRpc::new(node.transport());
    let mut out = Vec::new();

    let summary = archive_blocks(
        &rpc,
        &mut out,
        ArchiveOptions {
            start_height: 1,
            batch_size: 10_000,
        },
    )
    .await
    .unwrap();

    assert!(summary.fetch_heights.is_empty());
    assert_eq!(block_store_calls(&rpc), 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_archive_fetches_at_fixed_stride() {
    let node = FakeNode::new(25_000, 25_000);
    let rpc = BlockRpc::new(node.transport());
    let mut out = Vec::new();

    let summary = archive_blocks(
        &rpc,
        &mut out,
        ArchiveOptions {
            start_height: 1,
            batch_size: 10_000,
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.fetch_heights, vec![1, 10_001, 20_001]);
    assert_eq!(block_store_calls(&rpc), 3);
    assert_eq!(summary.blocks_written, 25_000);
    assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 25_000);
}

#[tokio::test]
async fn test_archived_entries_decode_to_original_blocks() {
    let node = FakeNode::new(7, 7);
    let out = archive_to_vec(&node, 2, 3).await;

    let blocks: Vec<_> = out
        .split_inclusive(|b| *b == b'\n')
        .map(|line| decode_entry(line).unwrap())
        .collect();
    // Fetches at 2 and 5 cover heights 2..=7.
    assert_eq!(blocks, (2..=7).map(block).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_replay_submits_from_start_height() {
    let archive = archive_to_vec(&FakeNode::new(5, 5), 1, 10).await;

    let target = FakeNode::new(0, 0);
    let rpc = BlockRpc::new(target.transport());
    let summary = replay_blocks(&rpc, &mut Cursor::new(&archive), 3)
        .await
        .unwrap();

    assert_eq!(target.submitted(), vec![3, 4, 5]);
    assert_eq!(summary.applied, vec![3, 4, 5]);
    assert_eq!(summary.skipped, 2);
    assert_eq!(rpc.transport().call_count(), 3);
}

#[tokio::test]
async fn test_replay_stops_on_submit_timeout() {
    let archive = archive_to_vec(&FakeNode::new(5, 5), 1, 10).await;

    let target = FakeNode::new(0, 0).timing_out_at(2);
    let rpc = BlockRpc::new(target.transport());
    let err = replay_blocks(&rpc, &mut Cursor::new(&archive), 1)
        .await
        .unwrap_err();

    match err {
        Error::Rpc(rpc_err @ RpcError::Transport { .. }) => assert!(rpc_err.is_timeout()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(target.submitted(), vec![1]);
    assert_eq!(rpc.transport().call_count(), 2);
}

#[tokio::test]
async fn test_replay_is_repeatable() {
    let archive = archive_to_vec(&FakeNode::new(12, 12), 1, 4).await;

    let mut runs = Vec::new();
    for _ in 0..2 {
        let target = FakeNode::new(0, 0);
        let rpc = BlockRpc::new(target.transport());
        replay_blocks(&rpc, &mut Cursor::new(&archive), 6)
            .await
            .unwrap();
        runs.push(target.submitted());
    }
    assert_eq!(runs[0], (6..=12).collect::<Vec<_>>());
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_archive_appends_to_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocks.dat");
    let node = FakeNode::new(6, 6);

    for start_height in [1, 4] {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let mut out = BufWriter::new(file);
        let rpc = BlockRpc::new(node.transport());
        archive_blocks(
            &rpc,
            &mut out,
            ArchiveOptions {
                start_height,
                batch_size: 3,
            },
        )
        .await
        .unwrap();
        out.flush().unwrap();
    }

    let target = FakeNode::new(0, 0);
    let rpc = BlockRpc::new(target.transport());
    let mut input = BufReader::new(File::open(&path).unwrap());
    replay_blocks(&rpc, &mut input, 1).await.unwrap();
    assert_eq!(target.submitted(), vec![1, 2, 3, 4, 5, 6, 4, 5, 6]);
}

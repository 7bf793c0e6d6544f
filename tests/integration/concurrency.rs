use crate::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use protobook_core::ProtoBook;
use protobook_store::MemoryProtoBook;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const THREADS: u32 = 8;
const PEERS_PER_THREAD: u32 = 16;
const OPS_PER_THREAD: usize = 5_000;

#[derive(Debug, Clone)]
enum Op {
    Add(PeerId, Vec<ProtocolId>),
    Remove(PeerId, Vec<ProtocolId>),
    Get(PeerId),
}

fn apply(book: &MemoryProtoBook, op: &Op) {
    match op {
        Op::Add(p, protos) => {
            let _ = book.add_protocols(p, protos);
        }
        Op::Remove(p, protos) => book.remove_protocols(p, protos),
        Op::Get(p) => {
            let _ = book.protocols(p);
        }
    }
}

fn random_ops(worker: u32, pool: &[ProtocolId]) -> Vec<Op> {
    let mut rng = StdRng::seed_from_u64(0xb00c ^ u64::from(worker));
    let peers: Vec<PeerId> = (0..PEERS_PER_THREAD)
        .map(|i| peer(worker * PEERS_PER_THREAD + i))
        .collect();
    (0..OPS_PER_THREAD)
        .map(|_| {
            let p = peers[rng.gen_range(0..peers.len())];
            let n = rng.gen_range(1..=4);
            let picked: Vec<ProtocolId> = (0..n)
                .map(|_| pool[rng.gen_range(0..pool.len())].clone())
                .collect();
            match rng.gen_range(0..10) {
                0..=4 => Op::Add(p, picked),
                5..=7 => Op::Remove(p, picked),
                _ => Op::Get(p),
            }
        })
        .collect()
}

/// Disjoint peers per thread: the concurrent result must equal a serialized
/// replay of the same operations.
#[test]
fn test_disjoint_peers_match_serial_replay() -> Result<()> {
    let pool: Vec<ProtocolId> = (0..24).map(|i| ProtocolId::from(format!("/p/{i}"))).collect();
    let plans: Vec<Vec<Op>> = (0..THREADS).map(|w| random_ops(w, &pool)).collect();

    let concurrent = book_with_limit(10)?;
    thread::scope(|s| {
        for plan in &plans {
            let book = &concurrent;
            s.spawn(move || {
                for op in plan {
                    apply(book, op);
                }
            });
        }
    });

    let serial = book_with_limit(10)?;
    for plan in &plans {
        for op in plan {
            apply(&serial, op);
        }
    }

    for n in 0..THREADS * PEERS_PER_THREAD {
        let p = peer(n);
        assert_eq!(
            as_set(concurrent.protocols(&p)),
            as_set(serial.protocols(&p)),
            "peer {n} diverged from serial replay"
        );
    }
    for proto in &pool {
        let got = concurrent.peers_for_protocol(proto).map(peer_set).ok();
        let want = serial.peers_for_protocol(proto).map(peer_set).ok();
        assert_eq!(got, want, "reverse entry {proto} diverged");
    }
    concurrent
        .check_consistency()
        .context("concurrent book inconsistent")?;
    serial.check_consistency().context("serial book inconsistent")?;
    Ok(())
}

/// Many writers on one peer: once they stop, both indices agree.
#[test]
fn test_same_peer_contention_settles_consistent() -> Result<()> {
    let book = MemoryProtoBook::new();
    let target = peer(9_999);
    let pool: Vec<ProtocolId> = (0..6).map(|i| ProtocolId::from(format!("/hot/{i}"))).collect();

    thread::scope(|s| {
        for w in 0..THREADS {
            let book = &book;
            let pool = &pool;
            s.spawn(move || {
                let mut rng = StdRng::seed_from_u64(u64::from(w));
                for _ in 0..OPS_PER_THREAD {
                    let proto = pool[rng.gen_range(0..pool.len())].clone();
                    match rng.gen_range(0..4) {
                        0 => {
                            book.add_protocols(&target, &[proto]).unwrap();
                        }
                        1 => book.remove_protocols(&target, &[proto]),
                        2 => book.set_protocols(&target, &[proto]).unwrap(),
                        _ => book.remove_peer(&target),
                    }
                }
            });
        }
    });

    book.check_consistency()
        .context("indices disagree after same-peer contention")?;
    Ok(())
}

/// Readers running against writers only ever see real peers.
#[test]
fn test_readers_during_writes_see_valid_peers() -> Result<()> {
    let book = MemoryProtoBook::new();
    let proto = ProtocolId::from("/shared/1.0.0");
    let writers: Vec<PeerId> = (0..64).map(peer).collect();
    let known: HashSet<PeerId> = writers.iter().copied().collect();
    let done = AtomicBool::new(false);

    book.add_protocols(&writers[0], &[proto.clone()])?;

    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut reads = 0usize;
            loop {
                for p in book.peers_for_protocol(&proto).unwrap() {
                    assert!(known.contains(&p), "reader saw an unknown peer");
                }
                reads += 1;
                if done.load(Ordering::Acquire) {
                    break reads;
                }
            }
        });

        let handles: Vec<_> = writers
            .chunks(16)
            .map(|chunk| {
                let (book, proto) = (&book, &proto);
                s.spawn(move || {
                    for _ in 0..200 {
                        for p in chunk {
                            book.add_protocols(p, &[proto.clone()]).unwrap();
                            book.remove_peer(p);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);
    });

    assert_eq!(book.stats().peers, 0);
    book.check_consistency()?;
    Ok(())
}

//! Randomized workload against a shared book, checked against a serial model.
//!
//! Each worker owns a disjoint set of peers. It applies random operations to
//! the shared book and replays the same operations, in the same order, onto a
//! private model. Because no other worker touches its peers, the model is an
//! exact serialized replay of what the book must hold for them afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use protobook_core::config::StressConfig;
use protobook_core::{PeerId, ProtoBook, ProtocolId};
use protobook_store::MemoryProtoBook;

#[derive(Debug, Clone)]
pub enum Op {
    Set(Vec<ProtocolId>),
    Add(Vec<ProtocolId>),
    Remove(Vec<ProtocolId>),
    RemovePeer,
    Query(Vec<ProtocolId>),
}

/// Serial reference for one worker's peers.
#[derive(Debug, Default)]
pub struct Model {
    max_protocols: usize,
    peers: HashMap<PeerId, HashSet<ProtocolId>>,
}

impl Model {
    pub fn new(max_protocols: usize) -> Self {
        Self {
            max_protocols,
            peers: HashMap::new(),
        }
    }

    /// Apply `op`. Returns whether a capacity-checked write was accepted.
    pub fn apply(&mut self, peer: PeerId, op: &Op) -> bool {
        match op {
            Op::Set(protos) => {
                if protos.len() > self.max_protocols {
                    return false;
                }
                self.peers.insert(peer, protos.iter().cloned().collect());
            }
            Op::Add(protos) => {
                let mut union = self.peers.get(&peer).cloned().unwrap_or_default();
                union.extend(protos.iter().cloned());
                if union.len() > self.max_protocols {
                    return false;
                }
                self.peers.insert(peer, union);
            }
            Op::Remove(protos) => {
                if let Some(set) = self.peers.get_mut(&peer) {
                    for p in protos {
                        set.remove(p);
                    }
                }
            }
            Op::RemovePeer => {
                self.peers.remove(&peer);
            }
            Op::Query(_) => {}
        }
        true
    }

    pub fn protocols(&self, peer: &PeerId) -> HashSet<ProtocolId> {
        self.peers.get(peer).cloned().unwrap_or_default()
    }
}

/// Outcome of one worker.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub ops: usize,
    pub rejected: usize,
}

pub fn protocol_pool(size: usize) -> Vec<ProtocolId> {
    (0..size.max(1))
        .map(|i| ProtocolId::from(format!("/stress/{i}/1.0.0")))
        .collect()
}

pub fn worker_peers(worker: usize, count: usize) -> Vec<PeerId> {
    (0..count)
        .map(|i| PeerId::from_public_key(format!("worker-{worker}-peer-{i}").as_bytes()))
        .collect()
}

fn random_op(rng: &mut StdRng, pool: &[ProtocolId]) -> Op {
    let pick = |rng: &mut StdRng| -> Vec<ProtocolId> {
        let n = rng.gen_range(0..=pool.len().min(8));
        (0..n).map(|_| pool[rng.gen_range(0..pool.len())].clone()).collect()
    };
    match rng.gen_range(0..100) {
        0..=19 => Op::Set(pick(rng)),
        20..=49 => Op::Add(pick(rng)),
        50..=69 => Op::Remove(pick(rng)),
        70..=74 => Op::RemovePeer,
        _ => Op::Query(pick(rng)),
    }
}

/// Run one worker's share: apply to the book and the model in lockstep,
/// then compare the final state of every owned peer.
pub fn run_worker(
    book: &MemoryProtoBook,
    worker: usize,
    seed: u64,
    config: &StressConfig,
) -> Result<WorkerReport> {
    let mut rng = StdRng::seed_from_u64(seed ^ worker as u64);
    let pool = protocol_pool(config.protocol_pool);
    let peers = worker_peers(worker, config.peers_per_thread.max(1));
    let mut model = Model::new(book.max_protocols());
    let mut report = WorkerReport::default();

    for _ in 0..config.ops_per_thread {
        let peer = peers[rng.gen_range(0..peers.len())];
        let op = random_op(&mut rng, &pool);

        let accepted = match &op {
            Op::Set(protos) => book.set_protocols(&peer, protos).is_ok(),
            Op::Add(protos) => book.add_protocols(&peer, protos).is_ok(),
            Op::Remove(protos) => {
                book.remove_protocols(&peer, protos);
                true
            }
            Op::RemovePeer => {
                book.remove_peer(&peer);
                true
            }
            Op::Query(protos) => {
                let supported = book.supports_protocols(&peer, protos);
                let first = book.first_supported_protocol(&peer, protos);
                if first.as_ref() != supported.first() {
                    bail!("worker {worker}: first_supported disagrees with supports_protocols");
                }
                true
            }
        };

        if accepted != model.apply(peer, &op) {
            bail!("worker {worker}: book and model disagree on accepting {op:?}");
        }
        if !accepted {
            report.rejected += 1;
        }
        report.ops += 1;
    }

    for peer in &peers {
        let got: HashSet<ProtocolId> = book.protocols(peer).into_iter().collect();
        let want = model.protocols(peer);
        if got != want {
            bail!(
                "worker {worker}: peer {} holds {} protocols, expected {}",
                peer.short(),
                got.len(),
                want.len()
            );
        }
        for proto in &want {
            if !book.peers_for_protocol(proto)?.contains(peer) {
                bail!("worker {worker}: peer {} missing from reverse entry {proto}", peer.short());
            }
        }
    }

    Ok(report)
}

/// Run every worker on its own thread against one shared book.
pub fn run(
    book: Arc<MemoryProtoBook>,
    threads: usize,
    seed: u64,
    config: &StressConfig,
) -> Result<WorkerReport> {
    let results: Vec<Result<WorkerReport>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let book = Arc::clone(&book);
                s.spawn(move || run_worker(&book, worker, seed, config))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err(anyhow!("worker thread panicked"))))
            .collect()
    });

    let mut total = WorkerReport::default();
    for result in results {
        let report = result?;
        total.ops += report.ops;
        total.rejected += report.rejected;
    }
    book.check_consistency()?;
    Ok(total)
}

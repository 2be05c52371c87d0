/// Cluster transport (spec §4.6, supplemented).
///
/// The original C source runs each rank as a separate MPI process and
/// merges Best-K registers with `MPI_Allreduce`-style collectives. No MPI
/// binding exists anywhere in this crate's dependency pack, so this module
/// defines a small `Transport` trait instead of fabricating one: a no-op
/// `SingleProcess` for the common `R=1` case, and a `TcpTransport` that
/// does the same rendezvous over plain loopback/LAN sockets, serialized
/// with `serde_json` (already a teacher dependency, see `numerical/opt/de.rs`'s
/// use of `serde_json::to_value`).
use crate::bestk::BestK;
use crate::error::CalibError;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

/// How long the cluster leader waits for all followers to report before
/// merging with whatever arrived (spec §7: "non-root ranks failing to send
/// leave the root to proceed with whatever it has, which may omit some
/// candidates").
const FOLLOWER_ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

pub trait Transport: Send + Sync {
    fn rank(&self) -> usize;
    fn ranks(&self) -> usize;

    /// Combines every rank's local Best-K into the run-wide Best-K, bounded
    /// to `nbests`. Every rank receives the same merged result (spec §4.6:
    /// "ranks merge their local Best-K registers into one list").
    fn merge_bestk(&self, local: BestK, nbests: usize) -> Result<BestK, CalibError>;
}

/// `R = 1`: merging is a no-op, there is nothing else to merge with.
pub struct SingleProcess;

impl Transport for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn ranks(&self) -> usize {
        1
    }

    fn merge_bestk(&self, local: BestK, _nbests: usize) -> Result<BestK, CalibError> {
        Ok(local)
    }
}

#[derive(Serialize, Deserialize)]
struct WireEntry {
    candidate: usize,
    score: f64,
}

fn to_wire(best: &BestK) -> Vec<WireEntry> {
    best.entries()
        .iter()
        .map(|e| WireEntry {
            candidate: e.candidate,
            score: e.score,
        })
        .collect()
}

fn from_wire(entries: Vec<WireEntry>, nbests: usize) -> BestK {
    let mut best = BestK::new(nbests.max(1));
    for e in entries {
        best.offer(e.candidate, e.score);
    }
    best
}

/// Rendezvous over TCP: rank 0 listens and collects every other rank's
/// local Best-K, merges them all, then broadcasts the merged result back.
/// Peer addresses are supplied once at construction (spec leaves launch
/// topology external to the engine, mirroring how `mpirun` assigns ranks
/// for the original C source).
pub struct TcpTransport {
    rank: usize,
    ranks: usize,
    /// Only meaningful on rank 0: the address each other rank will dial.
    listen_addr: Option<String>,
    /// Only meaningful on ranks > 0: rank 0's address.
    leader_addr: Option<String>,
}

impl TcpTransport {
    pub fn leader(listen_addr: impl Into<String>, ranks: usize) -> Self {
        Self {
            rank: 0,
            ranks,
            listen_addr: Some(listen_addr.into()),
            leader_addr: None,
        }
    }

    pub fn follower(rank: usize, ranks: usize, leader_addr: impl Into<String>) -> Self {
        Self {
            rank,
            ranks,
            listen_addr: None,
            leader_addr: Some(leader_addr.into()),
        }
    }
}

impl Transport for TcpTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn ranks(&self) -> usize {
        self.ranks
    }

    fn merge_bestk(&self, local: BestK, nbests: usize) -> Result<BestK, CalibError> {
        if self.rank == 0 {
            self.merge_as_leader(local, nbests)
        } else {
            self.merge_as_follower(local, nbests)
        }
    }
}

impl TcpTransport {
    fn merge_as_leader(&self, local: BestK, nbests: usize) -> Result<BestK, CalibError> {
        let addr = self
            .listen_addr
            .as_deref()
            .ok_or_else(|| CalibError::Internal("cluster leader has no listen address".to_string()))?;
        let listener = TcpListener::bind(addr)
            .map_err(|e| CalibError::Internal(format!("failed to bind cluster leader socket on '{}': {}", addr, e)))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| CalibError::Internal(format!("failed to configure cluster leader socket: {}", e)))?;

        let mut merged = local;
        let followers_expected = self.ranks.saturating_sub(1);
        let mut streams = Vec::with_capacity(followers_expected);
        let deadline = Instant::now() + FOLLOWER_ACCEPT_TIMEOUT;

        // Bounded by a deadline rather than a blocking `accept` per follower,
        // so a stuck or crashed follower cannot hang the leader forever
        // (spec §7: the root proceeds with whatever it has).
        while streams.len() < followers_expected && Instant::now() < deadline {
            match listener.accept() {
                Ok((stream, _)) => match read_entries(&stream) {
                    Ok(entries) => {
                        merged.merge(&from_wire(entries, nbests));
                        streams.push(stream);
                    }
                    Err(e) => {
                        log::warn!("cluster leader: discarding a follower that failed to report its Best-K: {}", e);
                    }
                },
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    log::warn!("cluster leader: accept failed: {}", e);
                    break;
                }
            }
        }

        if streams.len() < followers_expected {
            log::warn!(
                "cluster leader: proceeding with {}/{} followers reporting",
                streams.len(),
                followers_expected
            );
        }

        let payload = serde_json::to_vec(&to_wire(&merged))
            .map_err(|e| CalibError::Internal(format!("failed to encode merged Best-K: {}", e)))?;
        for mut stream in streams {
            let _ = stream.write_all(&payload);
        }
        Ok(merged)
    }

    fn merge_as_follower(&self, local: BestK, nbests: usize) -> Result<BestK, CalibError> {
        let addr = self
            .leader_addr
            .as_deref()
            .ok_or_else(|| CalibError::Internal("cluster follower has no leader address".to_string()))?;
        let mut stream = TcpStream::connect(addr)
            .map_err(|e| CalibError::Internal(format!("failed to connect to cluster leader at '{}': {}", addr, e)))?;
        let payload = serde_json::to_vec(&to_wire(&local))
            .map_err(|e| CalibError::Internal(format!("failed to encode local Best-K: {}", e)))?;
        stream
            .write_all(&payload)
            .map_err(|e| CalibError::Internal(format!("failed to send local Best-K to cluster leader: {}", e)))?;
        stream.shutdown(std::net::Shutdown::Write).ok();

        let entries = read_entries(&stream)
            .map_err(|e| CalibError::Internal(format!("failed to read merged Best-K from cluster leader: {}", e)))?;
        Ok(from_wire(entries, nbests))
    }
}

fn read_entries(stream: &TcpStream) -> Result<Vec<WireEntry>, String> {
    let cloned = stream
        .try_clone()
        .map_err(|e| format!("failed to clone socket: {}", e))?;
    let reader = BufReader::new(cloned);
    serde_json::from_reader(reader).map_err(|e| format!("failed to decode Best-K payload: {}", e))
}

//! The multi-producer decode pipeline (§4.6): several threads race to
//! claim and decompress containers while a single consumer thread drains
//! them, in file order, off a [`RingBuffer`].

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::container::{self, NO_COMPRESSION, ZLIB_DEFLATE};
use crate::error::{BlfError, BlfResult};
use crate::object_header::{BaseHeader, BASE_HEADER_SIZE};
use crate::object_type::ObjectType;
use crate::reframe::{drain_ring, FrameSink};
use crate::ring_buffer::RingBuffer;

/// `compression_method(u32) + uncompressed_size_hint(u32)`.
const CONTAINER_SUBHEADER_SIZE: usize = 8;

/// Tuning knobs for [`PipelineDriver`]. `ring_capacity` bounds memory use
/// independent of file size; `producers` bounds decompression
/// parallelism.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ring_capacity: usize,
    pub producers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 10 * 1024 * 1024,
            producers: 4,
        }
    }
}

struct SharedState {
    file_position: u64,
    next_seq: u64,
}

/// Runs the producer/consumer decode pipeline against a file path.
/// Producer threads race to claim and decompress containers, feeding the
/// decompressed payloads into a [`RingBuffer`] in file order; one
/// consumer thread drains the ring through the reframer (§4.3.1) and
/// feeds decoded envelopes to `sink`. Call [`PipelineDriver::abort`] to
/// stop early.
pub struct PipelineDriver<S> {
    ring: Arc<RingBuffer>,
    abort: Arc<AtomicBool>,
    producers: Vec<thread::JoinHandle<BlfResult<()>>>,
    consumer: thread::JoinHandle<(S, BlfResult<()>)>,
}

impl<S: FrameSink + Send + 'static> PipelineDriver<S> {
    /// Spawns `config.producers` producer threads against `path`, each
    /// with its own file handle, sharing `file_position`/`next_seq`
    /// bookkeeping under one mutex, plus one consumer thread that drains
    /// the ring into `sink`. Container bodies start at `start_offset`
    /// (the byte just past the file header).
    pub fn spawn(path: &Path, start_offset: u64, config: &PipelineConfig, sink: S) -> BlfResult<Self> {
        let ring = Arc::new(RingBuffer::new(config.ring_capacity));
        let abort = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(SharedState {
            file_position: start_offset,
            next_seq: 0,
        }));

        let mut producers = Vec::with_capacity(config.producers);
        for _ in 0..config.producers.max(1) {
            let ring = ring.clone();
            let abort = abort.clone();
            let state = state.clone();
            let path: PathBuf = path.to_path_buf();
            producers.push(thread::spawn(move || producer_loop(&path, state, ring, abort)));
        }

        let consumer = {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut sink = sink;
                let result = drain_ring(&ring, &mut sink);
                (sink, result)
            })
        };

        Ok(Self {
            ring,
            abort,
            producers,
            consumer,
        })
    }

    pub fn ring(&self) -> Arc<RingBuffer> {
        self.ring.clone()
    }

    /// Stops the pipeline early: producers give up between containers,
    /// and the ring is closed immediately so any producer or the
    /// consumer currently blocked waiting on it unblocks rather than
    /// hanging on work that will never arrive.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
        self.ring.close();
    }

    /// Waits for every producer to finish, then closes the ring and
    /// waits for the consumer, handing back the sink and the first error
    /// any producer or the consumer hit.
    pub fn join(self) -> (S, BlfResult<()>) {
        let mut first_err = None;
        for handle in self.producers {
            match handle.join().expect("producer thread panicked") {
                Ok(()) => {}
                Err(e) if first_err.is_none() => first_err = Some(e),
                Err(_) => {}
            }
        }
        // Only safe to close here, after every producer is done writing;
        // closing earlier would drop in-flight container payloads.
        self.ring.close();
        let (sink, consumer_result) = self.consumer.join().expect("consumer thread panicked");

        let result = match (first_err, consumer_result) {
            (Some(e), _) => Err(e),
            (None, Err(e)) => Err(e),
            (None, Ok(())) => Ok(()),
        };
        (sink, result)
    }
}

fn producer_loop(
    path: &Path,
    state: Arc<Mutex<SharedState>>,
    ring: Arc<RingBuffer>,
    abort: Arc<AtomicBool>,
) -> BlfResult<()> {
    let result = run_producer(path, &state, &ring, &abort);
    if result.is_err() {
        // A sibling producer may be blocked waiting for this producer's
        // turn in the ring, which will now never come; wake it so the
        // whole pipeline can unwind instead of deadlocking.
        ring.close();
    }
    result
}

fn run_producer(
    path: &Path,
    state: &Mutex<SharedState>,
    ring: &RingBuffer,
    abort: &AtomicBool,
) -> BlfResult<()> {
    let mut file = File::open(path).map_err(|e| BlfError::Io { offset: 0, source: e })?;

    loop {
        if abort.load(Ordering::SeqCst) {
            return Ok(());
        }

        let claim = claim_next_container(&mut file, state)?;
        let (seq, base, start_offset) = match claim {
            Some(c) => c,
            None => return Ok(()),
        };

        // Outside the lock: this producer's file handle is already
        // positioned right after the base header of the container it
        // just claimed; finish reading and decompressing independently
        // of the other producers.
        let subheader_offset = start_offset + BASE_HEADER_SIZE as u64;
        let mut subheader = [0u8; CONTAINER_SUBHEADER_SIZE];
        file.read_exact(&mut subheader)
            .map_err(|e| BlfError::Io { offset: subheader_offset, source: e })?;
        let compression_method = u16::from_le_bytes([subheader[0], subheader[1]]);
        let hint = u32::from_le_bytes([subheader[4], subheader[5], subheader[6], subheader[7]]) as usize;

        let payload_size = (base.object_size as usize)
            .saturating_sub(base.header_size as usize)
            .saturating_sub(CONTAINER_SUBHEADER_SIZE);
        let payload_offset = subheader_offset + CONTAINER_SUBHEADER_SIZE as u64;
        let mut compressed = vec![0u8; payload_size];
        file.read_exact(&mut compressed)
            .map_err(|e| BlfError::Io { offset: payload_offset, source: e })?;

        if !matches!(compression_method, NO_COMPRESSION | ZLIB_DEFLATE) {
            return Err(BlfError::UnsupportedCompression {
                offset: payload_offset,
                method: compression_method,
            });
        }
        let decompressed = container::decompress(compression_method, &compressed, hint, payload_offset)?;

        ring.write(seq, &decompressed)?;
    }
}

/// Claims the next container under `state`'s lock: seeks to the shared
/// file position, reads the base header, validates it, advances the
/// shared position past the whole container (so other producers claim
/// the next one), and captures this producer's sequence number. Leaves
/// `file` positioned right after the base header it just read. Returns
/// `None` at clean end of file.
fn claim_next_container(
    file: &mut File,
    state: &Mutex<SharedState>,
) -> BlfResult<Option<(u64, BaseHeader, u64)>> {
    let mut guard = state.lock().unwrap();
    let start_offset = guard.file_position;

    file.seek(SeekFrom::Start(start_offset))
        .map_err(|e| BlfError::Io { offset: start_offset, source: e })?;
    let mut header_bytes = [0u8; BASE_HEADER_SIZE];
    let got = read_fill(file, &mut header_bytes, start_offset)?;
    if got == 0 {
        return Ok(None);
    }
    if got < BASE_HEADER_SIZE {
        return Err(BlfError::Truncated {
            offset: start_offset,
            what: "base object header",
            needed: BASE_HEADER_SIZE,
            got,
        });
    }

    let base = BaseHeader::parse(&header_bytes, start_offset)?;
    if base.object_type != ObjectType::LogContainer {
        return Err(BlfError::MalformedObject {
            offset: start_offset,
            what: "outer object",
            reason: "obj_type is not LOG_CONTAINER",
        });
    }

    let advance = base.object_size as u64 + (base.object_size as u64 % 4);
    guard.file_position = start_offset + advance;
    let seq = guard.next_seq;
    guard.next_seq += 1;

    Ok(Some((seq, base, start_offset)))
}

/// Like `Read::read_exact` but treats a clean zero-byte read as success
/// rather than an error, returning how many bytes were actually filled.
fn read_fill(file: &mut File, buf: &mut [u8], offset: u64) -> BlfResult<usize> {
    let mut got = 0;
    while got < buf.len() {
        match file.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(BlfError::Io { offset: offset + got as u64, source: e }),
        }
    }
    Ok(got)
}

//! # Chunk Pipeline
//!
//! Drives chunks through `Unloaded → Generated → Populated`.
//!
//! ## Ordering
//!
//! A chunk is populated only once its 8 neighbours are generated, since
//! decorations spill across borders. Population runs against a copy of the
//! 3x3 neighbourhood, which is committed back only if the whole attempt
//! succeeds.
//!
//! ## Parallelism
//!
//! Generation is pure, so batches fan out over a pool of scoped workers fed
//! by a crossbeam queue. Population runs in waves of chunks at least 3
//! chunks apart, so their neighbourhoods never overlap.
//!
//! ## Timeouts
//!
//! Every chunk task runs under a [`RetryPolicy`]: an attempt that overruns
//! is abandoned and retried, up to a fixed number of attempts.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError};
use tracing::{debug, trace, warn};

use crate::chunk::{Chunk, ChunkCoord, ChunkManager, SimpleChunkManager};
use crate::error::{WorldGenError, WorldGenResult};
use crate::generator::Generator;

/// Lifecycle of a chunk. Transitions only move forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Not generated yet.
    #[default]
    Unloaded,
    /// Terrain exists; no decorations yet.
    Generated,
    /// Terrain and decorations exist.
    Populated,
}

/// How long a chunk task may run and how often it is retried.
///
/// ## Abandoned attempts
///
/// Threads cannot be cancelled. An attempt that overruns keeps running on
/// its detached thread until it returns, and keeps whatever the task
/// captured alive until then; a population attempt holds its own copy of
/// the 3x3 snapshot. A task that never returns pins up to `max_attempts`
/// threads, and their snapshots, per chunk for the rest of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Limit per attempt. `None` runs the task inline with no limit.
    pub timeout: Option<Duration>,
    /// Attempts before giving up on a task that keeps timing out.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(5)),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// No timeout: tasks run on the calling thread.
    #[must_use]
    pub const fn inline() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
        }
    }

    /// Runs `task` for the chunk at `coord` under this policy.
    ///
    /// With a timeout, each attempt runs on its own thread. An attempt that
    /// overruns is left to finish in the background and its result is
    /// discarded, so `task` must not have side effects outside its return
    /// value. See [abandoned attempts](Self#abandoned-attempts).
    ///
    /// # Errors
    ///
    /// `ChunkTaskTimedOut` when every attempt overruns, `ChunkWorkerLost` if
    /// the task panics, or the task's own error, returned without retry.
    pub fn run<T, F>(&self, coord: ChunkCoord, task: F) -> WorldGenResult<T>
    where
        T: Send + 'static,
        F: Fn() -> WorldGenResult<T> + Send + Sync + 'static,
    {
        let Some(timeout) = self.timeout else {
            return task();
        };

        let task = Arc::new(task);
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            let (sender, receiver) = bounded(1);
            let job = Arc::clone(&task);
            thread::Builder::new()
                .name(format!("chunk-task {coord}"))
                .spawn(move || {
                    let _ = sender.send(job());
                })?;

            match receiver.recv_timeout(timeout) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(%coord, attempt, attempts, ?timeout, "chunk task timed out");
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(WorldGenError::ChunkWorkerLost(coord));
                }
            }
        }
        Err(WorldGenError::ChunkTaskTimedOut { coord, attempts })
    }
}

/// Runs `task` over `items` on up to `workers` scoped threads.
///
/// Results come back in input order.
fn run_parallel<T, R, F>(workers: usize, items: Vec<T>, task: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = items.len();
    if workers <= 1 || count <= 1 {
        return items.into_iter().map(task).collect();
    }

    let (job_sender, job_receiver) = unbounded();
    for job in items.into_iter().enumerate() {
        let _ = job_sender.send(job);
    }
    drop(job_sender);

    let (result_sender, result_receiver) = unbounded();
    thread::scope(|scope| {
        let task = &task;
        for _ in 0..workers.min(count) {
            let jobs = job_receiver.clone();
            let results = result_sender.clone();
            scope.spawn(move || {
                while let Ok((index, item)) = jobs.recv() {
                    let _ = results.send((index, task(item)));
                }
            });
        }
    });
    drop(result_sender);

    let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
    for (index, result) in result_receiver.try_iter() {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}

/// Drops repeated coordinates, keeping first occurrences in order.
fn dedup(coords: impl IntoIterator<Item = ChunkCoord>) -> Vec<ChunkCoord> {
    let mut seen = HashSet::new();
    coords.into_iter().filter(|c| seen.insert(*c)).collect()
}

/// Splits `coords` into groups whose members are more than 2 chunks apart.
fn waves(coords: &[ChunkCoord]) -> Vec<Vec<ChunkCoord>> {
    let mut waves: Vec<Vec<ChunkCoord>> = Vec::new();
    for &coord in coords {
        let free = waves
            .iter_mut()
            .find(|wave| wave.iter().all(|other| other.chebyshev_distance(coord) > 2));
        match free {
            Some(wave) => wave.push(coord),
            None => waves.push(vec![coord]),
        }
    }
    waves
}

/// Generates one chunk under `policy`.
fn generate_task(
    generator: &Arc<dyn Generator>,
    policy: RetryPolicy,
    coord: ChunkCoord,
) -> WorldGenResult<Chunk> {
    coord.check_generatable()?;
    let generator = Arc::clone(generator);
    trace!(%coord, generator = generator.name(), "generating chunk");
    policy.run(coord, move || generator.generate_chunk(coord))
}

/// Populates one chunk against its neighbourhood snapshot under `policy`.
fn populate_task(
    generator: &Arc<dyn Generator>,
    policy: RetryPolicy,
    coord: ChunkCoord,
    snapshot: SimpleChunkManager,
) -> WorldGenResult<SimpleChunkManager> {
    let generator = Arc::clone(generator);
    trace!(%coord, generator = generator.name(), "populating chunk");
    policy.run(coord, move || {
        // Each attempt starts from a clean copy
        let mut world = snapshot.clone();
        generator.populate_chunk(&mut world, coord)?;
        Ok(world)
    })
}

/// Owns a world accessor and moves its chunks through generation and population.
pub struct ChunkPipeline<W: ChunkManager> {
    generator: Arc<dyn Generator>,
    world: W,
    states: HashMap<ChunkCoord, ChunkState>,
    policy: RetryPolicy,
    workers: usize,
}

impl<W: ChunkManager> ChunkPipeline<W> {
    /// Creates a pipeline. `workers` is clamped to at least 1.
    pub fn new(
        generator: Arc<dyn Generator>,
        world: W,
        policy: RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            generator,
            world,
            states: HashMap::new(),
            policy,
            workers: workers.max(1),
        }
    }

    /// Current state of a chunk.
    #[must_use]
    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        self.states.get(&coord).copied().unwrap_or_default()
    }

    /// The generator.
    #[must_use]
    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    /// The world accessor.
    #[must_use]
    pub fn world(&self) -> &W {
        &self.world
    }

    /// The world accessor, mutably. Chunk states are not affected.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Consumes the pipeline, returning the world accessor.
    pub fn into_world(self) -> W {
        self.world
    }

    /// The retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Worker thread count.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    fn commit_generated(&mut self, chunk: Chunk) {
        self.states.insert(chunk.coord(), ChunkState::Generated);
        self.world.set_chunk(chunk);
    }

    /// Generates one chunk.
    ///
    /// # Errors
    ///
    /// `AlreadyGenerated` if the chunk is past `Unloaded`, `ChunkOutOfRange`
    /// past [`ChunkCoord::GENERATION_LIMIT`], or the generation error.
    pub fn generate(&mut self, coord: ChunkCoord) -> WorldGenResult<()> {
        if self.state(coord) != ChunkState::Unloaded {
            return Err(WorldGenError::AlreadyGenerated(coord));
        }
        let chunk = generate_task(&self.generator, self.policy, coord)?;
        self.commit_generated(chunk);
        Ok(())
    }

    /// Generates every unloaded chunk in `coords` in parallel.
    ///
    /// Chunks that are already generated and repeated coordinates are
    /// skipped. Successful chunks are written in input order even if
    /// another one fails.
    ///
    /// # Errors
    ///
    /// The first failure, in input order.
    pub fn generate_batch(
        &mut self,
        coords: impl IntoIterator<Item = ChunkCoord>,
    ) -> WorldGenResult<usize> {
        let pending: Vec<_> = dedup(coords)
            .into_iter()
            .filter(|c| self.state(*c) == ChunkState::Unloaded)
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }
        debug!(chunks = pending.len(), workers = self.workers, "generating batch");

        let (generator, policy) = (&self.generator, self.policy);
        let results = run_parallel(self.workers, pending, |coord| {
            generate_task(generator, policy, coord)
        });

        let mut generated = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(chunk) => {
                    self.commit_generated(chunk);
                    generated += 1;
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(generated), Err)
    }

    /// Checks that `coord` may be populated now.
    fn check_populate(&self, coord: ChunkCoord) -> WorldGenResult<()> {
        coord.check_populatable()?;
        match self.state(coord) {
            ChunkState::Unloaded => return Err(WorldGenError::ChunkNotGenerated(coord)),
            ChunkState::Populated => return Err(WorldGenError::AlreadyPopulated(coord)),
            ChunkState::Generated => {}
        }
        match coord
            .neighbours()
            .find(|n| self.state(*n) == ChunkState::Unloaded)
        {
            Some(neighbour) => Err(WorldGenError::NeighbourNotGenerated { coord, neighbour }),
            None => Ok(()),
        }
    }

    /// Copies the 3x3 neighbourhood of `coord` out of the world.
    fn snapshot(&self, coord: ChunkCoord) -> WorldGenResult<SimpleChunkManager> {
        let mut snapshot = SimpleChunkManager::new();
        for c in coord.neighbourhood() {
            let chunk = self.world.chunk(c).ok_or(WorldGenError::ChunkNotLoaded(c))?;
            snapshot.set_chunk(chunk.clone());
        }
        Ok(snapshot)
    }

    fn commit_populated(&mut self, coord: ChunkCoord, snapshot: SimpleChunkManager) {
        for chunk in snapshot.into_chunks() {
            self.world.set_chunk(chunk);
        }
        self.states.insert(coord, ChunkState::Populated);
    }

    /// Populates one chunk.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` past [`ChunkCoord::POPULATION_LIMIT`];
    /// `ChunkNotGenerated`, `AlreadyPopulated` or `NeighbourNotGenerated` if
    /// the chunk is not ready, or the population error. On error the world
    /// is left untouched.
    pub fn populate(&mut self, coord: ChunkCoord) -> WorldGenResult<()> {
        self.check_populate(coord)?;
        let snapshot = self.snapshot(coord)?;
        let populated = populate_task(&self.generator, self.policy, coord, snapshot)?;
        self.commit_populated(coord, populated);
        Ok(())
    }

    /// Populates every chunk in `coords`, in parallel waves.
    ///
    /// Every chunk is checked before any is populated.
    ///
    /// # Errors
    ///
    /// The first readiness error, before anything runs. Otherwise the first
    /// population failure; waves after the failing one are not run.
    pub fn populate_batch(
        &mut self,
        coords: impl IntoIterator<Item = ChunkCoord>,
    ) -> WorldGenResult<usize> {
        let coords = dedup(coords);
        for &coord in &coords {
            self.check_populate(coord)?;
        }

        let mut populated = 0;
        for wave in waves(&coords) {
            debug!(chunks = wave.len(), "populating wave");
            let jobs = wave
                .into_iter()
                .map(|coord| self.snapshot(coord).map(|snapshot| (coord, snapshot)))
                .collect::<WorldGenResult<Vec<_>>>()?;

            let (generator, policy) = (&self.generator, self.policy);
            let results = run_parallel(self.workers, jobs, |(coord, snapshot)| {
                (coord, populate_task(generator, policy, coord, snapshot))
            });

            let mut first_error = None;
            for (coord, result) in results {
                match result {
                    Ok(snapshot) => {
                        self.commit_populated(coord, snapshot);
                        populated += 1;
                    }
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }
        }
        Ok(populated)
    }

    /// Makes a chunk fully ready: generates its missing neighbourhood, then
    /// populates it unless that already happened.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` past [`ChunkCoord::POPULATION_LIMIT`], before
    /// anything is generated. Otherwise any generation or population error.
    pub fn request(&mut self, coord: ChunkCoord) -> WorldGenResult<()> {
        coord.check_populatable()?;
        self.generate_batch(coord.neighbourhood())?;
        if self.state(coord) != ChunkState::Populated {
            self.populate(coord)?;
        }
        Ok(())
    }

    /// [`request`](Self::request) for many chunks, batched.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` if any chunk is past the border, before anything
    /// is generated. Otherwise any generation or population error.
    pub fn request_area(
        &mut self,
        coords: impl IntoIterator<Item = ChunkCoord>,
    ) -> WorldGenResult<usize> {
        let coords = dedup(coords);
        for coord in &coords {
            coord.check_populatable()?;
        }
        self.generate_batch(coords.iter().flat_map(|c| c.neighbourhood()))?;
        let pending: Vec<_> = coords
            .into_iter()
            .filter(|c| self.state(*c) != ChunkState::Populated)
            .collect();
        self.populate_batch(pending)
    }
}

impl<W: ChunkManager + fmt::Debug> fmt::Debug for ChunkPipeline<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPipeline")
            .field("generator", &self.generator.name())
            .field("world", &self.world)
            .field("chunks", &self.states.len())
            .field("policy", &self.policy)
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[test]
    fn test_inline_policy_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = RetryPolicy::inline().run(ChunkCoord::new(0, 0), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timeout_is_retried_then_reported() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = RetryPolicy {
            timeout: Some(Duration::from_millis(20)),
            max_attempts: 3,
        };
        let coord = ChunkCoord::new(1, 2);

        let start = Instant::now();
        let result: WorldGenResult<()> = policy.run(coord, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });

        assert_eq!(result, Err(WorldGenError::ChunkTaskTimedOut { coord, attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_slow_first_attempt_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = RetryPolicy {
            timeout: Some(Duration::from_millis(50)),
            max_attempts: 2,
        };

        let result = policy.run(ChunkCoord::new(0, 0), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(400));
            }
            Ok("done")
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_abandoned_attempt_holds_its_task_until_it_returns() {
        let held = Arc::new(());
        let captured = Arc::clone(&held);
        let policy = RetryPolicy {
            timeout: Some(Duration::from_millis(20)),
            max_attempts: 1,
        };
        let coord = ChunkCoord::new(3, 0);

        let result: WorldGenResult<()> = policy.run(coord, move || {
            let _pinned = &captured;
            thread::sleep(Duration::from_millis(300));
            Ok(())
        });
        assert_eq!(result, Err(WorldGenError::ChunkTaskTimedOut { coord, attempts: 1 }));
        // Still referenced by the detached attempt
        assert_eq!(Arc::strong_count(&held), 2);

        let deadline = Instant::now() + Duration::from_secs(5);
        while Arc::strong_count(&held) > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(Arc::strong_count(&held), 1, "finished attempt kept its task alive");
    }

    #[test]
    fn test_task_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let coord = ChunkCoord::new(4, 4);

        let result: WorldGenResult<()> = RetryPolicy::default().run(coord, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(WorldGenError::ChunkNotLoaded(coord))
        });

        assert_eq!(result, Err(WorldGenError::ChunkNotLoaded(coord)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_task_is_a_lost_worker() {
        let coord = ChunkCoord::new(-1, 3);
        let result: WorldGenResult<()> =
            RetryPolicy::default().run(coord, move || panic!("generator bug"));

        assert_eq!(result, Err(WorldGenError::ChunkWorkerLost(coord)));
    }

    #[test]
    fn test_run_parallel_keeps_order() {
        let items: Vec<u32> = (0..100).collect();
        let doubled = run_parallel(4, items, |n| n * 2);

        assert_eq!(doubled, (0..100).map(|n| n * 2).collect::<Vec<_>>());
        assert_eq!(run_parallel(4, Vec::<u32>::new(), |n| n), Vec::<u32>::new());
    }

    #[test]
    fn test_waves_are_disjoint() {
        let coords: Vec<_> = (-3..=3)
            .flat_map(|x| (-3..=3).map(move |z| ChunkCoord::new(x, z)))
            .collect();
        let waves = waves(&coords);

        assert_eq!(waves.iter().map(Vec::len).sum::<usize>(), coords.len());
        for wave in &waves {
            for (i, a) in wave.iter().enumerate() {
                for b in &wave[i + 1..] {
                    assert!(a.chebyshev_distance(*b) > 2, "{a} and {b} overlap");
                }
            }
        }
        assert_eq!(waves.len(), 9);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(1, 0);
        assert_eq!(dedup([a, b, a, b, a]), vec![a, b]);
    }
}

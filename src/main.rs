/*!
 * Coordination Demo - Main Entry Point
 *
 * Runs the classic worker/channel scenarios on top of the toolkit:
 * - ping-pong:   two workers trade values over an unbuffered channel
 * - range:       a producer fills a bounded channel and closes it
 * - directional: send-only and receive-only views of one channel
 * - buffer:      a single worker fills and drains a capacity-2 channel
 * - select:      tick/boom loop with a default branch
 * - counter:     lock-guarded counter joined by a barrier
 * - all:         every scenario in order (default)
 */

use coord_kit::{
    after, init_tracing, Barrier, Channel, CoordError, CoordResult, Lock, Selected, Selector,
    SyncConfig, Ticker, WorkerSpan,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

type Scenario = fn(&SyncConfig) -> CoordResult<()>;

const SCENARIOS: &[(&str, Scenario)] = &[
    ("ping-pong", ping_pong),
    ("range", range_and_close),
    ("directional", directional),
    ("buffer", buffer),
    ("select", tick_boom),
    ("counter", counter),
];

fn main() -> miette::Result<()> {
    init_tracing();

    let config = SyncConfig::from_env();
    info!(strategy = ?config.select_strategy(), "Coordination demo starting");

    let requested = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());

    let selected: Vec<_> = SCENARIOS
        .iter()
        .filter(|(name, _)| requested == "all" || *name == requested)
        .collect();

    if selected.is_empty() {
        let known: Vec<_> = SCENARIOS.iter().map(|(name, _)| *name).collect();
        error!(scenario = %requested, "Unknown scenario");
        return Err(CoordError::Configuration(format!(
            "unknown scenario '{}' (known: {}, all)",
            requested,
            known.join(", ")
        ))
        .into());
    }

    for (name, run) in selected {
        info!(scenario = name, "================================================");
        run(&config)?;
    }

    info!("Coordination demo complete");
    Ok(())
}

/// Join a worker; a worker panic is a broken invariant and takes the demo down
fn join<T>(handle: thread::JoinHandle<CoordResult<T>>) -> CoordResult<T> {
    match handle.join() {
        Ok(result) => result,
        Err(payload) => {
            error!("Worker panicked");
            std::panic::resume_unwind(payload)
        }
    }
}

fn ping_pong(config: &SyncConfig) -> CoordResult<()> {
    let channel = Channel::<i32>::with_config(0, config.clone());
    let barrier = Arc::new(Barrier::new(2));

    let first = {
        let (channel, barrier) = (channel.clone(), barrier.clone());
        thread::spawn(move || -> CoordResult<()> {
            let span = WorkerSpan::new("ping", 1);
            let _entered = span.enter();

            let number = channel.receive().ok_or(CoordError::ClosedChannel)?;
            info!(number, "Received from worker 2");
            channel.send(12)?;
            barrier.done();
            Ok(())
        })
    };

    let second = {
        let (channel, barrier) = (channel.clone(), barrier.clone());
        thread::spawn(move || -> CoordResult<()> {
            let span = WorkerSpan::new("pong", 2);
            let _entered = span.enter();

            channel.send(10)?;
            let data = channel.receive().ok_or(CoordError::ClosedChannel)?;
            info!(data, "Received from worker 1");
            barrier.done();
            Ok(())
        })
    };

    barrier.wait();
    join(first)?;
    join(second)
}

fn range_and_close(config: &SyncConfig) -> CoordResult<()> {
    let channel = Channel::<i32>::with_config(2, config.clone());
    let barrier = Arc::new(Barrier::new(2));

    let consumer = {
        let (rx, barrier) = (channel.receiver(), barrier.clone());
        thread::spawn(move || -> CoordResult<()> {
            for data in rx.iter() {
                info!(data, "Received from producer");
            }
            barrier.done();
            Ok(())
        })
    };

    let producer = {
        let (tx, barrier) = (channel.sender(), barrier.clone());
        thread::spawn(move || -> CoordResult<()> {
            tx.send(10)?;
            tx.send(11)?;
            tx.close()?;
            barrier.done();
            Ok(())
        })
    };

    barrier.wait();
    join(consumer)?;
    join(producer)?;

    let stats = serde_json::to_string(&channel.stats())
        .map_err(|e| CoordError::Configuration(e.to_string()))?;
    info!(%stats, "Channel drained");
    Ok(())
}

fn directional(config: &SyncConfig) -> CoordResult<()> {
    let channel = Channel::<i32>::with_config(2, config.clone());
    let barrier = Arc::new(Barrier::new(2));

    let consumer = {
        let (rx, barrier) = (channel.receiver(), barrier.clone());
        thread::spawn(move || -> CoordResult<()> {
            let (number, ok) = rx.receive_or_default();
            info!(number, ok, "Received from producer");
            barrier.done();
            Ok(())
        })
    };

    let producer = {
        let (tx, barrier) = (channel.sender(), barrier.clone());
        thread::spawn(move || -> CoordResult<()> {
            tx.send(10)?;
            tx.send(11)?;
            barrier.done();
            Ok(())
        })
    };

    barrier.wait();
    join(consumer)?;
    join(producer)?;
    info!(left = channel.len(), "Unreceived values stay buffered");
    Ok(())
}

fn buffer(config: &SyncConfig) -> CoordResult<()> {
    let channel = Channel::with_config(2, config.clone());
    channel.send(1)?;
    channel.send(2)?;
    info!(value = ?channel.receive(), "Received");
    channel.send(3)?;
    info!(value = ?channel.receive(), "Received");
    info!(value = ?channel.receive(), "Received");
    Ok(())
}

fn tick_boom(config: &SyncConfig) -> CoordResult<()> {
    let ticker = Ticker::new(Duration::from_millis(100));
    let tick = ticker.receiver();
    let boom = after(Duration::from_millis(500));

    loop {
        let outcome = Selector::new()
            .recv(&tick, |_| info!("tick."))
            .recv(&boom, |_| info!("BOOM!"))
            .default_case(|| {
                info!("    .");
                thread::sleep(Duration::from_millis(50));
            })
            .with_config(config.clone())
            .select()?;

        if outcome == Selected::Case(1) {
            return Ok(());
        }
    }
}

fn counter(config: &SyncConfig) -> CoordResult<()> {
    let counter = Arc::new(Lock::with_config(0u64, config.clone()));
    let barrier = Arc::new(Barrier::new(0));
    let mut handles = Vec::new();

    for round in 0..10 {
        barrier.add(2);

        let (reader, done) = (counter.clone(), barrier.clone());
        handles.push(thread::spawn(move || -> CoordResult<()> {
            let span = WorkerSpan::new("print", round);
            let _entered = span.enter();
            info!(counter = *reader.lock(), "Counter");
            done.done();
            Ok(())
        }));

        let (writer, done) = (counter.clone(), barrier.clone());
        handles.push(thread::spawn(move || -> CoordResult<()> {
            let span = WorkerSpan::new("increment", round);
            let _entered = span.enter();
            writer.with(|n| *n += 1);
            done.done();
            Ok(())
        }));
    }

    barrier.wait();
    for handle in handles {
        join(handle)?;
    }

    info!(total = *counter.lock(), "Counter settled");
    Ok(())
}

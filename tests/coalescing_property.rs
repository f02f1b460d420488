// tests/coalescing_property.rs

use std::sync::Arc;

use proptest::prelude::*;
use tokio::time::{sleep, Duration, Instant};

use devloop::engine::{BuildErrorLog, Supervisor, SupervisorOptions};
use devloop::fs::MockFileSystem;
use devloop::types::{BuildOutcome, ChangeEvent};
use devloop_test_utils::fakes::{FakeBuilder, FakeProcesses};

const DELAY_MS: u64 = 500;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn spawn_supervisor(
    builder: &FakeBuilder,
    processes: &FakeProcesses,
) -> (
    devloop::engine::SupervisorHandle,
    tokio::task::JoinHandle<devloop::errors::Result<devloop::engine::LoopExit>>,
) {
    let options = SupervisorOptions {
        build_delay: Duration::from_millis(DELAY_MS),
        ..SupervisorOptions::default()
    };
    let build_log = BuildErrorLog::new("tmp/build-errors.log", Arc::new(MockFileSystem::new()));
    let (supervisor, handle) =
        Supervisor::new(options, builder.clone(), processes.clone(), build_log);
    (handle, tokio::spawn(supervisor.run()))
}

// Strategy: sorted offsets (ms after the first event) that all fall inside
// the debounce window.
fn burst_offsets() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(0..DELAY_MS, 0..30).prop_map(|mut v| {
        v.sort_unstable();
        v
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn events_inside_one_window_build_exactly_once(offsets in burst_offsets()) {
        let rt = paused_runtime();
        let (builds, waited) = rt.block_on(async {
            let builder = FakeBuilder::new();
            let processes = FakeProcesses::new();
            let (handle, task) = spawn_supervisor(&builder, &processes);

            let t0 = Instant::now();
            handle.notify(ChangeEvent::from("first")).await.unwrap();
            for (i, offset) in offsets.iter().enumerate() {
                tokio::time::sleep_until(t0 + Duration::from_millis(*offset)).await;
                handle.notify(ChangeEvent::new(format!("e{}", i))).await.unwrap();
            }
            sleep(Duration::from_millis(DELAY_MS * 4)).await;

            handle.shutdown();
            task.await.unwrap().unwrap();

            let times = builder.build_times();
            (times.len(), times.first().map(|t| *t - t0))
        });

        prop_assert_eq!(builds, 1);
        prop_assert!(waited.unwrap() >= Duration::from_millis(DELAY_MS));
    }

    #[test]
    fn never_more_than_one_instance_alive(
        outcomes in proptest::collection::vec(any::<bool>(), 1..12),
    ) {
        let rt = paused_runtime();
        let script: Vec<BuildOutcome> = std::iter::once(true)
            .chain(outcomes.iter().copied())
            .map(|ok| {
                if ok {
                    BuildOutcome::succeeded("")
                } else {
                    BuildOutcome::failed("error")
                }
            })
            .collect();
        let successes = script.iter().filter(|o| o.success).count();
        let cycles = script.len();

        let (builds, runs, max_alive, alive) = rt.block_on(async move {
            let builder = FakeBuilder::with_outcomes(script);
            let processes = FakeProcesses::new();
            let (handle, task) = spawn_supervisor(&builder, &processes);

            for i in 0..cycles {
                handle.notify(ChangeEvent::new(format!("edit{}", i))).await.unwrap();
                sleep(Duration::from_millis(DELAY_MS * 2)).await;
            }

            handle.shutdown();
            task.await.unwrap().unwrap();

            (builder.builds(), processes.runs(), processes.max_alive(), processes.alive())
        });

        prop_assert_eq!(builds, cycles);
        prop_assert_eq!(runs, successes);
        prop_assert!(max_alive <= 1);
        prop_assert_eq!(alive, 0);
    }
}

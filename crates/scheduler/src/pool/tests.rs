use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::SchedulerError;
use crate::queue::TaskSource;
use crate::task::{Priority, Task};

use super::{PoolControl, WorkerPool};

/// FIFO stand-in for the priority queue.
#[derive(Default)]
struct MockQueue {
    tasks: Mutex<VecDeque<Task>>,
    stopped: AtomicBool,
}

impl MockQueue {
    fn push(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl TaskSource for MockQueue {
    fn dequeue(&self) -> Option<Task> {
        self.tasks.lock().unwrap().pop_front()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

fn fast_config() -> PoolConfig {
    PoolConfig {
        initial_workers: 0,
        idle_backoff_ms: 10,
    }
}

fn sleeping_task(d: Duration) -> Task {
    Task::new(Priority::Critical, move || tokio::time::sleep(d))
}

async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn new_pool_starts_initial_workers() {
    let pool = WorkerPool::new(Arc::new(MockQueue::default()), 5, &fast_config());
    assert_eq!(pool.current(), 5);
    assert_eq!(pool.running_loops(), 5);
    pool.shutdown().await;
}

#[tokio::test]
async fn scale_adjusts_worker_count() {
    let cases = [
        ("scale up", 2, 3, 5),
        ("scale down", 5, -2, 3),
        ("scale down to zero", 3, -3, 0),
        ("scale down more than exists", 3, -5, 0),
        ("no change", 3, 0, 3),
    ];

    for (name, initial, delta, want) in cases {
        let pool = WorkerPool::new(Arc::new(MockQueue::default()), initial, &fast_config());
        pool.scale(delta);
        assert_eq!(pool.current(), want, "{name}");
        assert!(wait_for(|| pool.running_loops() == want).await, "{name}");
        pool.shutdown().await;
    }
}

#[tokio::test]
async fn shrunk_workers_exit_asynchronously() {
    let pool = WorkerPool::new(Arc::new(MockQueue::default()), 6, &fast_config());
    pool.scale(-4);
    assert_eq!(pool.current(), 2);

    assert!(
        wait_for(|| pool.running_loops() == 2).await,
        "expected 2 live loops, got {}",
        pool.running_loops()
    );

    pool.scale(3);
    assert_eq!(pool.current(), 5);
    assert_eq!(pool.running_loops(), 5);
    pool.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn workers_execute_tasks() {
    let queue = Arc::new(MockQueue::default());
    let t1 = sleeping_task(Duration::from_millis(50));
    let t2 = sleeping_task(Duration::from_millis(40));
    let (f1, f2) = (t1.executed_flag(), t2.executed_flag());
    queue.push(t1);
    queue.push(t2);

    let pool = WorkerPool::new(queue.clone(), 2, &fast_config());

    assert!(wait_for(|| f1.load(Ordering::SeqCst) && f2.load(Ordering::SeqCst)).await);
    pool.shutdown().await;
}

#[tokio::test]
async fn panicking_task_does_not_kill_worker() {
    let queue = Arc::new(MockQueue::default());
    queue.push(Task::from_fn(Priority::High, || panic!("boom")));
    let survivor = Task::noop(Priority::High);
    let flag = survivor.executed_flag();
    queue.push(survivor);

    let pool = WorkerPool::new(queue.clone(), 1, &fast_config());

    assert!(wait_for(|| flag.load(Ordering::SeqCst)).await);
    assert_eq!(pool.running_loops(), 1);
    pool.shutdown().await;
}

#[tokio::test]
async fn workers_exit_once_queue_is_stopped_and_drained() {
    let queue = Arc::new(MockQueue::default());
    let pool = WorkerPool::new(queue.clone(), 3, &fast_config());

    queue.stop();

    assert!(wait_for(|| pool.running_loops() == 0).await);
    pool.shutdown().await;
}

#[tokio::test]
async fn stopped_queue_is_drained_before_exit() {
    let queue = Arc::new(MockQueue::default());
    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let c = count.clone();
        queue.push(Task::from_fn(Priority::Low, move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
    }
    queue.stop();

    let pool = WorkerPool::new(queue.clone(), 2, &fast_config());

    assert!(wait_for(|| pool.running_loops() == 0).await);
    assert_eq!(count.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_waits_for_in_flight_task() {
    let queue = Arc::new(MockQueue::default());
    let task = sleeping_task(Duration::from_millis(100));
    let flag = task.executed_flag();
    queue.push(task);

    let pool = WorkerPool::new(queue.clone(), 1, &fast_config());
    assert!(wait_for(|| queue.tasks.lock().unwrap().is_empty()).await);

    pool.shutdown().await;

    assert!(flag.load(Ordering::SeqCst), "cooperative stop lets the task finish");
    assert_eq!(pool.running_loops(), 0);
    assert_eq!(pool.current(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_with_timeout_abandons_long_task() {
    let queue = Arc::new(MockQueue::default());
    let task = sleeping_task(Duration::from_secs(3600));
    let flag = task.executed_flag();
    queue.push(task);

    let pool = WorkerPool::new(queue.clone(), 2, &fast_config());
    assert!(wait_for(|| queue.tasks.lock().unwrap().is_empty()).await);

    let result = pool.shutdown_with_timeout(Duration::from_millis(20)).await;

    assert!(matches!(result, Err(SchedulerError::ShutdownTimeout(_))));
    assert!(!flag.load(Ordering::SeqCst));
    assert!(pool.is_shut_down());
}

#[tokio::test]
async fn scale_after_shutdown_is_ignored() {
    let pool = WorkerPool::new(Arc::new(MockQueue::default()), 2, &fast_config());
    pool.shutdown().await;

    pool.scale(4);

    assert_eq!(pool.current(), 0);
    assert_eq!(pool.running_loops(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scaling_settles_on_net_delta() {
    let pool = Arc::new(WorkerPool::new(Arc::new(MockQueue::default()), 8, &fast_config()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.scale(if i % 2 == 0 { 3 } else { -2 }))
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // 8 + 4*3 - 4*2; even all shrinks first never reaches the zero clamp.
    assert_eq!(pool.current(), 12);
    assert!(wait_for(|| pool.running_loops() == 12).await);
    pool.shutdown().await;
}

#[tokio::test]
async fn pool_control_trait_object() {
    let pool = WorkerPool::new(Arc::new(MockQueue::default()), 1, &fast_config());
    let control: &dyn PoolControl = &pool;
    control.scale(2);
    assert_eq!(control.current(), 3);
    pool.shutdown().await;
}

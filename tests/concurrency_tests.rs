//! Multi-threaded use of a shared pool

use std::sync::Arc;

use blockpool::pool::LogLevel;
use blockpool::{BlockPool, Descriptor, FreeOutcome, PoolAllocator};

fn shared_pool(excess_allowed: bool) -> Arc<BlockPool> {
    BlockPool::new(
        vec![
            Descriptor::new(64, 8, 32, excess_allowed),
            Descriptor::new(1500, 4, 32, excess_allowed),
            Descriptor::new(9000, 0, 8, excess_allowed),
        ],
        Some(Arc::new(|_: LogLevel, _: &str| {})),
        false,
    )
}

#[test]
fn test_parallel_allocate_free_balances() {
    let pool = shared_pool(true);
    let threads = 8;
    let rounds = 2_000;

    crossbeam::thread::scope(|scope| {
        for t in 0..threads {
            let pool = Arc::clone(&pool);
            scope.spawn(move |_| {
                for i in 0..rounds {
                    let size = [48, 1400, 8000][(t + i) % 3];
                    let mut buf = pool.acquire(size).expect("excess is allowed");
                    buf.fill(t as u8);
                    assert!(buf.iter().all(|b| *b == t as u8));
                }
            });
        }
    })
    .unwrap();

    let stats = pool.statistics();
    let total: u64 = stats.iter().map(|s| s.allocations).sum();
    assert_eq!(total, (threads * rounds) as u64);
    for s in &stats {
        assert_eq!(s.allocations, s.deallocations);
        assert_eq!(s.outstanding, 0);
        assert_eq!(s.corruption_count, 0);
        assert!(s.max_outstanding <= threads as u64);
    }
}

#[test]
fn test_parallel_cap_is_never_exceeded() {
    // 64-byte class capped at 32 without excess; requests cascade upward
    let pool = shared_pool(false);
    let threads = 6;

    let held = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let pool = Arc::clone(&pool);
                scope.spawn(move |_| {
                    (0..20)
                        .filter_map(|_| pool.allocate(64))
                        .map(|p| p.as_ptr() as usize)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();

    let stats = pool.statistics();
    assert_eq!(stats[0].outstanding, 32);
    assert_eq!(stats[1].outstanding, 32);
    assert_eq!(stats[2].outstanding, 8);
    assert_eq!(held.len(), 72);
    assert_eq!(stats[0].unfulfilled, 120 - 32);

    // Every pointer is distinct
    let mut sorted = held.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), held.len());

    for addr in held {
        let p = std::ptr::NonNull::new(addr as *mut u8).unwrap();
        assert_eq!(unsafe { pool.free(p) }, Ok(FreeOutcome::Pooled));
    }
    assert!(pool.statistics().iter().all(|s| s.outstanding == 0));
}

#[test]
fn test_allocators_share_pool_across_threads() {
    let pool = shared_pool(true);
    let alloc = PoolAllocator::<u64>::new(Arc::clone(&pool));

    crossbeam::thread::scope(|scope| {
        for t in 0..4u64 {
            let alloc = alloc.clone();
            scope.spawn(move |_| {
                for n in 1..100usize {
                    let p = alloc.allocate(n).unwrap();
                    unsafe {
                        for i in 0..n {
                            p.as_ptr().add(i).write(t);
                        }
                        alloc.deallocate(p.as_ptr(), n);
                    }
                }
            });
        }
    })
    .unwrap();

    let stats = pool.statistics();
    assert!(stats.iter().all(|s| s.allocations == s.deallocations));
    assert!(stats.iter().all(|s| s.corruption_count == 0));
}

//! The reference table is shared by bridges on many threads

use memory_manager::{ManagedHeap, ReferenceTable};
use std::sync::Arc;

const THREADS: usize = 8;
const PER_THREAD: usize = 200;

#[test]
fn test_concurrent_create_weaken_destroy() {
    let heap = Arc::new(ManagedHeap::new());
    let table = ReferenceTable::new(Arc::clone(&heap));

    crossbeam::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|_| {
                for _ in 0..PER_THREAD {
                    let local = heap.allocate("Proxy");
                    let key = table.create_reference(local.object()).unwrap();
                    table.make_weak(key).unwrap();
                    assert_eq!(table.clear_weak(key).unwrap(), Some(local.object()));
                    table.destroy_reference(key).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert!(table.is_empty());
    heap.collect_garbage();
    assert_eq!(heap.live_object_count(), 0);
}

#[test]
fn test_concurrent_keys_are_unique() {
    let heap = Arc::new(ManagedHeap::new());
    let table = ReferenceTable::new(Arc::clone(&heap));

    let keys: Vec<u32> = crossbeam::thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|_| {
                    (0..PER_THREAD)
                        .map(|_| {
                            let local = heap.allocate("Proxy");
                            table.create_reference(local.object()).unwrap().get()
                        })
                        .collect::<Vec<u32>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect()
    })
    .unwrap();

    let mut unique = keys.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert_eq!(table.len(), THREADS * PER_THREAD);

    // Every slot is strong, so every object survives.
    heap.collect_garbage();
    assert_eq!(heap.live_object_count(), THREADS * PER_THREAD);
}

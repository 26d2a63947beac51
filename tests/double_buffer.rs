use std::{sync::Arc, thread};

use cgmath::Point3;
use web_time::Duration;

use voxel_frame_engine::{
    core::{DoubleBuffer, WorkerSet, WorkerSlot},
    engine_state::{rendering::vertex::Vertex, voxels::world::TerrainSnapshot},
};

#[test]
fn first_consume_after_wait_yields_published_chunk_set() {
    let (mut publisher, mut reader) =
        DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());
    let origin = Point3::new(0, 0, 0);

    let producer = thread::spawn(move || {
        let vertices: Arc<[Vertex]> = vec![Vertex::default(); 24].into();
        publisher.write().drawable.insert(origin, vertices);
        publisher.publish();
        publisher
    });

    reader.wait_until_first_ready().unwrap();
    assert!(reader.try_consume());
    assert_eq!(reader.current().drawable.len(), 1);
    assert_eq!(reader.current().drawable.get(&origin).map(|v| v.len()), Some(24));

    assert!(!reader.try_consume());
    assert_eq!(reader.current().vertex_count(), 24);
    drop(producer.join().unwrap());
}

#[test]
fn readers_only_ever_see_whole_snapshots() {
    const CHUNKS: i32 = 32;
    const ROUNDS: u32 = 500;
    let (mut publisher, mut reader) =
        DoubleBuffer::channel(TerrainSnapshot::default(), TerrainSnapshot::default());

    let producer = thread::spawn(move || {
        let mut round = 1;
        while round <= ROUNDS {
            let vertices: Arc<[Vertex]> = vec![Vertex::default(); round as usize].into();
            let snapshot = publisher.write();
            for x in 0..CHUNKS {
                snapshot.drawable.insert(Point3::new(x, 0, 0), vertices.clone());
            }
            if publisher.publish_bounded(4) {
                round += 1;
            }
        }
    });

    let mut last = 0;
    while last < ROUNDS as usize {
        reader.try_consume();
        let snapshot = reader.current();
        let mut sizes = snapshot.drawable.values().map(|vertices| vertices.len());
        if let Some(first) = sizes.next() {
            assert!(sizes.all(|size| size == first), "torn snapshot observed");
            assert_eq!(snapshot.drawable.len(), CHUNKS as usize);
            assert!(first >= last);
            last = first;
        }
    }
    producer.join().unwrap();
}

#[test]
fn stopping_an_idle_worker_joins() {
    let mut workers = WorkerSet::new();
    workers.mark_all_runnable();

    let (mut publisher, _reader) = DoubleBuffer::channel(0u64, 0u64);
    let signal = publisher.stop_signal();
    workers
        .spawn(WorkerSlot::Terrain, signal, move || {
            while publisher.wait_for_wakeup() {}
        })
        .unwrap();
    assert_eq!(workers.thread_count(), 1);

    workers.stop(WorkerSlot::Terrain);
    assert_eq!(workers.thread_count(), 0);
    assert!(!workers.should_run(WorkerSlot::Terrain));
}

#[test]
fn stopping_a_worker_waiting_on_a_long_deadline_joins() {
    let mut workers = WorkerSet::new();
    workers.mark_all_runnable();

    let (publisher, _reader) = DoubleBuffer::channel(0u64, 0u64);
    let signal = publisher.stop_signal();
    workers
        .spawn(WorkerSlot::Tick, signal, move || {
            while publisher.idle_until(web_time::Instant::now() + Duration::from_secs(3600)) {}
        })
        .unwrap();

    thread::sleep(Duration::from_millis(10));
    workers.stop_all();
    assert_eq!(workers.thread_count(), 0);
    assert!(!workers.any_should_run());
}

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use skipkv::{Options, SkipList};

const STABLE: i64 = 1000;

fn value_for(key: i64, generation: u64) -> String {
    // long enough that a torn read would show up as a mismatch
    format!("{}-{}-{}", key, generation, "x".repeat((key % 64) as usize))
}

fn parse_value(key: i64, value: &str) -> bool {
    let mut parts = value.splitn(3, '-');
    let k = parts.next().and_then(|p| p.parse::<i64>().ok());
    let g = parts.next().and_then(|p| p.parse::<u64>().ok());
    let pad = parts.next();
    k == Some(key) && g.is_some() && pad == Some(&"x".repeat((key % 64) as usize)[..])
}

#[test]
fn readers_run_alongside_writer() {
    let list: SkipList<i64, String> = SkipList::new(Options::default().seed(11));
    for k in 0..STABLE {
        list.insert(k * 2, value_for(k * 2, 0)).unwrap();
    }

    let done = AtomicBool::new(false);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let mut max_latency = Duration::ZERO;
                while !done.load(Ordering::Acquire) {
                    for k in (0..STABLE).map(|k| k * 2) {
                        let start = Instant::now();
                        let value = list.get(&k).unwrap();
                        max_latency = max_latency.max(start.elapsed());
                        assert!(parse_value(k, &value), "torn value {:?}", value);
                    }
                }
                assert!(max_latency < Duration::from_secs(2), "{:?}", max_latency);
            });
        }

        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                let mut last = None;
                for (k, v) in list.iter() {
                    assert!(last.map_or(true, |l| l < k), "out of order at {}", k);
                    assert!(parse_value(k, &v), "torn value {:?}", v);
                    last = Some(k);
                }
            }
        });

        // odd keys churn, even keys only get new values
        for generation in 1..=20u64 {
            for k in (0..STABLE).map(|k| k * 2 + 1) {
                list.insert(k, value_for(k, generation)).unwrap();
            }
            for k in (0..STABLE).map(|k| k * 2) {
                list.update(&k, value_for(k, generation)).unwrap();
            }
            for k in (0..STABLE).map(|k| k * 2 + 1) {
                list.delete(&k).unwrap();
            }
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(list.len(), STABLE as usize);
    for k in (0..STABLE).map(|k| k * 2) {
        assert_eq!(list.get(&k).unwrap(), value_for(k, 20));
    }
    list.check_invariants().unwrap();
}

#[test]
fn writers_are_serialized() {
    let list: SkipList<i64, i64> = SkipList::new(Options::default().seed(5));
    thread::scope(|s| {
        for t in 0..4i64 {
            let list = &list;
            s.spawn(move || {
                for i in 0..2000 {
                    list.insert(i * 4 + t, t).unwrap();
                }
            });
        }
    });
    assert_eq!(list.len(), 8000);
    list.check_invariants().unwrap();
    let keys: Vec<i64> = list.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, (0..8000).collect::<Vec<_>>());
}

#[test]
fn completed_write_is_visible_to_later_reader() {
    let list: SkipList<i64, String> = SkipList::new(Options::default());
    thread::scope(|s| {
        s.spawn(|| list.insert(7, "seven".to_string()).unwrap())
            .join()
            .unwrap();
        let reader = s.spawn(|| list.get(&7).unwrap());
        assert_eq!(reader.join().unwrap(), "seven");
    });
}

#[test]
fn racing_inserts_of_one_key() {
    let list: SkipList<i64, usize> = SkipList::new(Options::default());
    let wins: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let list = &list;
                s.spawn(move || list.insert(1, t).is_ok() as usize)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(wins, 1);
    assert_eq!(list.len(), 1);
}

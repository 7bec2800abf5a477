use {
    sizeroller::{RotationSize, Rotator, RotatorBuilder},
    std::{
        fs,
        io::Write,
        path::Path,
        sync::Arc,
        thread,
    },
    tempfile::tempdir,
};

fn file_sizes(dir: &Path) -> Vec<u64> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().metadata().unwrap().len())
        .collect()
}

fn spawn_writers(rotator: &Arc<Rotator>, writers: usize, writes: usize, record: impl Fn(usize) -> String + Copy + Send + 'static) {
    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let rotator = Arc::clone(rotator);
            thread::spawn(move || {
                let mut writer: &Rotator = &rotator;
                for _ in 0..writes {
                    writer.write_all(record(w).as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn writes_within_bound_never_rotate() {
    let dir = tempdir().unwrap();
    let rotator = Rotator::new(dir.path(), "p2.log", 1000, 0o644, 3, true).unwrap();
    let mut written = 0;
    for len in [1usize, 10, 100, 250, 0, 639] {
        written += rotator.append(&vec![b'z'; len]).unwrap();
    }
    assert_eq!(written, 1000);
    assert!(rotator.rotated_files().unwrap().is_empty());
    assert_eq!(fs::metadata(rotator.path()).unwrap().len(), 1000);
    assert_eq!(rotator.current_size(), 1000);
}

#[test]
fn concurrent_writers_lose_nothing() {
    const WRITERS: usize = 8;
    const WRITES: usize = 200;
    const RECORD: usize = 16;

    let dir = tempdir().unwrap();
    let rotator = Arc::new(Rotator::new(dir.path(), "p5.log", 1024, 0o644, 0, true).unwrap());
    spawn_writers(&rotator, WRITERS, WRITES, |w| format!("writer-{w:03}-rec.\n"));
    rotator.close().unwrap();

    let mut total = 0;
    for entry in fs::read_dir(dir.path()).unwrap() {
        let contents = fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(contents.len() <= 1024);
        assert_eq!(contents.len() % RECORD, 0);
        for line in contents.lines() {
            assert!(line.starts_with("writer-") && line.ends_with("-rec."), "torn record: {line:?}");
        }
        total += contents.len();
    }
    assert_eq!(total, WRITERS * WRITES * RECORD);
}

#[test]
fn three_writers_with_retention_of_fifteen_leave_sixteen_files() {
    let dir = tempdir().unwrap();
    let rotator = Arc::new(
        RotatorBuilder::new(dir.path(), "scenario-a.log")
            .max_size(RotationSize::KB(2))
            .max_keep_files(15)
            .build()
            .unwrap(),
    );
    // 300 records of 120 bytes: well past 16 files of 2048 bytes.
    spawn_writers(&rotator, 3, 100, |w| format!("{w} {:>117}\n", "Hello World!"));
    rotator.close().unwrap();

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 16);
    assert_eq!(rotator.rotated_files().unwrap().len(), 15);
    assert!(file_sizes(dir.path()).into_iter().all(|size| size <= 2048));
}

#[test]
fn sequential_writer_keeps_only_the_retained_window() {
    const LINE: &[u8] = b"Hello World!\n";
    const WRITES: usize = 9000;

    let dir = tempdir().unwrap();
    let mut rotator = Rotator::new(dir.path(), "scenario-b.log", 10 << 10, 0o644, 3, true).unwrap();
    for _ in 0..WRITES {
        rotator.write_all(LINE).unwrap();
    }
    rotator.flush().unwrap();

    let per_file = (10240 / LINE.len()) * LINE.len();
    let total = WRITES * LINE.len();
    let rotated = rotator.rotated_files().unwrap();
    assert_eq!(rotated.len(), 3);
    for file in &rotated {
        assert_eq!(fs::metadata(&file.path).unwrap().len() as usize, per_file);
    }
    let current = fs::metadata(rotator.path()).unwrap().len() as usize;
    assert!(current > 0);
    assert_eq!(current, total % per_file);
    assert_eq!(rotator.current_size() as usize, current);
}

#[test]
fn empty_write_with_tiny_bound_does_not_rotate() {
    let dir = tempdir().unwrap();
    let rotator = Rotator::new(dir.path(), "scenario-c.log", 1, 0o644, 0, false).unwrap();
    assert_eq!(rotator.append(&[]).unwrap(), 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(fs::metadata(rotator.path()).unwrap().len(), 0);
}

#[test]
fn restart_continues_the_same_file_set() {
    let dir = tempdir().unwrap();
    {
        let rotator = Rotator::new(dir.path(), "restart.log", 8, 0o644, 2, true).unwrap();
        rotator.append(b"first-12").unwrap();
        rotator.close().unwrap();
    }
    let rotator = Rotator::new(dir.path(), "restart.log", 8, 0o644, 2, true).unwrap();
    assert_eq!(rotator.current_size(), 8);
    rotator.append(b"second").unwrap();

    let rotated = rotator.rotated_files().unwrap();
    assert_eq!(rotated.len(), 1);
    assert_eq!(fs::read(&rotated[0].path).unwrap(), b"first-12");
    assert_eq!(fs::read(rotator.path()).unwrap(), b"second");
}

#[test]
fn serves_as_a_tracing_sink() {
    let dir = tempdir().unwrap();
    let rotator = RotatorBuilder::new(dir.path(), "tracing.log")
        .max_size(RotationSize::Bytes(512))
        .max_keep_files(2)
        .serialize_writes(false)
        .build()
        .unwrap();
    let path = rotator.path().to_path_buf();

    let (non_blocking, guard) = tracing_appender::non_blocking(rotator);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        for i in 0..50 {
            tracing::info!(i, "event number {i}");
        }
    });
    drop(guard);

    let current = fs::read_to_string(&path).unwrap();
    assert!(current.contains("event number 49"));
    let files = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 3);
}

use {
    sizeroller::Rotator,
    std::{io::Write, sync::Arc, thread},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 10KB files and 3 rotated files kept. Plain threads do not coordinate
    // their writes, so the rotator serializes them.
    let rotator = Arc::new(Rotator::new("./logs", "standard-logger.log", 10 << 10, 0o644, 3, true)?);

    let handles: Vec<_> = ["Hello World!", "Goodbye...", "How's it going?"]
        .into_iter()
        .map(|message| {
            let rotator = Arc::clone(&rotator);
            thread::spawn(move || -> std::io::Result<()> {
                let mut writer: &Rotator = &rotator;
                let line = format!("{message}\n");
                for _ in 0..3000 {
                    // One write per line, so lines from other threads never interleave.
                    writer.write_all(line.as_bytes())?;
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle.join().map_err(|_| "writer thread panicked")??;
    }

    rotator.close()?;
    println!("rotated files kept: {}", rotator.rotated_files()?.len());
    Ok(())
}

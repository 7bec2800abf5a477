use sizeroller::{RotationSize, RotatorBuilder, TimeZone};
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 2KB files, 15 rotated files kept. The non-blocking worker is the only
    // writer, so the rotator does not need its own lock.
    let appender = RotatorBuilder::new("./logs", "tracing.log")
        .max_size(RotationSize::KB(2))
        .max_keep_files(15)
        .time_zone(TimeZone::UTC)
        .serialize_writes(false)
        .build()?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .finish()
        .try_init()?;

    let handles: Vec<_> = [
        ("info", "Hello World!"),
        ("warn", "Goodbye..."),
        ("error", "How's it going?"),
    ]
    .into_iter()
    .map(|(level, message)| {
        std::thread::spawn(move || {
            for _ in 0..100 {
                match level {
                    "info" => tracing::info!("{message}"),
                    "warn" => tracing::warn!("{message}"),
                    _ => tracing::error!("{message}"),
                }
            }
        })
    })
    .collect();
    for handle in handles {
        handle.join().map_err(|_| "writer thread panicked")?;
    }

    // Once the guard is dropped, ./logs holds tracing.log and up to 15 rotated files.
    Ok(())
}

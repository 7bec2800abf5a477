use sizeroller::{RotationSize, RotatorBuilder};
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = RotatorBuilder::new("./logs", "logger.log")
        .max_size(RotationSize::KB(256))
        .max_keep_files(3)
        .build()?;

    writeln!(logger, "This is an info message")?;
    writeln!(logger, "This is a warning message")?;
    writeln!(logger, "This is an error message")?;

    logger.close()?;
    Ok(())
}

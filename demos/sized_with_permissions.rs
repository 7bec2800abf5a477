use {
    sizeroller::{RotationSize, RotatorBuilder},
    std::io::Write,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = RotatorBuilder::new("./logs", "sized.log")
        .max_size(RotationSize::KB(16)) // Rotate before the file passes 16KB
        .max_keep_files(5) // Keep only last 5 rotated files
        .file_mode(0o640) // Set file permissions to: owner rw, group r, others none
        .build()?;

    // Simulate writing logs that will trigger size-based rotation
    for i in 1..=1000 {
        writeln!(
            logger,
            "Log entry #{}: This is a sample log message that will contribute to file size",
            i
        )?;
    }

    for file in logger.rotated_files()? {
        println!("{}", file.path.display());
    }
    Ok(())
}

use std::io::Write;

use env_logger::Builder;

/// Configures the process-wide logger. Library code never calls this
/// itself; only the embedding binary (or a test harness) does, once.
pub fn init() {
    let mut builder = Builder::from_default_env();
    builder
        .format_timestamp_millis()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .ok();
}

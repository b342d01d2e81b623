//! Producer binary: publishes one log event to the raw-logs topic.
//!
//! Usage:
//!   logsleuth-producer <service> <level> <message> <host>
//!   logsleuth-producer            (sends a canned test event)

use logsleuth::bus::LogProducer;
use logsleuth::config::Config;
use logsleuth::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    let producer = LogProducer::new(config.kafka.clone())?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [service, level, message, host] => {
            producer.send_parts(service, level, message, host).await;
        }
        [] => {
            producer.send_test_message().await;
        }
        _ => {
            eprintln!("usage: logsleuth-producer [<service> <level> <message> <host>]");
            std::process::exit(2);
        }
    }

    Ok(())
}

use std::time::{Duration, Instant};

use stepmq_queue::{Context, Message, Producer};

use crate::cmd::SendArgs;
use crate::exit::{CliResult, FAILURE, INTERNAL, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let producer = Producer::spawn(Context::new(), &args.path)
        .map_err(|err| crate::exit::CliError::new(INTERNAL, format!("producer start failed: {err}")))?;

    for offset in 0..args.repeat.max(1) {
        producer.publish(Message::new(
            args.id + offset,
            args.kind,
            payload.clone(),
        ));
    }

    // Delivery is fire-and-forget by contract; give the drain loop a
    // bounded window before giving up on this process run.
    let deadline = Instant::now() + Duration::from_millis(args.linger_ms);
    while producer.pending() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }

    if producer.pending() > 0 {
        eprintln!(
            "warning: {} message(s) still unacknowledged after {} ms",
            producer.pending(),
            args.linger_ms
        );
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return std::fs::read(path).map_err(|err| {
            crate::exit::CliError::new(
                INTERNAL,
                format!("failed reading {}: {err}", path.display()),
            )
        });
    }
    Ok(Vec::new())
}

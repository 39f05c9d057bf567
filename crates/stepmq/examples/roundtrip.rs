//! Minimal producer/consumer round trip in one process.
//!
//! Run with:
//!   cargo run --example roundtrip

use std::fs;
use std::time::{Duration, Instant};

use stepmq::queue::{Consumer, Context, Message, MessageKind, Producer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("stepmq-roundtrip-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("roundtrip.sock");

    let ctx = Context::new();

    let consumer = Consumer::spawn(
        |message: Message| {
            eprintln!(
                "received id={} kind={} extension={}",
                message.id,
                message.kind,
                String::from_utf8_lossy(&message.extension)
            );
        },
        ctx.clone(),
        &sock_path,
        Some("roundtrip-example".to_string()),
    )?;

    let producer = Producer::spawn(ctx, &sock_path)?;
    for id in 1..=5u64 {
        producer.publish(Message::new(id, MessageKind::Message, format!("payload-{id}")));
    }

    // Wait for the queue to drain, bounded.
    let deadline = Instant::now() + Duration::from_secs(5);
    while producer.pending() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    eprintln!("unacknowledged messages: {}", producer.pending());

    drop(producer);
    drop(consumer);
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}

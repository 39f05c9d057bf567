use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use stepmq_queue::{Consumer, Context, Message};

use crate::cmd::ListenArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};

#[derive(Serialize)]
struct MessageOutput<'a> {
    id: u64,
    kind: &'a str,
    ack: bool,
    extension_size: usize,
    extension: String,
}

fn print_message(message: &Message, json: bool) {
    let preview = String::from_utf8_lossy(&message.extension);
    if json {
        let out = MessageOutput {
            id: message.id,
            kind: message.kind.as_str(),
            ack: message.ack,
            extension_size: message.extension.len(),
            extension: preview.into_owned(),
        };
        println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!(
            "id={} kind={} size={} extension={}",
            message.id,
            message.kind,
            message.extension.len(),
            preview
        );
    }
}

pub fn run(args: ListenArgs) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let received = Arc::new(AtomicUsize::new(0));
    let counter = received.clone();
    let json = args.json;

    let _consumer = Consumer::spawn(
        move |message: Message| {
            print_message(&message, json);
            counter.fetch_add(1, Ordering::SeqCst);
        },
        Context::new(),
        &args.path,
        args.identity.clone(),
    )
    .map_err(|err| CliError::new(INTERNAL, format!("consumer start failed: {err}")))?;

    while running.load(Ordering::SeqCst) {
        if let Some(count) = args.count {
            if received.load(Ordering::SeqCst) >= count {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

mod aggregate;
mod backup;
mod config;
mod ipc;
mod jobs;
mod model;
mod notify;
mod store;
mod sync;

use clap::Parser;
use jobs::{Event, JobRunner};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

fn write_line(stdout: &mut io::Stdout, value: &serde_json::Value) {
    let mut out = stdout.lock();
    let _ = writeln!(
        out,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = out.flush();
}

fn main() {
    let cli = config::Cli::parse();
    config::init_logging(cli.log_level);

    let client = match cli.sync_client() {
        Ok(client) => client,
        Err(e) => {
            log::error!("sheet endpoint unusable, sync disabled: {:#}", e);
            None
        }
    };
    if client.is_none() {
        log::warn!("no sheet endpoint configured; sync.load and sync.save are unavailable");
    }

    let (events, inbox) = mpsc::channel();
    let mut state = ipc::AppState::new(
        cli.active_date(),
        client,
        JobRunner::new(events.clone()),
        Box::new(notify::StdoutNotifier),
    );
    log::info!("attendanced ready, active date {}", state.active_date);

    let reader = thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if events.send(Event::Line(line)).is_err() {
                return;
            }
        }
        let _ = events.send(Event::InputClosed);
    });

    let mut stdout = io::stdout();
    let mut closing = false;
    loop {
        // After stdin closes, stay up until in-flight jobs have answered.
        if closing && state.sync.outstanding() == 0 {
            break;
        }
        let Ok(event) = inbox.recv() else { break };
        match event {
            Event::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let req: ipc::Request = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        // Can't reply without id.
                        write_line(
                            &mut stdout,
                            &json!({
                                "ok": false,
                                "error": { "code": "bad_json", "message": e.to_string() }
                            }),
                        );
                        continue;
                    }
                };
                if let ipc::Reply::Now(resp) = ipc::handle_request(&mut state, req) {
                    write_line(&mut stdout, &resp);
                }
            }
            Event::InputClosed => closing = true,
            Event::JobDone(done) => {
                let resp = ipc::handle_job_done(&mut state, done);
                write_line(&mut stdout, &resp);
            }
        }
    }

    let _ = reader.join();
    log::info!("attendanced exiting");
}

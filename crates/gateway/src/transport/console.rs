// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive USSD simulator on the terminal.
//!
//! One subscriber, one session at a time. A line starting with `*` or `#`
//! dials; a blank line during a dialog aborts it; `exit` or EOF quits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use ussd::{Engine, Responder, Response, ResponseKind};

/// Responder id stored in sessions started from the console.
pub const RESPONDER_ID: &str = "console";

#[derive(Debug, clap::Args)]
pub struct ConsoleArgs {
    /// MSISDN in international format (10..15 digits).
    #[arg(long, default_value = "27821234567")]
    pub msisdn: String,

    /// IMSI (15 digits; default: not defined).
    #[arg(long)]
    pub imsi: Option<String>,

    /// Maximum response length (valid 50..500).
    #[arg(long, default_value_t = 182)]
    pub maxl: u16,
}

impl ConsoleArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        let digits = self.msisdn.chars().all(|c| c.is_ascii_digit());
        if !digits
            || self.msisdn.len() < 10
            || self.msisdn.len() > 15
            || self.msisdn.starts_with('0')
        {
            anyhow::bail!(
                "--msisdn={} must be 10..15 digits and not starting with a '0'",
                self.msisdn
            );
        }
        if let Some(imsi) = &self.imsi {
            if imsi.len() != 15 || !imsi.chars().all(|c| c.is_ascii_digit()) {
                anyhow::bail!("--imsi={imsi} must be 15 digits or not specified");
            }
        }
        if !(50..=500).contains(&self.maxl) {
            anyhow::bail!("--maxl={} is not 50..500", self.maxl);
        }
        Ok(())
    }
}

/// Delivers responses into the console loop's channel.
pub struct ConsoleResponder {
    tx: mpsc::UnboundedSender<Response>,
}

impl ConsoleResponder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Response>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Responder for ConsoleResponder {
    fn id(&self) -> &str {
        RESPONDER_ID
    }

    async fn respond(&self, _key: &str, response: Response) -> anyhow::Result<()> {
        self.tx.send(response).map_err(|_| anyhow::anyhow!("console loop is gone"))
    }
}

fn print_response(response: &Response) {
    println!();
    println!("{}", response.message);
    println!("-----------------------------(len:{:3})--", response.message.len());
    match response.kind {
        ResponseKind::Final => println!("==========[ E N D ]===================="),
        ResponseKind::Redirect => println!("==========[ R E D I R E C T ]=========="),
        ResponseKind::Prompt => {}
    }
}

/// Run the simulator until `exit` or EOF.
pub async fn run(
    args: &ConsoleArgs,
    engine: Arc<Engine>,
    init_item: &str,
    mut responses: mpsc::UnboundedReceiver<Response>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let id = format!("console:{}", args.msisdn);
    let mut session_nr = 0u64;

    'sessions: loop {
        session_nr += 1;
        println!();
        println!("===== U S S D - S I M U L A T O R =====");
        println!("    ( session: {session_nr} )    ");
        println!("---------------------------------------");

        // Dial prompt.
        let dialed = loop {
            println!("USSD > ");
            let Some(line) = lines.next_line().await? else {
                println!("Terminated.");
                break 'sessions;
            };
            let line = line.trim().to_owned();
            if line == "exit" {
                println!("Terminated.");
                break 'sessions;
            }
            if line.is_empty() {
                continue;
            }
            if !line.starts_with('*') && !line.starts_with('#') {
                println!("  ERROR: USSD must begin with '*' or '#'. Type exit to quit.");
                continue;
            }
            break line;
        };

        let mut data: HashMap<String, Value> = HashMap::from([
            ("maxl".to_owned(), json!(args.maxl)),
            ("msisdn".to_owned(), json!(args.msisdn)),
        ]);
        if let Some(imsi) = &args.imsi {
            data.insert("imsi".to_owned(), json!(imsi));
        }

        if let Err(e) = engine.start(&id, data, init_item, &dialed, RESPONDER_ID, &id).await {
            println!("  ERROR: USSD failed to start: {e}");
            continue 'sessions;
        }

        // Dialog loop: wait for each response, then read the next input.
        loop {
            let Some(response) = responses.recv().await else {
                anyhow::bail!("console responder channel closed");
            };
            print_response(&response);
            if response.kind != ResponseKind::Prompt {
                continue 'sessions;
            }

            println!("     ? ");
            let Some(input) = lines.next_line().await? else {
                engine.abort(&id).await;
                println!("Terminated.");
                break 'sessions;
            };
            let input = input.trim().to_owned();
            if input.is_empty() {
                println!("*** Abort ***");
                engine.abort(&id).await;
                continue 'sessions;
            }
            if let Err(e) =
                engine.continue_session(&id, HashMap::new(), &input, RESPONDER_ID, &id).await
            {
                println!("Continue failed: {e}");
                println!("==========[ E R R O R ]================");
                continue 'sessions;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;

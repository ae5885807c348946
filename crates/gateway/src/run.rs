// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring: build the engine, register services and responders, run the
//! configured transports until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use ussd::{Engine, HttpStore, MemoryStore, SessionStore};

use crate::config::{ConsoleCmd, ServeArgs};
use crate::services::{self, NoServiceCaller, ServiceCaller};
use crate::transport::console::{self, ConsoleResponder};
use crate::transport::http::{build_router, HttpGateway, HttpResponder};
use crate::transport::nats::{NatsConfig, NatsGateway};

fn build_store(session_store_url: Option<&str>) -> Arc<dyn SessionStore> {
    match session_store_url {
        Some(url) => {
            tracing::info!(url = %url, "using HTTP session store");
            Arc::new(HttpStore::new(url))
        }
        None => Arc::new(MemoryStore::new()),
    }
}

/// Run the NATS/HTTP gateway until ctrl-c.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let store = build_store(args.session_store_url.as_deref());
    let shutdown = CancellationToken::new();

    let nats = match &args.nats_url {
        Some(url) => {
            let config = NatsConfig {
                url: url.clone(),
                domain: args.domain.clone(),
                broadcast: args.broadcast,
                token: args.nats_token.clone(),
                request_ttl: Duration::from_millis(args.request_ttl_ms),
            };
            Some(NatsGateway::connect(&config, services::ROOT_ITEM_ID).await?)
        }
        None => None,
    };
    let caller: Arc<dyn ServiceCaller> = match &nats {
        Some(gateway) => Arc::new(gateway.clone()),
        None => Arc::new(NoServiceCaller),
    };

    let mut engine = Engine::new(store);
    let init_item = services::register_all(&mut engine, caller)?;
    let http_responder = HttpResponder::new();
    if args.http_port.is_some() {
        engine.register_responder(Arc::clone(&http_responder) as Arc<dyn ussd::Responder>)?;
    }
    if let Some(gateway) = &nats {
        engine.register_responder(gateway.responder())?;
    }
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();

    if let Some(gateway) = nats {
        gateway.bind_engine(Arc::clone(&engine));
        let shutdown = shutdown.clone();
        tasks.spawn(async move { gateway.run(shutdown).await });
    }

    if let Some(port) = args.http_port {
        let addr = format!("{}:{port}", args.http_host);
        let gateway =
            Arc::new(HttpGateway::new(Arc::clone(&engine), http_responder, &init_item));
        let router = build_router(gateway);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("ussd gateway listening on {addr}");
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .map_err(anyhow::Error::from)
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            shutdown.cancel();
        }
        Some(result) = tasks.join_next() => {
            shutdown.cancel();
            result??;
        }
    }
    while let Some(result) = tasks.join_next().await {
        result??;
    }
    Ok(())
}

/// Run the interactive console simulator.
pub async fn console(args: ConsoleCmd) -> anyhow::Result<()> {
    args.console.validate()?;
    let store = build_store(args.session_store_url.as_deref());

    let nats = match &args.nats_url {
        Some(url) => {
            let config = NatsConfig {
                url: url.clone(),
                domain: args.domain.clone(),
                broadcast: false,
                token: None,
                request_ttl: Duration::from_secs(10),
            };
            Some(NatsGateway::connect(&config, services::ROOT_ITEM_ID).await?)
        }
        None => None,
    };
    let caller: Arc<dyn ServiceCaller> = match &nats {
        Some(gateway) => Arc::new(gateway.clone()),
        None => Arc::new(NoServiceCaller),
    };

    let mut engine = Engine::new(store);
    let init_item = services::register_all(&mut engine, caller)?;
    let (responder, responses) = ConsoleResponder::new();
    engine.register_responder(responder as Arc<dyn ussd::Responder>)?;
    let engine = Arc::new(engine);

    if let Some(gateway) = &nats {
        gateway.bind_engine(Arc::clone(&engine));
        // Only the reply side matters here; the console is the request
        // transport.
        let gateway = gateway.clone();
        let shutdown = CancellationToken::new();
        tokio::spawn(async move {
            if let Err(e) = gateway.run(shutdown).await {
                tracing::error!(err = %e, "nats transport failed");
            }
        });
    }

    console::run(&args.console, engine, &init_item, responses).await
}

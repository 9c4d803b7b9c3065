// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use capp_operator::{
    config::{Cli, LogFormat},
    constants::{
        API_GROUP_VERSION, CAPP_CONTROLLER_NAME, CAPP_REVISION_CONTROLLER_NAME,
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS, ERROR_REQUEUE_DURATION_SECS,
        KIND_CAPP, LEADER_ELECTION_LEASE_NAME, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::{registry::known_kinds, Capp},
    dependents::{dns_record::CNAMERecord, domain_mapping::DomainMapping},
    errors::ReconcileError,
    events::KubeEventRecorder,
    labels::CAPP_RESOURCE_KEY,
    metrics,
    reconcilers::{reconcile_capp, reconcile_capp_revision, with_deadline, Outcome},
    store::KubeStore,
};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, watcher::Config, Controller},
    Api, Client, Resource, ResourceExt,
};
use kube_lease_manager::LeaseManagerBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("capp-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_logging(format: LogFormat) {
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    init_logging(cli.log_format);

    info!("Starting Capp controller");
    debug!("Logging initialized with file and line number tracking");

    let config = cli.controller_config();
    info!(
        certificate_backend = ?config.certificate_backend,
        revisions_to_keep = config.revisions_to_keep,
        dns_zone = %config.dns.zone,
        "Controller configuration loaded"
    );
    for kind in known_kinds() {
        debug!(
            api_version = %kind.api_version,
            kind = %kind.kind,
            plural = %kind.plural,
            owned = kind.owned,
            "Registered kind"
        );
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let store = KubeStore::new(client.clone());
    let recorder = Arc::new(KubeEventRecorder::new(client.clone(), CAPP_CONTROLLER_NAME));
    let ctx = Arc::new(Context::new(store, recorder, config));

    // Probes must answer while waiting for the lease.
    let admin = tokio::spawn(run_admin_servers(
        cli.metrics_bind_address,
        cli.health_probe_bind_address,
    ));

    let mut leadership = if cli.leader_elect {
        Some(acquire_leadership(client.clone(), &cli.leader_election_namespace).await?)
    } else {
        info!("Leader election disabled, reconciling immediately");
        None
    };

    info!(
        "Starting all controllers for {} {} with managers {:?}",
        API_GROUP_VERSION,
        KIND_CAPP,
        ctx.manager_kinds()
    );

    // Controllers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = run_capp_controller(client.clone(), ctx.clone()) => {
            error!("CRITICAL: Capp controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Capp controller exited unexpectedly without error")
        }
        result = run_capp_revision_controller(client.clone(), ctx.clone()) => {
            error!("CRITICAL: CappRevision controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("CappRevision controller exited unexpectedly without error")
        }
        result = admin => {
            error!("CRITICAL: admin server exited unexpectedly: {:?}", result);
            result??;
            anyhow::bail!("admin server exited unexpectedly without error")
        }
        () = leadership_lost(leadership.as_mut()) => {
            metrics::record_leader_status(false);
            anyhow::bail!("Lost leader lease {LEADER_ELECTION_LEASE_NAME}, exiting")
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received shutdown signal, stopping all controllers");
            Ok(())
        }
    }
}

/// Block until this replica holds the leader lease.
async fn acquire_leadership(client: Client, namespace: &str) -> Result<watch::Receiver<bool>> {
    info!(
        "Waiting for leader lease {}/{}",
        namespace, LEADER_ELECTION_LEASE_NAME
    );
    let manager = LeaseManagerBuilder::new(client, LEADER_ELECTION_LEASE_NAME)
        .with_namespace(namespace)
        .with_duration(DEFAULT_LEASE_DURATION_SECS)
        .with_grace(DEFAULT_LEASE_GRACE_SECS)
        .build()
        .await?;

    // The lease task renews in the background for the life of the process.
    let (mut channel, _lease_task) = manager.watch().await;
    while !*channel.borrow_and_update() {
        if channel.changed().await.is_err() {
            anyhow::bail!("Leader election stopped before the lease was acquired");
        }
    }

    info!("Acquired leader lease {}", LEADER_ELECTION_LEASE_NAME);
    metrics::record_leader_status(true);
    Ok(channel)
}

/// Resolve once leadership is lost. Never resolves without leader election.
async fn leadership_lost(channel: Option<&mut watch::Receiver<bool>>) {
    let Some(channel) = channel else {
        return futures::future::pending().await;
    };
    loop {
        if channel.changed().await.is_err() || !*channel.borrow_and_update() {
            warn!("Leader lease {} lost", LEADER_ELECTION_LEASE_NAME);
            return;
        }
    }
}

/// Serve Prometheus metrics and the liveness / readiness probes.
async fn run_admin_servers(metrics_addr: SocketAddr, probe_addr: SocketAddr) -> Result<()> {
    let metrics_app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let probe_app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }));

    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    let probe_listener = tokio::net::TcpListener::bind(probe_addr).await?;
    info!(
        "Serving metrics on {}{} and probes on {}",
        metrics_addr, METRICS_SERVER_PATH, probe_addr
    );

    tokio::try_join!(
        axum::serve(metrics_listener, metrics_app).into_future(),
        axum::serve(probe_listener, probe_app).into_future(),
    )?;
    Ok(())
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    metrics::gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Map a dependent back to the `Capp` named by its ownership label.
fn owning_capp<K: Resource>(obj: K) -> Option<ObjectRef<Capp>> {
    let name = obj.labels().get(CAPP_RESOURCE_KEY)?;
    Some(ObjectRef::new(name).within(&obj.namespace()?))
}

/// Run the `Capp` controller
async fn run_capp_controller(client: Client, ctx: Arc<Context<KubeStore>>) -> Result<()> {
    info!("Starting Capp controller");

    let api = Api::<Capp>::all(client.clone());
    let domain_mappings = Api::<DomainMapping>::all(client.clone());
    let dns_records = Api::<CNAMERecord>::all(client);

    // Dependents carry the ownership label, not an owner reference, so map
    // them back by label: a DomainMapping URL or a DNS record turning Ready
    // must re-run the Capp.
    Controller::new(api, Config::default())
        .watches(domain_mappings, Config::default(), owning_capp::<DomainMapping>)
        .watches(dns_records, Config::default(), owning_capp::<CNAMERecord>)
        .run(reconcile_capp_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `CappRevision` controller
async fn run_capp_revision_controller(client: Client, ctx: Arc<Context<KubeStore>>) -> Result<()> {
    info!("Starting CappRevision controller");

    let api = Api::<Capp>::all(client);

    Controller::new(api, Config::default())
        .run(reconcile_capp_revision_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `Capp`
async fn reconcile_capp_wrapper(
    capp: Arc<Capp>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = capp.namespace().unwrap_or_default();
    let name = capp.name_any();
    debug!(namespace = %namespace, capp_name = %name, "Reconcile wrapper called for Capp");

    let result = with_deadline(
        ctx.config.reconcile_timeout,
        &namespace,
        &name,
        reconcile_capp(&ctx, &namespace, &name),
    )
    .await;
    into_action(CAPP_CONTROLLER_NAME, start, result)
}

/// Reconcile wrapper for the revision history of a `Capp`
async fn reconcile_capp_revision_wrapper(
    capp: Arc<Capp>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = capp.namespace().unwrap_or_default();
    let name = capp.name_any();

    let result = with_deadline(
        ctx.config.reconcile_timeout,
        &namespace,
        &name,
        reconcile_capp_revision(&ctx, &namespace, &name),
    )
    .await;
    into_action(CAPP_REVISION_CONTROLLER_NAME, start, result)
}

fn into_action(
    controller: &str,
    start: Instant,
    result: Result<Outcome, ReconcileError>,
) -> Result<Action, ReconcileError> {
    match result {
        Ok(Outcome::Done) => {
            metrics::record_reconciliation_success(controller, start.elapsed());
            Ok(Action::await_change())
        }
        Ok(Outcome::RequeueAfter(delay)) => {
            metrics::record_reconciliation_success(controller, start.elapsed());
            Ok(Action::requeue(delay))
        }
        Err(e) => {
            metrics::record_reconciliation_error(controller, start.elapsed());
            metrics::record_error(controller, e.metric_label());
            Err(e)
        }
    }
}

/// Error policy for both controllers.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(capp: Arc<Capp>, err: &ReconcileError, _ctx: Arc<Context<KubeStore>>) -> Action {
    error!(
        error = %err,
        capp = %capp.name_any(),
        namespace = ?capp.namespace(),
        "Reconciliation error - will retry in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

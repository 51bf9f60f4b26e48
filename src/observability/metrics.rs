use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the Prometheus recorder and returns the handle the `/metrics`
/// endpoint renders from.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    describe();
    handle
}

fn describe() {
    metrics::describe_counter!(
        "ledger_entries_total",
        "Ledger entries written, labelled by mutation type"
    );
    metrics::describe_counter!(
        "reversals_total",
        "Reversal workflow actions, labelled by action"
    );
    metrics::describe_counter!(
        "reconciliation_cycles_total",
        "Completed reconciliation passes"
    );
    metrics::describe_counter!(
        "settlements_applied_total",
        "Mobile-money settlements whose ledger effect was applied"
    );
    metrics::describe_counter!(
        "settlements_reversed_total",
        "Gateway-side reversals compensated in the ledger"
    );
}

//! `monitor`: sample usage and show it next to the recorded history

use anyhow::Result;
use monitor_lib::alert::AlertOutcome;
use monitor_lib::cycle::{CycleReport, PodReport};
use monitor_lib::models::display_usage;
use tabled::Tabled;

use super::{build_cycle, CycleOptions};
use crate::config::Paths;
use crate::output::{
    color_direction, color_phase, format_series, print_json, print_namespace_status, print_rows,
    print_warning, OutputFormat,
};

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Pod Name")]
    pod_name: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "CPU Usage")]
    cpu: String,
    #[tabled(rename = "Memory Usage")]
    memory: String,
    #[tabled(rename = "Historical CPU Usage")]
    historical_cpu: String,
    #[tabled(rename = "Historical Memory Usage")]
    historical_memory: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
    #[tabled(rename = "Alert")]
    alert: String,
}

impl From<&PodReport> for UsageRow {
    fn from(pod: &PodReport) -> Self {
        Self {
            pod_name: pod.pod_name.clone(),
            phase: color_phase(&pod.phase),
            cpu: display_usage(pod.cpu_usage),
            memory: display_usage(pod.memory_usage),
            historical_cpu: format_series(pod.history.iter().map(|p| p.cpu)),
            historical_memory: format_series(pod.history.iter().map(|p| p.memory)),
            recommendation: color_direction(
                pod.recommendation.direction,
                &pod.recommendation.to_string(),
            ),
            alert: pod.alert.as_ref().map(describe_alert).unwrap_or_default(),
        }
    }
}

fn describe_alert(outcome: &AlertOutcome) -> String {
    if !outcome.triggered() {
        return String::new();
    }
    let mut sent = Vec::new();
    if outcome.sent_email {
        sent.push("email");
    }
    if outcome.sent_chat {
        sent.push("chat");
    }
    if sent.is_empty() {
        "fired (not delivered)".to_string()
    } else {
        format!("fired ({})", sent.join(", "))
    }
}

/// Run one advisory cycle; autoscaler objects are left alone
pub async fn run(
    paths: &Paths,
    namespace: Option<String>,
    use_mock: bool,
    format: OutputFormat,
) -> Result<()> {
    let settings = paths.load_settings()?;
    let options = CycleOptions {
        namespace,
        use_mock,
        reconcile: false,
        alerts: true,
    };
    let cycle = build_cycle(paths, &settings, &options).await?;
    let report = cycle.run(&options.namespaces(&settings)).await;

    print_report(&report, format);
    Ok(())
}

fn print_report(report: &CycleReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(report);
        return;
    }

    for ns in &report.namespaces {
        print_namespace_status(ns);
        if ns.pods.is_empty() {
            continue;
        }
        let rows: Vec<UsageRow> = ns.pods.iter().map(UsageRow::from).collect();
        print_rows(&rows, &ns.pods, format);
    }

    if report.namespaces.iter().all(|ns| ns.pods.is_empty()) {
        print_warning("Nothing to evaluate");
    }
}
